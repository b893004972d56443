// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{net::SocketAddr, sync::Arc};

use portal_gate::{
    api::router,
    audit::{AuditDrain, TracingSink},
    auth::{IdentityStore, InMemoryDirectory},
    config::{GateConfig, LogFormat, DEFAULT_LOG_FILTER},
    state::AppState,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = GateConfig::from_env();
    init_tracing(config.log_format);

    if config.signing_secret.is_none() {
        tracing::warn!("JWT_SECRET is not set; every authenticated request will fail with 500");
    }
    if config.encryption_enabled {
        if let Err(e) = config.master_key() {
            tracing::warn!(
                error = %e,
                "Response encryption is on but no usable master key is configured"
            );
        }
    }

    let directory: Arc<dyn IdentityStore> = match &config.identity_seed_file {
        Some(path) => {
            let directory = InMemoryDirectory::from_seed_file(path, &config.local_account_suffix)?;
            tracing::info!(
                path = %path.display(),
                accounts = directory.len().await,
                "Loaded identity seed"
            );
            Arc::new(directory)
        }
        None => Arc::new(InMemoryDirectory::new(&config.local_account_suffix)),
    };

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let encryption_enabled = config.encryption_enabled;

    let (state, audit_events) = AppState::new(config, directory);
    let app = router(state);

    let shutdown = CancellationToken::new();
    let drain = AuditDrain::new(audit_events, Arc::new(TracingSink));
    let drain_handle = tokio::spawn(drain.run(shutdown.clone()));

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, encryption_enabled, "Portal gate listening (docs at /docs)");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    shutdown.cancel();
    drain_handle.await?;
    tracing::info!("Portal gate stopped");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
