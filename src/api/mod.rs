// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{require_authenticated, require_role, Role, RoleGate, RoleSet},
    crypto::Bundle,
    state::AppState,
};

pub mod access;
pub mod handshake;
pub mod health;
pub mod users;

/// Roles admitted to `/v1/admin/*`.
pub const ADMIN_ROLES: &[Role] = &[Role::OwnerAdmin, Role::Admin];

pub fn router(state: AppState) -> Router {
    let any_role = Router::new()
        .route("/access", get(access::get_access))
        .route_layer(from_fn_with_state(
            RoleGate::new(state.clone(), RoleSet::all()),
            require_role,
        ));

    let admin = Router::new()
        .route("/admin/policies", get(access::list_policies))
        .route_layer(from_fn_with_state(
            RoleGate::new(state.clone(), RoleSet::of(ADMIN_ROLES)),
            require_role,
        ));

    let v1_routes = Router::new()
        .route(
            "/session/handshake",
            post(handshake::open_handshake).delete(handshake::close_handshake),
        )
        .route("/users/me", get(users::get_current_user))
        .merge(any_role)
        .merge(admin)
        .route_layer(from_fn_with_state(state.clone(), require_authenticated))
        .with_state(state.clone());

    Router::new()
        .route("/health", get(health::health))
        .with_state(state)
        .nest("/v1", v1_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        handshake::open_handshake,
        handshake::close_handshake,
        users::get_current_user,
        access::get_access,
        access::list_policies
    ),
    components(
        schemas(
            health::HealthResponse,
            health::HealthChecks,
            handshake::HandshakeResponse,
            users::UserMeResponse,
            access::AccessResponse,
            access::PolicyEntry,
            Role,
            Bundle
        )
    ),
    tags(
        (name = "Health", description = "Liveness and configuration checks"),
        (name = "Session", description = "Handshake sessions for response encryption"),
        (name = "Users", description = "Current identity"),
        (name = "Access", description = "Effective role and policy"),
        (name = "Admin", description = "Policy administration")
    )
)]
struct ApiDoc;
