// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identity gate and role gate middleware.
//!
//! ```rust,ignore
//! let admin = Router::new()
//!     .route("/admin/policies", get(list_policies))
//!     .route_layer(middleware::from_fn_with_state(
//!         RoleGate::new(state.clone(), RoleSet::of(&[Role::OwnerAdmin, Role::Admin])),
//!         require_role,
//!     ));
//!
//! let app = Router::new()
//!     .merge(admin)
//!     .route_layer(middleware::from_fn_with_state(state.clone(), require_authenticated))
//!     .with_state(state);
//! ```
//!
//! The identity gate must wrap the role gate: it establishes the identity and
//! owns the response wrapper, the role gate only reads the identity.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::header::USER_AGENT,
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::{
    claims::{AuthenticatedUser, AuthorizedUser},
    credential::{extract_credential, verify_credential},
    roles::RoleSet,
    AuthError,
};
use crate::audit::{AuditAction, AuditEvent, AuditStatus};
use crate::session::WrapContext;
use crate::state::AppState;

/// Request-scoped marker: a response wrapper is already installed.
#[derive(Debug, Clone, Copy)]
struct WrapperInstalled;

/// Request facts recorded with audit events.
struct RequestMeta {
    resource: String,
    ip_address: Option<String>,
    user_agent: Option<String>,
}

impl RequestMeta {
    fn of(request: &Request) -> Self {
        let headers = request.headers();

        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        let ip_address = forwarded.or_else(|| {
            request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        });

        Self {
            resource: request.uri().path().to_string(),
            ip_address,
            user_agent: headers
                .get(USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
        }
    }

    fn attach(&self, event: AuditEvent) -> AuditEvent {
        event
            .with_resource(self.resource.clone())
            .with_client(self.ip_address.clone(), self.user_agent.clone())
    }

    fn denied(&self, action: AuditAction) -> AuditEvent {
        self.attach(AuditEvent::denied(action))
    }
}

/// Identity gate.
///
/// Verifies the credential, checks the account is still enabled, puts an
/// [`AuthenticatedUser`] in the request extensions and seals the handler's
/// response through the state's `ResponseWrapper`.
pub async fn require_authenticated(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let meta = RequestMeta::of(&request);

    let Some(token) = extract_credential(request.headers(), &state.config.credential_cookie)
    else {
        state.audit.record(meta.denied(AuditAction::MissingToken));
        return AuthError::MissingCredential.into_response();
    };

    let Some(secret) = state.config.signing_secret.as_deref() else {
        tracing::error!("Signing secret is not configured, rejecting authenticated request");
        let event = AuditEvent::new(AuditAction::Misconfigured, AuditStatus::Error);
        state.audit.record(meta.attach(event));
        return AuthError::ServerMisconfigured.into_response();
    };

    let user = match verify_credential(&token, secret) {
        Ok(claims) => AuthenticatedUser::from_claims(claims),
        Err(rejection) => {
            state.audit.record(meta.denied(AuditAction::InvalidToken));
            return rejection.into_response();
        }
    };

    // Only the outermost gate wraps.
    let wrap_context = if request.extensions().get::<WrapperInstalled>().is_none() {
        request.extensions_mut().insert(WrapperInstalled);
        Some(WrapContext::from_headers(request.headers()))
    } else {
        None
    };

    match state.directory.is_account_disabled(&user.email).await {
        Ok(false) => {}
        Ok(true) => {
            tracing::info!(email = %user.email, "Rejected request from disabled account");
            state.audit.record(
                meta.denied(AuditAction::AccountDisabled)
                    .with_actor(user.email.clone(), user.claimed_role),
            );
            return AuthError::AccountDisabled.into_response();
        }
        Err(e) => {
            tracing::warn!(email = %user.email, error = %e, "Account status lookup failed");
            state.audit.record(
                meta.denied(AuditAction::IdentityLookupFailed)
                    .with_actor(user.email.clone(), user.claimed_role),
            );
            return AuthError::InvalidCredential.into_response();
        }
    }

    request.extensions_mut().insert(user);
    let response = next.run(request).await;

    match wrap_context {
        Some(ctx) => state.wrapper.wrap(&ctx, response).await,
        None => response,
    }
}

/// Role gate configuration for one group of routes.
#[derive(Clone)]
pub struct RoleGate {
    state: AppState,
    allowed: RoleSet,
}

impl RoleGate {
    pub fn new(state: AppState, allowed: RoleSet) -> Self {
        Self { state, allowed }
    }
}

/// Role gate.
///
/// Looks up the role of record for the authenticated email and checks it
/// against the allowed set. The credential's role claim is never used for the
/// decision.
pub async fn require_role(
    State(gate): State<RoleGate>,
    mut request: Request,
    next: Next,
) -> Response {
    let meta = RequestMeta::of(&request);

    let Some(identity) = request.extensions().get::<AuthenticatedUser>().cloned() else {
        gate.state.audit.record(meta.denied(AuditAction::Unauthorized));
        return AuthError::Unauthorized.into_response();
    };

    let authoritative_role = match gate.state.directory.authoritative_role(&identity.email).await
    {
        Ok(Some(role)) => role,
        Ok(None) => {
            tracing::warn!(
                email = %identity.email,
                "Authenticated account missing from identity store"
            );
            gate.state.audit.record(
                meta.denied(AuditAction::MissingUser)
                    .with_actor(identity.email.clone(), identity.claimed_role),
            );
            return AuthError::Forbidden.into_response();
        }
        Err(e) => {
            tracing::warn!(email = %identity.email, error = %e, "Role lookup failed");
            gate.state.audit.record(
                meta.denied(AuditAction::RoleLookupFailed)
                    .with_actor(identity.email.clone(), identity.claimed_role),
            );
            return AuthError::Forbidden.into_response();
        }
    };

    if authoritative_role != identity.claimed_role {
        tracing::warn!(
            email = %identity.email,
            claimed_role = %identity.claimed_role,
            authoritative_role = %authoritative_role,
            "Credential role differs from role of record, using role of record"
        );
    }

    if !gate.allowed.contains(authoritative_role) {
        let allowed: Vec<&str> = gate.allowed.iter().map(|role| role.as_str()).collect();
        gate.state.audit.record(
            meta.denied(AuditAction::RoleDenied)
                .with_actor(identity.email.clone(), authoritative_role)
                .with_details(serde_json::json!({ "allowed_roles": allowed })),
        );
        return AuthError::Forbidden.into_response();
    }

    request.extensions_mut().insert(AuthorizedUser {
        identity,
        authoritative_role,
    });
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{header::AUTHORIZATION, Request as HttpRequest, StatusCode},
        middleware::from_fn_with_state,
        routing::get,
        Json, Router,
    };
    use serde_json::{json, Value};
    use tokio::sync::mpsc;
    use tower::ServiceExt;

    use crate::audit::AuditEvent;
    use crate::auth::credential::tests::{mint, SECRET};
    use crate::auth::directory::{DirectoryError, IdentityStore, InMemoryDirectory};
    use crate::auth::extractor::{Auth, Authorized};
    use crate::auth::Role;
    use crate::config::GateConfig;
    use crate::crypto::{self, Bundle, EnvelopeKey};
    use crate::session::HANDSHAKE_HEADER;

    struct Harness {
        app: Router,
        state: AppState,
        audit: mpsc::Receiver<AuditEvent>,
    }

    impl Harness {
        fn next_audit(&mut self) -> Option<AuditEvent> {
            self.audit.try_recv().ok()
        }
    }

    fn config(encryption_enabled: bool) -> GateConfig {
        GateConfig {
            signing_secret: Some(SECRET.to_string()),
            encryption_enabled,
            ..GateConfig::default()
        }
    }

    async fn seeded_directory() -> Arc<InMemoryDirectory> {
        let directory = Arc::new(InMemoryDirectory::default());
        directory.upsert("admin@example.com", Role::Admin, false).await;
        directory.upsert("bo@example.com", Role::BasicUser, false).await;
        directory.upsert("off@example.com", Role::Editor, true).await;
        directory
    }

    fn harness_with(config: GateConfig, directory: Arc<dyn IdentityStore>) -> Harness {
        let (state, audit) = AppState::new(config, directory);

        let admin = Router::new()
            .route(
                "/admin",
                get(|Authorized(user): Authorized| async move {
                    Json(json!({ "role": user.authoritative_role }))
                }),
            )
            .route_layer(from_fn_with_state(
                RoleGate::new(state.clone(), RoleSet::of(&[Role::OwnerAdmin, Role::Admin])),
                require_role,
            ));

        let app = Router::new()
            .route(
                "/me",
                get(|Auth(user): Auth| async move { Json(json!({ "email": user.email })) }),
            )
            .merge(admin)
            .route_layer(from_fn_with_state(state.clone(), require_authenticated))
            .with_state(state.clone());

        Harness { app, state, audit }
    }

    async fn harness(encryption_enabled: bool) -> Harness {
        harness_with(config(encryption_enabled), seeded_directory().await)
    }

    fn get_request(uri: &str, token: Option<&str>) -> HttpRequest<Body> {
        let mut builder = HttpRequest::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn missing_credential_is_401_and_audited() {
        let mut h = harness(false).await;
        let response = h.app.clone().oneshot(get_request("/me", None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error_code"], "missing_credential");

        let event = h.next_audit().unwrap();
        assert_eq!(event.action, AuditAction::MissingToken);
        assert_eq!(event.status, AuditStatus::Denied);
        assert_eq!(event.resource.as_deref(), Some("/me"));
    }

    #[tokio::test]
    async fn missing_signing_secret_is_500() {
        let mut h = harness_with(GateConfig::default(), seeded_directory().await);
        let token = mint(SECRET, 1, "bo@example.com", "basic-user", 3600);
        let response = h
            .app
            .clone()
            .oneshot(get_request("/me", Some(&token)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let event = h.next_audit().unwrap();
        assert_eq!(event.action, AuditAction::Misconfigured);
        assert_eq!(event.status, AuditStatus::Error);
    }

    #[tokio::test]
    async fn bad_credentials_are_401_without_detail() {
        let mut h = harness(false).await;
        let forged = mint("not-the-secret", 1, "bo@example.com", "admin", 3600);
        let expired = mint(SECRET, 1, "bo@example.com", "basic-user", -3600);

        let mut bodies = Vec::new();
        for token in [forged.as_str(), expired.as_str(), "garbage"] {
            let response = h
                .app
                .clone()
                .oneshot(get_request("/me", Some(token)))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
            bodies.push(body_json(response).await);
            assert_eq!(h.next_audit().unwrap().action, AuditAction::InvalidToken);
        }
        assert!(bodies.windows(2).all(|pair| pair[0] == pair[1]));
    }

    #[tokio::test]
    async fn cookie_credential_is_accepted() {
        let h = harness(false).await;
        let token = mint(SECRET, 2, "bo@example.com", "basic-user", 3600);
        let request = HttpRequest::builder()
            .uri("/me")
            .header("cookie", format!("token={token}"))
            .body(Body::empty())
            .unwrap();

        let response = h.app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["email"], "bo@example.com");
    }

    #[tokio::test]
    async fn disabled_account_is_403_even_with_valid_credential() {
        let mut h = harness_with(config(false), seeded_directory().await);
        let token = mint(SECRET, 3, "off@example.com", "editor", 3600);
        let response = h
            .app
            .clone()
            .oneshot(get_request("/me", Some(&token)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_json(response).await["error_code"], "account_disabled");
        let event = h.next_audit().unwrap();
        assert_eq!(event.action, AuditAction::AccountDisabled);
        assert_eq!(event.actor_email.as_deref(), Some("off@example.com"));
    }

    #[tokio::test]
    async fn account_disabled_mid_session_is_rejected_on_next_request() {
        let directory = seeded_directory().await;
        let h = harness_with(config(false), directory.clone());
        let token = mint(SECRET, 2, "bo@example.com", "basic-user", 3600);

        let first = h
            .app
            .clone()
            .oneshot(get_request("/me", Some(&token)))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        directory.set_disabled("bo@example.com", true).await;
        let second = h
            .app
            .clone()
            .oneshot(get_request("/me", Some(&token)))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::FORBIDDEN);
    }

    struct BrokenStore;

    #[async_trait]
    impl IdentityStore for BrokenStore {
        async fn is_account_disabled(&self, _email: &str) -> Result<bool, DirectoryError> {
            Err(DirectoryError::Unavailable("connection reset".to_string()))
        }

        async fn authoritative_role(&self, _email: &str) -> Result<Option<Role>, DirectoryError> {
            Err(DirectoryError::Unavailable("connection reset".to_string()))
        }
    }

    /// Account checks succeed, role lookups fail.
    struct RoleLookupDown;

    #[async_trait]
    impl IdentityStore for RoleLookupDown {
        async fn is_account_disabled(&self, _email: &str) -> Result<bool, DirectoryError> {
            Ok(false)
        }

        async fn authoritative_role(&self, _email: &str) -> Result<Option<Role>, DirectoryError> {
            Err(DirectoryError::Unavailable("timeout".to_string()))
        }
    }

    #[tokio::test]
    async fn store_failure_during_authentication_is_401() {
        let mut h = harness_with(config(false), Arc::new(BrokenStore));
        let token = mint(SECRET, 2, "bo@example.com", "basic-user", 3600);
        let response = h
            .app
            .clone()
            .oneshot(get_request("/me", Some(&token)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error_code"], "invalid_credential");
        assert_eq!(h.next_audit().unwrap().action, AuditAction::IdentityLookupFailed);
    }

    #[tokio::test]
    async fn role_lookup_failure_is_403() {
        let mut h = harness_with(config(false), Arc::new(RoleLookupDown));
        let token = mint(SECRET, 1, "admin@example.com", "admin", 3600);
        let response = h
            .app
            .clone()
            .oneshot(get_request("/admin", Some(&token)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(h.next_audit().unwrap().action, AuditAction::RoleLookupFailed);
    }

    #[tokio::test]
    async fn role_gate_uses_role_of_record_not_claim() {
        let mut h = harness(false).await;
        // Claims admin, recorded as basic-user.
        let token = mint(SECRET, 2, "bo@example.com", "admin", 3600);
        let response = h
            .app
            .clone()
            .oneshot(get_request("/admin", Some(&token)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_json(response).await["error_code"], "forbidden");
        let event = h.next_audit().unwrap();
        assert_eq!(event.action, AuditAction::RoleDenied);
        assert_eq!(event.actor_role, Some(Role::BasicUser));
    }

    #[tokio::test]
    async fn stale_low_claim_proceeds_with_role_of_record() {
        let h = harness(false).await;
        // Claims basic-user, recorded as admin: warn and continue.
        let token = mint(SECRET, 1, "admin@example.com", "basic-user", 3600);
        let response = h
            .app
            .clone()
            .oneshot(get_request("/admin", Some(&token)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["role"], "admin");
    }

    #[tokio::test]
    async fn unknown_account_is_403_missing_user() {
        let mut h = harness(false).await;
        let token = mint(SECRET, 9, "ghost@example.com", "admin", 3600);
        let response = h
            .app
            .clone()
            .oneshot(get_request("/admin", Some(&token)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(h.next_audit().unwrap().action, AuditAction::MissingUser);
    }

    #[tokio::test]
    async fn role_gate_without_identity_is_401() {
        let (state, mut audit) = AppState::new(config(false), seeded_directory().await);
        let app: Router = Router::new()
            .route("/bare", get(|| async { "unreachable" }))
            .route_layer(from_fn_with_state(
                RoleGate::new(state, RoleSet::all()),
                require_role,
            ));

        let response = app.oneshot(get_request("/bare", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(audit.try_recv().unwrap().action, AuditAction::Unauthorized);
    }

    #[tokio::test]
    async fn rejections_stay_plain_when_encryption_is_on() {
        let h = harness(true).await;
        let response = h.app.clone().oneshot(get_request("/me", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let token = mint(SECRET, 2, "bo@example.com", "admin", 3600);
        let response = h
            .app
            .clone()
            .oneshot(get_request("/admin", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn nested_identity_gates_seal_once() {
        let (state, _audit) = AppState::new(config(true), seeded_directory().await);
        let key = EnvelopeKey::generate().unwrap();
        state.handshakes.issue("hs-1", key.clone(), "k1");

        let app: Router = Router::new()
            .route("/twice", get(|| async { Json(json!({ "n": 1 })) }))
            .route_layer(from_fn_with_state(state.clone(), require_authenticated))
            .route_layer(from_fn_with_state(state.clone(), require_authenticated))
            .with_state(state);

        let token = mint(SECRET, 2, "bo@example.com", "basic-user", 3600);
        let request = HttpRequest::builder()
            .uri("/twice")
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .header(HANDSHAKE_HEADER, "hs-1")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let bundle: Bundle = serde_json::from_value(body["enc"].clone()).unwrap();
        let opened = crypto::decrypt(&bundle, key.as_bytes(), &["hs-1", ""]).unwrap();
        assert_eq!(opened, json!({ "n": 1 }));
    }

    #[tokio::test]
    async fn forwarded_address_and_user_agent_are_audited() {
        let mut h = harness(false).await;
        let request = HttpRequest::builder()
            .uri("/me")
            .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
            .header(USER_AGENT, "portal-web/2.1")
            .body(Body::empty())
            .unwrap();
        h.app.clone().oneshot(request).await.unwrap();

        let event = h.next_audit().unwrap();
        assert_eq!(event.ip_address.as_deref(), Some("203.0.113.9"));
        assert_eq!(event.user_agent.as_deref(), Some("portal-web/2.1"));
        assert!(h.state.config.signing_secret.is_some());
    }
}
