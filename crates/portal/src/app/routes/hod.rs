//! HOD login, session, and guarded dashboard routes.

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use edugate_auth::{AuthState, HodIdentity};

use crate::app::errors;
use crate::context::AuthContext;

/// Unauthenticated entry route for the HOD role; also the redirect target
/// on every denial.
pub const LOGIN_ROUTE: &str = "/admin/hod/login";

// ─────────────────────────────────────────────────────────────────────────────
// Request DTOs
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Routers
// ─────────────────────────────────────────────────────────────────────────────

/// Routes reachable without an authorization decision.
pub fn public_router() -> Router<AuthContext> {
    Router::new()
        .route(LOGIN_ROUTE, post(login))
        .route("/hod/session", get(session_state))
        .route("/hod/session/refresh", post(refresh_session))
        .route("/hod/logout", post(logout))
}

/// Routes behind the HOD route guard.
pub fn guarded_router() -> Router<AuthContext> {
    Router::new().route("/hod/dashboard", get(dashboard))
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// POST /admin/hod/login — credential entry for the HOD role.
pub async fn login(
    State(ctx): State<AuthContext>,
    Json(body): Json<LoginRequest>,
) -> axum::response::Response {
    match ctx.resolver().login(&body.email, &body.password).await {
        Ok(identity) => {
            (StatusCode::OK, Json(serde_json::json!({ "user": identity }))).into_response()
        }
        Err(err) => errors::auth_error_to_response(err),
    }
}

/// GET /hod/session — resolver state summary.
pub async fn session_state(State(ctx): State<AuthContext>) -> impl IntoResponse {
    Json(state_summary(ctx.resolver().state(), &ctx))
}

/// POST /hod/session/refresh — explicit re-validation trigger, the HTTP
/// analog of the portal tab regaining foreground visibility.
pub async fn refresh_session(State(ctx): State<AuthContext>) -> impl IntoResponse {
    let state = ctx.resolver().refresh().await;
    Json(state_summary(state, &ctx))
}

/// POST /hod/logout
pub async fn logout(State(ctx): State<AuthContext>) -> StatusCode {
    ctx.resolver().logout().await;
    StatusCode::NO_CONTENT
}

/// GET /hod/dashboard — the protected subtree. The guard middleware has
/// already injected a verified identity by the time this runs.
pub async fn dashboard(Extension(identity): Extension<HodIdentity>) -> impl IntoResponse {
    Json(serde_json::json!({
        "dashboard": "hod",
        "user": identity,
    }))
}

fn state_summary(state: AuthState, ctx: &AuthContext) -> serde_json::Value {
    let (label, user) = match state {
        AuthState::Unknown => ("unknown", None),
        AuthState::Loading => ("loading", None),
        AuthState::Authorized(identity) => ("authorized", Some(identity)),
        AuthState::Unauthorized => ("unauthorized", None),
    };
    serde_json::json!({
        "state": label,
        "user": user,
        "loginAttempts": ctx.resolver().login_attempts(),
    })
}
