//! HOD route guard middleware.

use axum::{
    extract::State,
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use edugate_auth::{admit, GuardDecision};

use crate::app::errors;
use crate::app::routes::hod::LOGIN_ROUTE;
use crate::context::AuthContext;

/// Gate a request on the HOD authorization decision.
///
/// `Proceed` injects the resolved identity as a request extension for the
/// handlers behind the guard. A denial is a `303` to the login route so the
/// browser replaces the pending navigation instead of stacking it.
pub async fn hod_guard(
    State(ctx): State<AuthContext>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    match admit(ctx.resolver(), ctx.policy()).await {
        GuardDecision::Proceed(identity) => {
            req.extensions_mut().insert(identity);
            next.run(req).await
        }
        GuardDecision::RedirectToLogin => Redirect::to(LOGIN_ROUTE).into_response(),
        GuardDecision::StillLoading { retries_left } => {
            let mut res = errors::json_error(
                StatusCode::SERVICE_UNAVAILABLE,
                "still_loading",
                format!("authorization is still resolving; {retries_left} retries remaining"),
            );
            let wait_secs = ctx.policy().wait.as_secs().max(1).to_string();
            if let Ok(value) = HeaderValue::from_str(&wait_secs) {
                res.headers_mut().insert(header::RETRY_AFTER, value);
            }
            res
        }
        GuardDecision::HardReset => errors::json_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "hard_reset_required",
            "authorization did not settle; reload the portal and clear its stored session",
        ),
    }
}
