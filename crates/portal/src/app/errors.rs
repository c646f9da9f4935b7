use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use edugate_auth::AuthError;

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Map a login failure to its HTTP surface.
///
/// Membership and profile denials are deliberately indistinguishable from
/// outside — both read as a generic denial; the difference shows up only in
/// the logs and in the forced remote sign-out.
pub fn auth_error_to_response(err: AuthError) -> axum::response::Response {
    match err {
        AuthError::Credential => json_error(
            StatusCode::UNAUTHORIZED,
            "invalid_credentials",
            "email or password is incorrect",
        ),
        AuthError::Membership | AuthError::ProfileMissing => {
            json_error(StatusCode::FORBIDDEN, "access_denied", "access denied")
        }
        AuthError::Network(msg) => json_error(StatusCode::BAD_GATEWAY, "network_error", msg),
    }
}
