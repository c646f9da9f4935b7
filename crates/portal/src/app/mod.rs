//! HTTP application wiring (Axum router + state).
//!
//! Layout:
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `errors.rs`: consistent JSON error responses
//! - `crate::middleware`: the HOD route guard

use axum::{routing::get, Router};

use crate::context::AuthContext;
use crate::middleware;

pub mod errors;
pub mod routes;

/// Build the full portal router (public entrypoint used by `main.rs` and
/// the black-box tests).
pub fn build_app(ctx: AuthContext) -> Router {
    let guarded = routes::hod::guarded_router().layer(axum::middleware::from_fn_with_state(
        ctx.clone(),
        middleware::hod_guard,
    ));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(routes::hod::public_router())
        .merge(guarded)
        .with_state(ctx)
}
