//! Error taxonomy of the authorization flow.
//!
//! Every variant recovers locally to the `Unauthorized` state; none of them
//! propagates past the resolver as a panic or an unhandled error.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Backend unreachable. Surfaced as a message to the user; the flow
    /// still resolves to `Unauthorized`.
    #[error("backend unreachable: {0}")]
    Network(String),

    /// Email/password rejected at login. Surfaced inline; the attempt
    /// counter is incremented, with no lockout.
    #[error("email or password rejected")]
    Credential,

    /// Authenticated, but absent from the allow-list. Presented to the user
    /// as a generic denial; internally it forces a remote sign-out.
    #[error("account is not enrolled as a head of department")]
    Membership,

    /// Allow-listed but without a profile row. Fatal to authorization, not
    /// a degraded success.
    #[error("no profile found for the authenticated account")]
    ProfileMissing,
}
