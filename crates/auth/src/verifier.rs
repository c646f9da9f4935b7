//! Remote identity verification contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use edugate_core::UserId;

/// Remote auth session, opaque beyond the two fields the resolver reads.
///
/// Never mutated from this side except through the sign-in/sign-out calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSession {
    pub user_id: UserId,
    pub email: String,
}

/// Display metadata for an allow-listed account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HodProfile {
    pub id: UserId,
    pub display_name: String,
    pub email: String,
    pub email_verified: bool,
    pub profile_complete: bool,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VerifierError {
    /// The backend call itself failed (transport, 5xx).
    #[error("backend unreachable: {0}")]
    Network(String),

    /// The backend answered but with something unusable.
    #[error("backend rejected the request: {0}")]
    Backend(String),

    /// No profile row for the authenticated account; fatal to verification.
    #[error("no profile found for the authenticated account")]
    ProfileMissing,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignInError {
    #[error("email or password rejected")]
    Credential,

    #[error("backend unreachable: {0}")]
    Network(String),
}

/// Authoritative identity check against the hosted backend.
///
/// Implementations perform network I/O only and never touch the session
/// store. `is_role_member` is fail-closed by contract: errors and ambiguous
/// result sets report as non-membership rather than surfacing.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Password sign-in against the backend's auth service.
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<RemoteSession, SignInError>;

    /// The backend's current auth session: `Ok(None)` when no user is
    /// signed in, `Err(Network)` when the call itself fails.
    async fn current_session(&self) -> Result<Option<RemoteSession>, VerifierError>;

    /// Allow-list membership. `true` only on an unambiguous single-row
    /// match for `user_id`; anything else — error, zero rows, duplicate
    /// rows — is `false`.
    async fn is_role_member(&self, user_id: UserId) -> bool;

    /// Profile metadata for an allow-listed account. Absence is
    /// [`VerifierError::ProfileMissing`].
    async fn fetch_profile(&self, user_id: UserId) -> Result<HodProfile, VerifierError>;

    /// Revoke the remote session.
    async fn sign_out(&self) -> Result<(), VerifierError>;
}
