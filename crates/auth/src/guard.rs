//! Route-guard policy: binds resolver state to an admit/deny decision.

use std::sync::Arc;
use std::time::Duration;

use crate::identity::HodIdentity;
use crate::resolver::{AuthState, SessionResolver};

/// Guard timing and retry policy.
#[derive(Debug, Clone, Copy)]
pub struct GuardPolicy {
    /// How long one request waits on `Loading` before surfacing a retry.
    pub wait: Duration,
    /// Manual retries allowed before instructing a hard reset.
    pub max_retries: u8,
}

impl Default for GuardPolicy {
    fn default() -> Self {
        Self {
            wait: Duration::from_secs(10),
            max_retries: 3,
        }
    }
}

/// Outcome of guarding one navigation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Render the protected subtree.
    Proceed(HodIdentity),
    /// History-replacing redirect to the role login route.
    RedirectToLogin,
    /// Still resolving past the wait budget; offer a manual retry.
    /// `retries_left` counts how many further waits will still offer one.
    StillLoading { retries_left: u8 },
    /// Retry budget exhausted; instruct the user to reload and clear the
    /// stored session.
    HardReset,
}

/// Admit or deny one navigation request against the current auth state.
///
/// An unresolved state kicks a resolution and waits for it to settle, for
/// at most `policy.wait`; the wait future is dropped the moment the
/// resolver settles, which cancels the timer. Timeouts consume the
/// resolver's retry budget; the budget resets whenever a resolution
/// settles.
pub async fn admit(resolver: &Arc<SessionResolver>, policy: GuardPolicy) -> GuardDecision {
    match resolver.state() {
        AuthState::Authorized(identity) => return GuardDecision::Proceed(identity),
        AuthState::Unauthorized => return GuardDecision::RedirectToLogin,
        AuthState::Unknown => {
            let resolver = Arc::clone(resolver);
            tokio::spawn(async move {
                resolver.resolve().await;
            });
        }
        AuthState::Loading => {}
    }

    match tokio::time::timeout(policy.wait, resolver.wait_settled()).await {
        Ok(AuthState::Authorized(identity)) => GuardDecision::Proceed(identity),
        Ok(_) => GuardDecision::RedirectToLogin,
        Err(_elapsed) => {
            let used = resolver.note_guard_timeout();
            if used > policy.max_retries {
                GuardDecision::HardReset
            } else {
                GuardDecision::StillLoading {
                    retries_left: policy.max_retries - used,
                }
            }
        }
    }
}
