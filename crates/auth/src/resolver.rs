//! Session resolver: orchestrates the session store and the remote verifier
//! into a single fail-closed authorization decision.

use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{watch, Mutex};

use edugate_core::PortalRole;

use crate::error::AuthError;
use crate::identity::{ApprovalStatus, HodIdentity};
use crate::session::{SessionRecord, SessionStore};
use crate::verifier::{IdentityVerifier, RemoteSession, SignInError, VerifierError};

/// Authorization state observed by route guards and other consumers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthState {
    /// No resolution has run yet in this process.
    #[default]
    Unknown,
    /// A verification chain is in flight.
    Loading,
    Authorized(HodIdentity),
    Unauthorized,
}

impl AuthState {
    pub fn is_settled(&self) -> bool {
        matches!(self, AuthState::Authorized(_) | AuthState::Unauthorized)
    }
}

/// Orchestrates the store and the verifier.
///
/// `Unknown → Loading → Authorized | Unauthorized`, re-entering `Loading`
/// on every trigger (explicit refresh, backend auth event, foreground
/// re-validation). State transitions are published on a watch channel;
/// nothing else mutates the decision.
///
/// Coalescing is in-flight-wins: a `resolve()` that finds another chain
/// running awaits that chain's outcome instead of starting a second one,
/// and an in-flight chain is never cancelled by a new trigger. A caller
/// racing the very start of a chain may still observe the previous settled
/// state; the watch channel delivers the new outcome when it lands.
pub struct SessionResolver {
    store: Arc<dyn SessionStore>,
    verifier: Arc<dyn IdentityVerifier>,
    state_tx: watch::Sender<AuthState>,
    /// Serializes verification chains.
    chain: Mutex<()>,
    /// Guard-timeout retries; reset whenever a resolution settles.
    retry_count: AtomicU8,
    /// Credential rejections at login. Informational only, no lockout.
    login_attempts: AtomicU32,
}

impl SessionResolver {
    pub fn new(store: Arc<dyn SessionStore>, verifier: Arc<dyn IdentityVerifier>) -> Self {
        let (state_tx, _) = watch::channel(AuthState::Unknown);
        Self {
            store,
            verifier,
            state_tx,
            chain: Mutex::new(()),
            retry_count: AtomicU8::new(0),
            login_attempts: AtomicU32::new(0),
        }
    }

    /// Current state, without waiting.
    pub fn state(&self) -> AuthState {
        self.state_tx.borrow().clone()
    }

    /// Observe state transitions.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state_tx.subscribe()
    }

    pub fn login_attempts(&self) -> u32 {
        self.login_attempts.load(Ordering::SeqCst)
    }

    /// Run the full resolve sequence: trust a valid stored record, else
    /// verify remotely. Coalesces into an in-flight chain if one exists.
    pub async fn resolve(&self) -> AuthState {
        match self.chain.try_lock() {
            Ok(guard) => {
                let outcome = self.run_chain().await;
                drop(guard);
                outcome
            }
            // In-flight wins: await its outcome rather than queueing a
            // second verification.
            Err(_) => self.wait_settled().await,
        }
    }

    /// Explicit re-validation trigger. Identical to [`resolve`]; the
    /// separate name marks call sites that are triggers rather than the
    /// initial resolution.
    pub async fn refresh(&self) -> AuthState {
        self.resolve().await
    }

    /// Credential login for the HOD entry route. Bypasses the stored record
    /// on the way in and repopulates it on success.
    pub async fn login(&self, email: &str, password: &str) -> Result<HodIdentity, AuthError> {
        let guard = self.chain.lock().await;
        self.state_tx.send_replace(AuthState::Loading);

        let result = self.login_chain(email, password).await;

        self.retry_count.store(0, Ordering::SeqCst);
        match &result {
            Ok(identity) => {
                self.state_tx
                    .send_replace(AuthState::Authorized(identity.clone()));
            }
            Err(_) => {
                self.state_tx.send_replace(AuthState::Unauthorized);
            }
        }
        drop(guard);
        result
    }

    /// Sign out remotely, clear the stored record, report `Unauthorized`.
    pub async fn logout(&self) {
        let _guard = self.chain.lock().await;
        if let Err(err) = self.verifier.sign_out().await {
            tracing::warn!(error = %err, "remote sign-out failed during logout");
        }
        self.store.clear();
        self.retry_count.store(0, Ordering::SeqCst);
        self.state_tx.send_replace(AuthState::Unauthorized);
    }

    /// Block until the state is `Authorized` or `Unauthorized`.
    pub async fn wait_settled(&self) -> AuthState {
        let mut rx = self.state_tx.subscribe();
        loop {
            let state = rx.borrow_and_update().clone();
            if state.is_settled() {
                return state;
            }
            if rx.changed().await.is_err() {
                // Resolver dropped mid-wait; fail closed.
                return AuthState::Unauthorized;
            }
        }
    }

    /// Record one guard wait timeout; returns the total so far.
    pub fn note_guard_timeout(&self) -> u8 {
        self.retry_count
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                Some(n.saturating_add(1))
            })
            .map(|n| n.saturating_add(1))
            .unwrap_or(u8::MAX)
    }

    pub fn guard_retries(&self) -> u8 {
        self.retry_count.load(Ordering::SeqCst)
    }

    async fn run_chain(&self) -> AuthState {
        self.state_tx.send_replace(AuthState::Loading);
        let outcome = self.verify().await;
        self.retry_count.store(0, Ordering::SeqCst);
        self.state_tx.send_replace(outcome.clone());
        outcome
    }

    /// The resolve sequence proper. Every branch that cannot positively
    /// confirm membership and profile terminates in `Unauthorized`.
    async fn verify(&self) -> AuthState {
        let now = Utc::now();
        if let Some(record) = self.store.read(now) {
            tracing::debug!(user = %record.user.id, "session restored from store");
            return AuthState::Authorized(record.user);
        }

        let session = match self.verifier.current_session().await {
            Ok(Some(session)) => session,
            Ok(None) => {
                self.store.clear();
                return AuthState::Unauthorized;
            }
            Err(err) => {
                tracing::warn!(error = %err, "session introspection failed");
                self.store.clear();
                return AuthState::Unauthorized;
            }
        };

        match self.verify_session(session).await {
            Ok(identity) => AuthState::Authorized(identity),
            Err(err) => {
                tracing::warn!(error = %err, "verification denied");
                AuthState::Unauthorized
            }
        }
    }

    async fn login_chain(&self, email: &str, password: &str) -> Result<HodIdentity, AuthError> {
        let session = match self.verifier.sign_in_with_password(email, password).await {
            Ok(session) => session,
            Err(SignInError::Credential) => {
                let attempts = self.login_attempts.fetch_add(1, Ordering::SeqCst) + 1;
                tracing::warn!(attempts, "credentials rejected");
                self.store.clear();
                return Err(AuthError::Credential);
            }
            Err(SignInError::Network(msg)) => {
                self.store.clear();
                return Err(AuthError::Network(msg));
            }
        };

        self.verify_session(session).await
    }

    /// Membership → profile chain shared by `resolve` and `login`. The
    /// store write happens-after both checks; it is never issued on a
    /// failing branch.
    async fn verify_session(&self, session: RemoteSession) -> Result<HodIdentity, AuthError> {
        if !self.verifier.is_role_member(session.user_id).await {
            tracing::warn!(user = %session.user_id, "not in the hod allow-list; signing out");
            if let Err(err) = self.verifier.sign_out().await {
                tracing::warn!(error = %err, "remote sign-out failed");
            }
            self.store.clear();
            return Err(AuthError::Membership);
        }

        let profile = match self.verifier.fetch_profile(session.user_id).await {
            Ok(profile) => profile,
            Err(err) => {
                tracing::error!(user = %session.user_id, error = %err, "profile fetch failed");
                self.store.clear();
                return Err(match err {
                    VerifierError::ProfileMissing => AuthError::ProfileMissing,
                    VerifierError::Network(msg) | VerifierError::Backend(msg) => {
                        AuthError::Network(msg)
                    }
                });
            }
        };

        let identity = HodIdentity {
            id: profile.id,
            display_name: profile.display_name,
            email: profile.email,
            role: PortalRole::Hod,
            email_verified: profile.email_verified,
            profile_complete: profile.profile_complete,
            approval_status: ApprovalStatus::Approved,
        };

        let record = SessionRecord::new(identity.clone(), Utc::now());
        if let Err(err) = self.store.write(&record) {
            // The decision is already confirmed remotely; a missing cache
            // entry just means another verification next time.
            tracing::error!(error = %err, "failed to persist session record");
        }

        Ok(identity)
    }
}
