//! Auth event distribution (backend client → resolver).

use std::sync::Arc;

use tokio::sync::broadcast;

use edugate_auth::SessionResolver;

/// Auth lifecycle events emitted by the hosted backend client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn,
    SignedOut,
    TokenRefreshed,
}

/// Broadcast bus for auth events.
///
/// Every subscriber sees every event. A subscriber that lags misses only
/// superseded events; the next one it does see triggers a full
/// re-validation anyway, so nothing is lost.
#[derive(Debug, Clone)]
pub struct AuthEventBus {
    tx: broadcast::Sender<AuthEvent>,
}

impl AuthEventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(16);
        Self { tx }
    }

    pub fn publish(&self, event: AuthEvent) {
        // An Err here only means no live subscribers.
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.tx.subscribe()
    }
}

impl Default for AuthEventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Re-validate the resolver on every auth event.
///
/// Runs until the bus is closed. Re-validation coalesces into any chain
/// already in flight, so a burst of events costs at most one verification.
pub fn spawn_resolver_listener(
    bus: &AuthEventBus,
    resolver: Arc<SessionResolver>,
) -> tokio::task::JoinHandle<()> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    tracing::debug!(?event, "auth event; re-validating session");
                    resolver.refresh().await;
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "auth events lagged; re-validating once");
                    resolver.refresh().await;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
