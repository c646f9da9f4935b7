//! Process-wide auth context.

use std::sync::Arc;

use edugate_auth::{GuardPolicy, SessionResolver};

/// Explicit auth context handed to the router and the route guard.
///
/// Constructed once per process lifetime; the state it carries changes only
/// through the resolver's transition function. This replaces the
/// module-level mutable user the portal's earlier incarnation kept.
#[derive(Clone)]
pub struct AuthContext {
    resolver: Arc<SessionResolver>,
    policy: GuardPolicy,
}

impl AuthContext {
    pub fn new(resolver: Arc<SessionResolver>, policy: GuardPolicy) -> Self {
        Self { resolver, policy }
    }

    pub fn resolver(&self) -> &Arc<SessionResolver> {
        &self.resolver
    }

    pub fn policy(&self) -> GuardPolicy {
        self.policy
    }
}
