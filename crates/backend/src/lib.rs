//! `edugate-backend` — hosted-backend collaborators and local persistence.
//!
//! Implements the `edugate-auth` contracts against the hosted
//! backend-as-a-service (auth API plus row-level-secured tables) and
//! provides the file-backed session store and the auth event bus.

pub mod client;
pub mod config;
pub mod events;
pub mod store;

pub use client::HostedBackendClient;
pub use config::BackendConfig;
pub use events::{spawn_resolver_listener, AuthEvent, AuthEventBus};
pub use store::FileSessionStore;
