use std::sync::Arc;

use anyhow::Context;

use edugate_auth::{GuardPolicy, SessionResolver};
use edugate_backend::{
    spawn_resolver_listener, AuthEventBus, BackendConfig, FileSessionStore, HostedBackendClient,
};
use edugate_portal::app::build_app;
use edugate_portal::context::AuthContext;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    edugate_observability::init();

    let config = BackendConfig::from_env();

    let store = match &config.data_dir {
        Some(dir) => FileSessionStore::open_at(dir.clone())?,
        None => FileSessionStore::open_default()?,
    };

    let events = AuthEventBus::new();
    let client = HostedBackendClient::new(&config, events.clone());

    let resolver = Arc::new(SessionResolver::new(Arc::new(store), Arc::new(client)));
    spawn_resolver_listener(&events, Arc::clone(&resolver));

    // Settle the initial authorization state in the background; guarded
    // requests arriving first will wait on it.
    {
        let resolver = Arc::clone(&resolver);
        tokio::spawn(async move {
            resolver.resolve().await;
        });
    }

    let ctx = AuthContext::new(resolver, GuardPolicy::default());
    let app = build_app(ctx);

    let addr =
        std::env::var("EDUGATE_LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
