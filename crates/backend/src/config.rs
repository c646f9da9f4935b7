//! Backend bootstrap configuration.

use std::path::PathBuf;

/// Connection settings for the hosted backend plus the local data override.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Project base URL, without a trailing slash.
    pub base_url: String,
    /// Project api key sent with every request.
    pub api_key: String,
    /// Override for the session-store directory; defaults to the OS data dir.
    pub data_dir: Option<PathBuf>,
}

impl BackendConfig {
    /// Read configuration from the environment.
    ///
    /// Missing values fall back to development defaults, loudly.
    pub fn from_env() -> Self {
        let base_url = std::env::var("EDUGATE_BACKEND_URL").unwrap_or_else(|_| {
            tracing::warn!("EDUGATE_BACKEND_URL not set; using local dev default");
            "http://127.0.0.1:54321".to_string()
        });
        let api_key = std::env::var("EDUGATE_BACKEND_KEY").unwrap_or_else(|_| {
            tracing::warn!("EDUGATE_BACKEND_KEY not set; using insecure dev default");
            "dev-anon-key".to_string()
        });
        let data_dir = std::env::var_os("EDUGATE_DATA_DIR").map(PathBuf::from);

        Self {
            base_url: normalize_base_url(&base_url),
            api_key,
            data_dir,
        }
    }
}

pub(crate) fn normalize_base_url(raw: &str) -> String {
    raw.trim_end_matches('/').to_string()
}
