use std::time::Duration;

/// Application-level constants
pub const APP_NAME: &str = "medidiag";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Backend used when nothing is configured (the service's dev port).
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8001";

/// Connect timeout applied to every backend request.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

pub const ENV_BACKEND_URL: &str = "MEDIDIAG_BACKEND_URL";
pub const ENV_CONNECT_TIMEOUT: &str = "MEDIDIAG_CONNECT_TIMEOUT_SECS";
pub const ENV_REQUEST_TIMEOUT: &str = "MEDIDIAG_REQUEST_TIMEOUT_SECS";

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "medidiag=info,medidiag_lib=info,warn"
}

/// How to reach the diagnosis backend.
///
/// There is no request timeout by default: diagnosis generation can take
/// a long time and the service never promised an upper bound. Only the
/// connect phase is bounded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Backend root, without the `/api` suffix.
    pub backend_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn new(backend_url: &str) -> Self {
        Self {
            backend_url: normalize_backend_url(backend_url),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            request_timeout: None,
        }
    }

    /// Build from the process environment (after `.env` has been loaded).
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unparseable numbers fall back
    /// to defaults with a warning.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend_url = lookup(ENV_BACKEND_URL)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string());
        let mut config = Self::new(&backend_url);

        if let Some(secs) = lookup(ENV_CONNECT_TIMEOUT).and_then(|v| parse_secs(ENV_CONNECT_TIMEOUT, &v)) {
            config.connect_timeout = Duration::from_secs(secs);
        }
        config.request_timeout = lookup(ENV_REQUEST_TIMEOUT)
            .and_then(|v| parse_secs(ENV_REQUEST_TIMEOUT, &v))
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        config
    }

    /// Override the backend URL (CLI flag wins over environment).
    pub fn with_backend_url(mut self, backend_url: &str) -> Self {
        self.backend_url = normalize_backend_url(backend_url);
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BACKEND_URL)
    }
}

fn normalize_backend_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

fn parse_secs(key: &str, value: &str) -> Option<u64> {
    match value.trim().parse::<u64>() {
        Ok(secs) => Some(secs),
        Err(_) => {
            tracing::warn!(key, value, "Ignoring non-numeric timeout");
            None
        }
    }
}
