use std::env;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_API_URL: &str = "http://localhost:8000/api/v1";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            api_base_url: env::var("PORTAL_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| {
                    warn!("PORTAL_API_URL not set, using default");
                    DEFAULT_API_URL.to_string()
                }),
            request_timeout_secs: match env::var("PORTAL_REQUEST_TIMEOUT_SECS") {
                Ok(raw) => raw.parse().unwrap_or_else(|_| {
                    warn!("PORTAL_REQUEST_TIMEOUT_SECS is not a number ({}), using default", raw);
                    DEFAULT_REQUEST_TIMEOUT_SECS
                }),
                Err(_) => DEFAULT_REQUEST_TIMEOUT_SECS,
            },
        };

        if !config.is_configured() {
            warn!("Portal client not fully configured - missing API base URL");
        }

        config
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: base_url.into(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.api_base_url.is_empty()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::with_base_url(DEFAULT_API_URL)
    }
}
