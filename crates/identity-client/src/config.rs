use std::env;
use std::time::Duration;

const DEFAULT_SERVICE_URL: &str = "http://localhost:3005";
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const CACHE_TTL_SECS: u64 = 300; // 5 minutes

/// Identity client configuration parsed from environment variables
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    pub service_url: String,
    pub timeout: Duration,
    pub cache_ttl: Duration,
    pub cache_capacity: u64,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            service_url: DEFAULT_SERVICE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            cache_ttl: Duration::from_secs(CACHE_TTL_SECS),
            cache_capacity: 10_000,
        }
    }
}

impl IdentityConfig {
    /// Parse configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Parse configuration from any key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let service_url = lookup("IDENTITY_SERVICE_URL")
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or(defaults.service_url);

        let timeout = lookup("IDENTITY_TIMEOUT_SECS")
            .and_then(|t| t.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.timeout);

        Self {
            service_url,
            timeout,
            ..defaults
        }
    }
}
