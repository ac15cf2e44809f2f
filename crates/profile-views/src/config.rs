use std::env;
use std::time::Duration;

use profile_db::ObjectId;

use crate::retry::{Backoff, RetryPolicy};

const DEFAULT_PUBLIC_URL: &str = "http://localhost:3004";
const DEFAULT_AVATAR_DELEGATE: &str = "profile_pic";
const MAX_RETRY_BACKOFF: Duration = Duration::from_secs(2);

/// View composition settings parsed from environment variables
#[derive(Debug, Clone)]
pub struct ViewConfig {
    /// Public base URL of the profile service, used for fallback avatars
    pub public_url: String,
    pub avatar_delegate: String,
    pub retry: RetryPolicy,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            public_url: DEFAULT_PUBLIC_URL.to_string(),
            avatar_delegate: DEFAULT_AVATAR_DELEGATE.to_string(),
            retry: RetryPolicy::default(),
        }
    }
}

impl ViewConfig {
    /// Parse configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Parse configuration from any key lookup; unset or unparsable values
    /// keep their defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let public_url = lookup("PUBLIC_URL")
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or(defaults.public_url);

        let avatar_delegate = lookup("AVATAR_DELEGATE").unwrap_or(defaults.avatar_delegate);

        let max_attempts = lookup("IDENTITY_RETRY_ATTEMPTS")
            .and_then(|n| n.parse().ok())
            .unwrap_or(defaults.retry.max_attempts);

        let backoff = match lookup("IDENTITY_RETRY_BACKOFF_MS").and_then(|ms| ms.parse::<u64>().ok())
        {
            Some(0) => Backoff::None,
            Some(ms) => Backoff::Exponential {
                initial: Duration::from_millis(ms),
                max: MAX_RETRY_BACKOFF,
            },
            None => defaults.retry.backoff,
        };

        Self {
            public_url,
            avatar_delegate,
            retry: RetryPolicy {
                max_attempts,
                backoff,
            },
        }
    }

    /// Avatar URL served for users without a usable primary avatar
    pub fn fallback_avatar_url(&self, uid: &ObjectId) -> String {
        format!(
            "{}/profile/{}/{}",
            self.public_url, self.avatar_delegate, uid
        )
    }
}
