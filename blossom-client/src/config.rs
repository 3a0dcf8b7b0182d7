use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Which servers the media phase tries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaPolicy {
    /// Only the first server in the list
    #[default]
    First,
    /// Every server in order until one accepts
    Any,
}

/// Policy for uploading one blob to many servers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultiServerConfig {
    /// Send the blob through the `/media` endpoint before raw uploads
    pub media: bool,
    /// Which servers are media candidates
    pub media_policy: MediaPolicy,
    /// Continue with raw uploads when no server accepted the media upload
    pub media_fallback: bool,
    /// Limit for each mirror request
    #[serde(with = "humantime_serde")]
    pub mirror_timeout: Option<Duration>,
    /// Limit for each upload and media request
    #[serde(with = "humantime_serde")]
    pub request_timeout: Option<Duration>,
}

impl Default for MultiServerConfig {
    fn default() -> Self {
        Self {
            media: false,
            media_policy: MediaPolicy::First,
            media_fallback: false,
            mirror_timeout: Some(Duration::from_secs(5)),
            request_timeout: None,
        }
    }
}

impl MultiServerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable the media phase with the given policy
    pub fn with_media(mut self, policy: MediaPolicy) -> Self {
        self.media = true;
        self.media_policy = policy;
        self
    }

    pub fn with_media_fallback(mut self, fallback: bool) -> Self {
        self.media_fallback = fallback;
        self
    }

    pub fn with_mirror_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.mirror_timeout = timeout;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.mirror_timeout.is_some_and(|t| t.is_zero()) {
            return Err("mirror timeout cannot be zero".to_string());
        }
        if self.request_timeout.is_some_and(|t| t.is_zero()) {
            return Err("request timeout cannot be zero".to_string());
        }
        Ok(())
    }
}
