//! Client configuration.
//!
//! A `Config` is built once at startup and never mutated afterwards; the SDK
//! owns it for its whole lifetime and shares it read-only between calls.

use std::time::Duration;

use crate::error::ApiError;

pub const DEFAULT_BASE_URL: &str = "https://api.admin.u-code.io";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub const ENV_APP_ID: &str = "UCODE_APP_ID";
pub const ENV_BASE_URL: &str = "UCODE_BASE_URL";
pub const ENV_FUNCTION_NAME: &str = "UCODE_FUNCTION_NAME";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "UCODE_REQUEST_TIMEOUT_SECS";

/// Immutable connection settings for a UCode project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    base_url: String,
    app_id: String,
    function_name: String,
    request_timeout: Duration,
}

impl Config {
    /// Config for `app_id` against `base_url`, with no function name and the
    /// default timeout.
    pub fn new(base_url: &str, app_id: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            app_id: app_id.to_string(),
            function_name: String::new(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_function_name(mut self, function_name: &str) -> Self {
        self.function_name = function_name.to_string();
        self
    }

    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    /// Create config from environment variables.
    ///
    /// - `UCODE_APP_ID`: application identifier (required)
    /// - `UCODE_BASE_URL`: platform URL (default: `https://api.admin.u-code.io`)
    /// - `UCODE_FUNCTION_NAME`: name of the calling function (default: empty)
    /// - `UCODE_REQUEST_TIMEOUT_SECS`: timeout in whole seconds (default: 30)
    pub fn from_env() -> Result<Self, ApiError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ApiError> {
        let app_id = lookup(ENV_APP_ID)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ApiError::Config(format!("{ENV_APP_ID} environment variable is required")))?;

        let base_url = lookup(ENV_BASE_URL).unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let request_timeout = match lookup(ENV_REQUEST_TIMEOUT_SECS) {
            Some(raw) => {
                let secs = raw.trim().parse::<u64>().map_err(|_| {
                    ApiError::Config(format!("{ENV_REQUEST_TIMEOUT_SECS} must be an integer, got {raw:?}"))
                })?;
                Duration::from_secs(secs)
            }
            None => DEFAULT_REQUEST_TIMEOUT,
        };

        let mut config = Self::new(&base_url, &app_id).with_request_timeout(request_timeout);
        if let Some(function_name) = lookup(ENV_FUNCTION_NAME) {
            config = config.with_function_name(&function_name);
        }
        Ok(config)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    pub fn function_name(&self) -> &str {
        &self.function_name
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }
}
