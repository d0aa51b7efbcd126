//! Client configuration and environment loading.

use std::fmt;
use std::time::Duration;

use crate::error::ConfigError;

pub const ENV_API_KEY: &str = "GHL_API_KEY";
pub const ENV_BASE_URL: &str = "GHL_BASE_URL";
pub const ENV_LOCATION_ID: &str = "GHL_LOCATION_ID";
pub const ENV_API_VERSION: &str = "GHL_API_VERSION";

/// Version header sent by the default header profile unless overridden.
pub const DEFAULT_API_VERSION: &str = "2021-07-28";

/// Version header required by the conversations API family.
pub const CONVERSATIONS_API_VERSION: &str = "2021-04-15";

/// Fixed per-request timeout applied by every transport.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Token, base URL, location and API version for one client instance.
///
/// `Debug` never prints the access token.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub access_token: String,
    pub base_url: String,
    pub location_id: String,
    pub api_version: String,
}

impl ClientConfig {
    /// Build a config with the default API version.
    pub fn new(
        access_token: impl Into<String>,
        base_url: impl Into<String>,
        location_id: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            access_token: access_token.into(),
            base_url: normalize_base_url(base_url.into()),
            location_id: location_id.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read the configuration through `lookup`, which maps an environment
    /// variable name to its value. Empty values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| -> Result<String, ConfigError> {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(name))
        };

        let access_token = required(ENV_API_KEY)?;
        let base_url = required(ENV_BASE_URL)?;
        let location_id = required(ENV_LOCATION_ID)?;
        let api_version = lookup(ENV_API_VERSION)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_VERSION.to_string());

        Ok(Self {
            access_token,
            base_url: normalize_base_url(base_url),
            location_id,
            api_version,
        })
    }

    /// Every field must be non-empty. Formats are not checked.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("access_token", &self.access_token),
            ("base_url", &self.base_url),
            ("location_id", &self.location_id),
            ("api_version", &self.api_version),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(ConfigError::Empty(name));
            }
        }
        Ok(())
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("access_token", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("location_id", &self.location_id)
            .field("api_version", &self.api_version)
            .finish()
    }
}

fn normalize_base_url(base_url: String) -> String {
    base_url.trim_end_matches('/').to_string()
}
