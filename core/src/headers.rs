//! Header profiles.
//!
//! A profile is never stored. Headers are recomputed for every call from
//! the configuration snapshot the call was admitted with.

use crate::config::{ClientConfig, CONVERSATIONS_API_VERSION};

/// Which `Version` header a call sends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum HeaderProfile {
    /// The client-wide version from `ClientConfig::api_version`.
    #[default]
    Default,
    /// The conversations API family.
    Secondary,
    /// An explicit version for this call only.
    Version(String),
}

impl HeaderProfile {
    pub fn version<'a>(&'a self, config: &'a ClientConfig) -> &'a str {
        match self {
            HeaderProfile::Default => &config.api_version,
            HeaderProfile::Secondary => CONVERSATIONS_API_VERSION,
            HeaderProfile::Version(v) => v,
        }
    }
}

/// Compute the header set for `profile` under `config`.
pub fn header_profile(config: &ClientConfig, profile: &HeaderProfile) -> Vec<(String, String)> {
    vec![
        (
            "Authorization".to_string(),
            format!("Bearer {}", config.access_token),
        ),
        ("Version".to_string(), profile.version(config).to_string()),
        ("Accept".to_string(), "application/json".to_string()),
        ("Content-Type".to_string(), "application/json".to_string()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_API_VERSION;

    fn config() -> ClientConfig {
        ClientConfig::new("A", "https://x", "L").unwrap()
    }

    fn get<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
        headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn default_profile_uses_config_version() {
        let headers = header_profile(&config(), &HeaderProfile::Default);
        assert_eq!(get(&headers, "Authorization"), Some("Bearer A"));
        assert_eq!(get(&headers, "Version"), Some(DEFAULT_API_VERSION));
        assert_eq!(get(&headers, "Accept"), Some("application/json"));
    }

    #[test]
    fn secondary_profile_uses_conversations_version() {
        let headers = header_profile(&config(), &HeaderProfile::Secondary);
        assert_eq!(get(&headers, "Version"), Some(CONVERSATIONS_API_VERSION));
        assert_eq!(get(&headers, "Authorization"), Some("Bearer A"));
    }

    #[test]
    fn explicit_version_overrides_only_that_call() {
        let config = config();
        let pinned = header_profile(&config, &HeaderProfile::Version("2023-02-21".into()));
        assert_eq!(get(&pinned, "Version"), Some("2023-02-21"));

        let after = header_profile(&config, &HeaderProfile::Default);
        assert_eq!(get(&after, "Version"), Some(DEFAULT_API_VERSION));
    }
}
