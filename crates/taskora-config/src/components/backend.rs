//! Hosted data platform configuration

use crate::ConfigError;
use serde::{Deserialize, Serialize};

/// Connection settings for the hosted data platform
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base project URL, e.g. `https://abc.example.co`
    pub url: Option<String>,
    /// Public (row-level-security restricted) API key
    pub anon_key: Option<String>,
    /// Privileged key used by the functions service
    pub service_key: Option<String>,
    /// Per-request timeout applied in production
    pub request_timeout_seconds: u64,
}

/// Borrowed URL and key pair ready to hand to a transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendCredentials<'a> {
    /// Base project URL, without trailing slash
    pub url: &'a str,
    /// API key sent as `apikey` and bearer token
    pub key: &'a str,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: None,
            anon_key: None,
            service_key: None,
            request_timeout_seconds: 30,
        }
    }
}

impl BackendConfig {
    /// Credentials for client-side style access (anon key)
    pub fn client_credentials(&self) -> Result<BackendCredentials<'_>, ConfigError> {
        Ok(BackendCredentials {
            url: self.require_url()?,
            key: non_empty(self.anon_key.as_deref())
                .ok_or_else(|| ConfigError::missing("backend.anon_key"))?,
        })
    }

    /// Credentials for privileged access (service key)
    pub fn service_credentials(&self) -> Result<BackendCredentials<'_>, ConfigError> {
        Ok(BackendCredentials {
            url: self.require_url()?,
            key: non_empty(self.service_key.as_deref())
                .ok_or_else(|| ConfigError::missing("backend.service_key"))?,
        })
    }

    fn require_url(&self) -> Result<&str, ConfigError> {
        non_empty(self.url.as_deref())
            .map(|url| url.trim_end_matches('/'))
            .ok_or_else(|| ConfigError::missing("backend.url"))
    }
}

pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_url_is_reported() {
        let config = BackendConfig {
            anon_key: Some("anon".to_string()),
            ..Default::default()
        };

        let err = config.client_credentials().unwrap_err();
        assert!(matches!(err, ConfigError::MissingValue(ref f) if f == "backend.url"));
    }

    #[test]
    fn test_blank_service_key_counts_as_missing() {
        let config = BackendConfig {
            url: Some("https://db.example.com/".to_string()),
            service_key: Some("  ".to_string()),
            ..Default::default()
        };

        assert!(config.service_credentials().is_err());
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let config = BackendConfig {
            url: Some("https://db.example.com/".to_string()),
            anon_key: Some("anon".to_string()),
            ..Default::default()
        };

        let creds = config.client_credentials().unwrap();
        assert_eq!(creds.url, "https://db.example.com");
        assert_eq!(creds.key, "anon");
    }
}
