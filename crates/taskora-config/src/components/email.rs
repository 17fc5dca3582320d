//! Outbound email configuration

use super::backend::non_empty;
use crate::ConfigError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    /// Email provider API base URL
    pub api_base: String,
    /// Email provider API key
    pub api_key: Option<String>,
    /// Default sender address
    pub from_email: String,
    /// Default sender display name
    pub from_name: String,
    /// Primary `/send-email` endpoint used by the dispatcher
    pub primary_endpoint: Option<String>,
    /// Serverless function used when the primary endpoint is unreachable
    pub fallback_endpoint: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.resend.com".to_string(),
            api_key: None,
            from_email: "no-reply@taskora.app".to_string(),
            from_name: "Taskora".to_string(),
            primary_endpoint: None,
            fallback_endpoint: None,
            timeout_seconds: 15,
        }
    }
}

impl EmailConfig {
    /// API key, or a configuration error if unset
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        non_empty(self.api_key.as_deref()).ok_or_else(|| ConfigError::missing("email.api_key"))
    }

    /// `"Name <address>"` sender string
    pub fn default_sender(&self) -> String {
        format!("{} <{}>", self.from_name, self.from_email)
    }
}
