//! Payment gateway and password reset configuration

use super::backend::non_empty;
use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// External payment gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentsConfig {
    pub api_base: String,
    pub access_token: Option<String>,
    /// Currency credited to user balances
    pub currency: String,
    /// Gateway request timeout
    pub timeout_seconds: u64,
}

impl Default for PaymentsConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.mercadopago.com".to_string(),
            access_token: None,
            currency: "ARS".to_string(),
            timeout_seconds: 15,
        }
    }
}

impl PaymentsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Gateway access token, or a configuration error if unset
    pub fn require_access_token(&self) -> Result<&str, ConfigError> {
        non_empty(self.access_token.as_deref())
            .ok_or_else(|| ConfigError::missing("payments.access_token"))
    }
}

/// Password reset flow
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordResetConfig {
    /// Token lifetime
    pub token_ttl_minutes: u64,
    /// Public application URL the reset link points at
    pub app_url: String,
}

impl Default for PasswordResetConfig {
    fn default() -> Self {
        Self {
            token_ttl_minutes: 60,
            app_url: "http://localhost:5173".to_string(),
        }
    }
}

impl PasswordResetConfig {
    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_minutes * 60)
    }

    /// Link delivered by email for a given raw token
    pub fn reset_link(&self, token: &str) -> String {
        format!(
            "{}/reset-password?token={}",
            self.app_url.trim_end_matches('/'),
            token
        )
    }
}
