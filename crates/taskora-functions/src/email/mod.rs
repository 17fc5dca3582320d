//! Outbound email
//!
//! [`Mailer`] is the delivery seam. [`HttpMailer`] talks to the email
//! provider's API directly; [`EmailDispatcher`] is the client other services
//! use to reach a `/send-email` endpoint, with a fallback URL for when the
//! primary one is unreachable.

mod dispatch;
mod provider;

pub use dispatch::EmailDispatcher;
pub use provider::HttpMailer;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use taskora_config::EmailConfig;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EmailError {
    #[error("Email service is not configured: {0}")]
    NotConfigured(String),

    #[error("{0}")]
    InvalidRequest(String),

    #[error("Email provider returned {status}: {message}")]
    Provider { status: u16, message: String },

    #[error("Email endpoint unreachable: {0}")]
    Unreachable(String),

    #[error("Unexpected email provider response: {0}")]
    Decode(String),
}

/// A message as accepted by `POST /send-email`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailMessage {
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub html: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_name: Option<String>,
}

impl EmailMessage {
    pub fn new(
        to: impl Into<String>,
        subject: impl Into<String>,
        html: impl Into<String>,
    ) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            html: html.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Reject messages missing a recipient, subject or body
    pub fn validate(&self) -> Result<(), EmailError> {
        let missing: Vec<&str> = [
            ("to", &self.to),
            ("subject", &self.subject),
            ("html", &self.html),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(EmailError::InvalidRequest(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )))
        }
    }

    /// `Name <address>` header, falling back to the configured sender
    pub fn sender(&self, config: &EmailConfig) -> String {
        let email = self
            .from_email
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .unwrap_or(&config.from_email);
        let name = self
            .from_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&config.from_name);
        format!("{name} <{email}>")
    }
}

/// Email delivery
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver `message`, returning the provider's message id
    async fn send(&self, message: &EmailMessage) -> Result<String, EmailError>;
}
