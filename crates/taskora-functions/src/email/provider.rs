//! Email provider API client

use super::{EmailError, EmailMessage, Mailer};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use taskora_config::EmailConfig;
use tracing::{debug, error, info};

/// Sends through `POST <api_base>/emails` with a bearer API key
///
/// A missing key is reported on each send as [`EmailError::NotConfigured`],
/// so the service can start and answer other routes without one.
pub struct HttpMailer {
    client: Client,
    config: EmailConfig,
}

#[derive(Debug, Serialize)]
struct ProviderRequest<'a> {
    from: String,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ProviderResponse {
    id: String,
}

impl HttpMailer {
    pub fn new(client: Client, config: EmailConfig) -> Self {
        Self { client, config }
    }

    pub fn from_config(config: &EmailConfig) -> Result<Self, EmailError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| EmailError::NotConfigured(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self::new(client, config.clone()))
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, message: &EmailMessage) -> Result<String, EmailError> {
        message.validate()?;
        let api_key = self
            .config
            .require_api_key()
            .map_err(|e| EmailError::NotConfigured(e.to_string()))?;

        let url = format!("{}/emails", self.config.api_base.trim_end_matches('/'));
        let body = ProviderRequest {
            from: message.sender(&self.config),
            to: [message.to.as_str()],
            subject: &message.subject,
            html: &message.html,
            text: message.text.as_deref(),
        };

        debug!(to = %message.to, "Sending email through provider");
        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| EmailError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
                .unwrap_or(text);
            error!(status = status.as_u16(), message = %message, "Email provider rejected message");
            return Err(EmailError::Provider {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ProviderResponse = response
            .json()
            .await
            .map_err(|e| EmailError::Decode(e.to_string()))?;
        info!(message_id = %parsed.id, "Email sent");
        Ok(parsed.id)
    }
}
