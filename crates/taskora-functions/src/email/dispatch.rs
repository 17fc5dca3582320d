//! Client for the `/send-email` endpoint with serverless fallback
//!
//! The primary endpoint is tried first. Only an unreachable endpoint
//! (connection failure or timeout) moves on to the fallback; an error status
//! is the endpoint's answer and is returned as is.

use super::{EmailError, EmailMessage, Mailer};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use taskora_config::EmailConfig;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendEmailResponse {
    #[serde(default)]
    message_id: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

pub struct EmailDispatcher {
    client: Client,
    endpoints: Vec<String>,
}

impl EmailDispatcher {
    /// Endpoints are tried in order
    pub fn new(client: Client, endpoints: Vec<String>) -> Self {
        Self { client, endpoints }
    }

    pub fn from_config(config: &EmailConfig) -> Result<Self, EmailError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| EmailError::NotConfigured(format!("Failed to create HTTP client: {e}")))?;

        let endpoints = [&config.primary_endpoint, &config.fallback_endpoint]
            .into_iter()
            .flatten()
            .filter(|url| !url.trim().is_empty())
            .cloned()
            .collect();
        Ok(Self::new(client, endpoints))
    }

    async fn post(&self, endpoint: &str, message: &EmailMessage) -> Result<String, EmailError> {
        let response = self
            .client
            .post(endpoint)
            .json(message)
            .send()
            .await
            .map_err(|e| EmailError::Unreachable(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| EmailError::Unreachable(e.to_string()))?;
        let body = serde_json::from_str::<SendEmailResponse>(&text);

        if !status.is_success() {
            let message = match body {
                Ok(SendEmailResponse { error: Some(error), .. }) => error,
                _ if !text.trim().is_empty() => text,
                _ => status.canonical_reason().unwrap_or("error").to_string(),
            };
            return Err(EmailError::Provider {
                status: status.as_u16(),
                message,
            });
        }

        body.map_err(|e| EmailError::Decode(e.to_string()))?
            .message_id
            .ok_or_else(|| EmailError::Decode("response has no messageId".to_string()))
    }
}

#[async_trait]
impl Mailer for EmailDispatcher {
    async fn send(&self, message: &EmailMessage) -> Result<String, EmailError> {
        let mut last_error =
            EmailError::NotConfigured("no send-email endpoint configured".to_string());

        for endpoint in &self.endpoints {
            debug!(endpoint, "Dispatching email");
            match self.post(endpoint, message).await {
                Err(EmailError::Unreachable(reason)) => {
                    warn!(endpoint, reason = %reason, "Email endpoint unreachable, trying fallback");
                    last_error = EmailError::Unreachable(reason);
                }
                outcome => return outcome,
            }
        }
        Err(last_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn message() -> EmailMessage {
        EmailMessage::new("ana@example.com", "Welcome", "<p>Hi</p>")
    }

    /// An address nothing listens on
    const DEAD_ENDPOINT: &str = "http://127.0.0.1:9/send-email";

    #[tokio::test]
    async fn test_falls_back_when_primary_unreachable() {
        let fallback = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/functions/v1/send-email"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "ok": true, "messageId": "fb_1" })),
            )
            .expect(1)
            .mount(&fallback)
            .await;

        let dispatcher = EmailDispatcher::new(
            Client::new(),
            vec![
                DEAD_ENDPOINT.to_string(),
                format!("{}/functions/v1/send-email", fallback.uri()),
            ],
        );

        assert_eq!(dispatcher.send(&message()).await.unwrap(), "fb_1");
    }

    #[tokio::test]
    async fn test_error_status_is_not_retried() {
        let primary = MockServer::start().await;
        let fallback = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(500).set_body_json(json!({ "error": "provider down" })),
            )
            .expect(1)
            .mount(&primary)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true, "messageId": "x" })))
            .expect(0)
            .mount(&fallback)
            .await;

        let dispatcher = EmailDispatcher::new(Client::new(), vec![primary.uri(), fallback.uri()]);
        let err = dispatcher.send(&message()).await.unwrap_err();

        assert_eq!(
            err,
            EmailError::Provider {
                status: 500,
                message: "provider down".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_no_endpoints() {
        let dispatcher = EmailDispatcher::from_config(&EmailConfig::default()).unwrap();
        assert!(matches!(
            dispatcher.send(&message()).await,
            Err(EmailError::NotConfigured(_))
        ));
    }
}
