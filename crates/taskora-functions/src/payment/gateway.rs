//! Payment gateway lookups

use super::PaymentError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use taskora_config::PaymentsConfig;
use tracing::{debug, error};

/// Gateway status of a settled, successful payment
pub const APPROVED: &str = "approved";

/// The fields of a gateway payment the verifier relies on
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExternalPayment {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub external_reference: Option<String>,
    #[serde(default)]
    pub transaction_amount: f64,
    #[serde(default)]
    pub currency_id: Option<String>,
}

/// Gateways report numeric ids; keep them as strings
fn id_as_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        other => other.to_string(),
    })
}

impl ExternalPayment {
    pub fn is_approved(&self) -> bool {
        self.status == APPROVED
    }

    /// Reference equal to the user id or of the form `<user_id>:<suffix>`
    pub fn belongs_to(&self, user_id: &str) -> bool {
        match self.external_reference.as_deref() {
            Some(reference) => {
                reference == user_id
                    || reference
                        .strip_prefix(user_id)
                        .is_some_and(|rest| rest.starts_with(':'))
            }
            None => false,
        }
    }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn fetch_payment(&self, payment_id: &str) -> Result<ExternalPayment, PaymentError>;
}

/// `GET <api_base>/v1/payments/<id>` with a bearer access token
///
/// Each lookup is bounded by `payments.timeout_seconds`, whatever timeout
/// the shared client carries.
pub struct HttpPaymentGateway {
    client: Client,
    config: PaymentsConfig,
}

impl HttpPaymentGateway {
    pub fn new(client: Client, config: PaymentsConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn fetch_payment(&self, payment_id: &str) -> Result<ExternalPayment, PaymentError> {
        let token = self
            .config
            .require_access_token()
            .map_err(|e| PaymentError::NotConfigured(e.to_string()))?;
        let url = format!(
            "{}/v1/payments/{}",
            self.config.api_base.trim_end_matches('/'),
            urlencoding::encode(payment_id)
        );

        debug!(payment_id, "Fetching payment from gateway");
        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .timeout(self.config.timeout())
            .send()
            .await
            .map_err(|e| PaymentError::Unreachable(e.to_string()))?;

        match response.status() {
            status if status.is_success() => response
                .json()
                .await
                .map_err(|e| PaymentError::Gateway {
                    status: status.as_u16(),
                    message: format!("unexpected payment payload: {e}"),
                }),
            StatusCode::NOT_FOUND => Err(PaymentError::NotFound(payment_id.to_string())),
            status => {
                let text = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<Value>(&text)
                    .ok()
                    .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
                    .unwrap_or(text);
                error!(payment_id, status = status.as_u16(), message = %message, "Gateway lookup failed");
                Err(PaymentError::Gateway {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }
}
