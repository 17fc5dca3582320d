use super::{Ledger, PaymentCredit, PaymentError, PaymentGateway};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Result of a verification, serialized as the route's response body
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Verification {
    pub payment_id: String,
    pub status: String,
    pub amount: f64,
    /// True only on the call that recorded the payment
    pub credited: bool,
    pub already_processed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance: Option<f64>,
}

pub struct PaymentVerifier {
    gateway: Arc<dyn PaymentGateway>,
    ledger: Arc<dyn Ledger>,
    currency: String,
}

impl PaymentVerifier {
    /// `currency` applies when the gateway does not report one
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        ledger: Arc<dyn Ledger>,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            gateway,
            ledger,
            currency: currency.into(),
        }
    }

    pub async fn verify(
        &self,
        payment_id: &str,
        user_id: &str,
    ) -> Result<Verification, PaymentError> {
        let payment_id = payment_id.trim();
        let user_id = user_id.trim();
        if payment_id.is_empty() || user_id.is_empty() {
            return Err(PaymentError::InvalidRequest(
                "Missing required fields: paymentId, userId".to_string(),
            ));
        }

        let payment = self.gateway.fetch_payment(payment_id).await?;
        if !payment.belongs_to(user_id) {
            warn!(payment_id, user_id, "Payment reference does not match caller");
            return Err(PaymentError::NotOwner);
        }

        if !payment.is_approved() {
            info!(payment_id, status = %payment.status, "Payment not approved, nothing credited");
            return Ok(Verification {
                payment_id: payment.id,
                status: payment.status,
                amount: payment.transaction_amount,
                credited: false,
                already_processed: false,
                balance: None,
            });
        }

        let credit = PaymentCredit {
            payment_id: payment.id.clone(),
            user_id: user_id.to_string(),
            amount: payment.transaction_amount,
            currency: payment
                .currency_id
                .clone()
                .unwrap_or_else(|| self.currency.clone()),
        };
        let outcome = self.ledger.credit_once(&credit).await?;
        if outcome.credited {
            info!(payment_id, user_id, amount = credit.amount, "Payment credited");
        } else {
            info!(payment_id, "Payment already processed");
        }

        Ok(Verification {
            payment_id: payment.id,
            status: payment.status,
            amount: payment.transaction_amount,
            credited: outcome.credited,
            already_processed: !outcome.credited,
            balance: Some(outcome.balance),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payment::{ExternalPayment, MemoryLedger, APPROVED};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    #[derive(Default)]
    struct StubGateway {
        payments: Mutex<HashMap<String, ExternalPayment>>,
    }

    impl StubGateway {
        fn with(self, id: &str, status: &str, reference: &str, amount: f64) -> Self {
            self.payments.lock().insert(
                id.to_string(),
                ExternalPayment {
                    id: id.to_string(),
                    status: status.to_string(),
                    external_reference: Some(reference.to_string()),
                    transaction_amount: amount,
                    currency_id: None,
                },
            );
            self
        }
    }

    #[async_trait]
    impl PaymentGateway for StubGateway {
        async fn fetch_payment(&self, payment_id: &str) -> Result<ExternalPayment, PaymentError> {
            self.payments
                .lock()
                .get(payment_id)
                .cloned()
                .ok_or_else(|| PaymentError::NotFound(payment_id.to_string()))
        }
    }

    fn verifier(gateway: StubGateway, ledger: Arc<MemoryLedger>) -> PaymentVerifier {
        PaymentVerifier::new(Arc::new(gateway), ledger, "ARS")
    }

    #[tokio::test]
    async fn test_credits_once() {
        let ledger = Arc::new(MemoryLedger::new().with_balance("u1", 20.0));
        let verifier = verifier(
            StubGateway::default().with("p1", APPROVED, "u1:credits", 80.0),
            ledger.clone(),
        );

        let first = verifier.verify("p1", "u1").await.unwrap();
        assert!(first.credited);
        assert!(!first.already_processed);
        assert_eq!(first.balance, Some(100.0));

        let second = verifier.verify("p1", "u1").await.unwrap();
        assert!(!second.credited);
        assert!(second.already_processed);
        assert_eq!(second.balance, Some(100.0));
        assert_eq!(ledger.balance_of("u1"), 100.0);
        assert_eq!(ledger.transaction_count(), 1);
    }

    #[tokio::test]
    async fn test_pending_is_reported_not_credited() {
        let ledger = Arc::new(MemoryLedger::new());
        let verifier = verifier(
            StubGateway::default().with("p2", "pending", "u1", 50.0),
            ledger.clone(),
        );

        let result = verifier.verify("p2", "u1").await.unwrap();
        assert_eq!(result.status, "pending");
        assert!(!result.credited);
        assert_eq!(result.balance, None);
        assert_eq!(ledger.transaction_count(), 0);
    }

    #[tokio::test]
    async fn test_other_users_payment_rejected() {
        let ledger = Arc::new(MemoryLedger::new());
        let verifier = verifier(
            StubGateway::default().with("p3", APPROVED, "u2", 50.0),
            ledger.clone(),
        );

        assert_eq!(
            verifier.verify("p3", "u1").await.unwrap_err(),
            PaymentError::NotOwner
        );
        assert_eq!(ledger.balance_of("u1"), 0.0);
    }

    #[tokio::test]
    async fn test_missing_ids() {
        let verifier = verifier(StubGateway::default(), Arc::new(MemoryLedger::new()));
        assert!(matches!(
            verifier.verify("", "u1").await,
            Err(PaymentError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_response_shape() {
        let body = serde_json::to_value(Verification {
            payment_id: "p1".to_string(),
            status: APPROVED.to_string(),
            amount: 10.0,
            credited: true,
            already_processed: false,
            balance: Some(10.0),
        })
        .unwrap();
        assert_eq!(body["paymentId"], "p1");
        assert_eq!(body["alreadyProcessed"], false);
    }
}
