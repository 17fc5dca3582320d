//! Shared handler state

use crate::email::{HttpMailer, Mailer};
use crate::error::ServerError;
use crate::payment::{HttpPaymentGateway, PaymentVerifier, RpcLedger};
use crate::reset::{BackendAccounts, BackendResetTokens, PasswordResetService};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use taskora_config::TaskoraConfig;
use taskora_core::QueryExecutor;
use taskora_rest::RestBackend;

#[derive(Clone)]
pub struct AppState {
    pub mailer: Arc<dyn Mailer>,
    pub resets: Arc<PasswordResetService>,
    pub payments: Arc<PaymentVerifier>,
}

impl AppState {
    pub fn new(
        mailer: Arc<dyn Mailer>,
        resets: Arc<PasswordResetService>,
        payments: Arc<PaymentVerifier>,
    ) -> Self {
        Self {
            mailer,
            resets,
            payments,
        }
    }
}

/// Wire the production collaborators
///
/// Backend access uses the service key, so a missing `backend.url` or
/// `backend.service_key` fails here. The email API key and the payment
/// access token are checked per request instead.
pub fn build_state(config: &TaskoraConfig) -> Result<AppState, ServerError> {
    let service = RestBackend::service_from_config(config)?;
    let executor = Arc::new(QueryExecutor::from_config(
        Arc::new(service.clone()),
        config,
    ));

    let email_http = Client::builder()
        .timeout(Duration::from_secs(config.email.timeout_seconds))
        .build()?;
    let payments_http = Client::builder()
        .timeout(config.payments.timeout())
        .build()?;

    let mailer: Arc<dyn Mailer> = Arc::new(HttpMailer::new(email_http, config.email.clone()));
    let resets = PasswordResetService::new(
        Arc::new(BackendResetTokens::new(executor.clone())),
        Arc::new(BackendAccounts::new(executor.clone(), service)),
        mailer.clone(),
        config.password_reset.clone(),
    );
    let payments = PaymentVerifier::new(
        Arc::new(HttpPaymentGateway::new(payments_http, config.payments.clone())),
        Arc::new(RpcLedger::new(executor)),
        config.payments.currency.clone(),
    );

    Ok(AppState::new(mailer, Arc::new(resets), Arc::new(payments)))
}
