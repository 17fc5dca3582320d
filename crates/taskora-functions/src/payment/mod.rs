//! Payment verification
//!
//! A client reports a payment id after checkout. [`PaymentVerifier`] looks the
//! payment up at the gateway, checks it belongs to the caller and, when it is
//! approved, credits the balance through a [`Ledger`] that records each
//! payment id at most once.

mod gateway;
mod ledger;
mod verifier;

pub use gateway::{ExternalPayment, HttpPaymentGateway, PaymentGateway, APPROVED};
pub use ledger::{CreditOutcome, Ledger, MemoryLedger, PaymentCredit, RpcLedger, CREDIT_FUNCTION};
pub use verifier::{PaymentVerifier, Verification};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PaymentError {
    #[error("Payment gateway is not configured: {0}")]
    NotConfigured(String),

    #[error("{0}")]
    InvalidRequest(String),

    #[error("Payment {0} not found")]
    NotFound(String),

    #[error("Payment does not belong to this user")]
    NotOwner,

    #[error("Payment gateway returned {status}: {message}")]
    Gateway { status: u16, message: String },

    #[error("Payment gateway unreachable: {0}")]
    Unreachable(String),

    #[error("Failed to record payment: {0}")]
    Ledger(String),
}

impl From<taskora_core::QueryError> for PaymentError {
    fn from(err: taskora_core::QueryError) -> Self {
        PaymentError::Ledger(err.to_string())
    }
}
