//! Password reset flow
//!
//! A request issues a random token, stores only its SHA-256 hash and emails
//! a link to the raw token. Confirmation checks the hash, the expiry and
//! single use before replacing the credential.

mod service;
mod store;
mod token;

pub use service::PasswordResetService;
pub use store::{
    AccountDirectory, BackendAccounts, BackendResetTokens, MemoryAccounts, MemoryResetTokens,
    ResetTokenStore, RESET_TOKENS_TABLE,
};
pub use token::{generate_token, hash_token, ResetTokenRecord};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResetError {
    #[error("Reset token is invalid")]
    Invalid,

    #[error("Reset token has expired")]
    Expired,

    #[error("Reset token was already used")]
    AlreadyUsed,

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Reset storage failed: {0}")]
    Store(String),
}

impl ResetError {
    /// Short machine-readable reason
    pub fn code(&self) -> &'static str {
        match self {
            ResetError::Invalid => "invalid",
            ResetError::Expired => "expired",
            ResetError::AlreadyUsed => "already used",
            ResetError::MissingField(_) => "missing field",
            ResetError::Store(_) => "store",
        }
    }
}

impl From<taskora_core::QueryError> for ResetError {
    fn from(err: taskora_core::QueryError) -> Self {
        ResetError::Store(err.to_string())
    }
}

impl From<taskora_core::BackendError> for ResetError {
    fn from(err: taskora_core::BackendError) -> Self {
        ResetError::Store(err.to_string())
    }
}
