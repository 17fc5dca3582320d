//! HTTP error mapping
//!
//! Every failure leaves the service as a non-2xx status with a JSON body
//! `{"error": "<message>"}`, plus a `code` for reset token rejections.

use crate::email::EmailError;
use crate::payment::PaymentError;
use crate::reset::ResetError;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FunctionsError {
    #[error("{message}")]
    BadRequest {
        message: String,
        code: Option<&'static str>,
    },

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Configuration(String),

    #[error("{0}")]
    Upstream(String),

    #[error("{0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, FunctionsError>;

/// Failures while wiring or running the server
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Backend configuration error: {0}")]
    Backend(#[from] taskora_rest::RestError),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Invalid bind address {0}")]
    Address(String),

    #[error("Server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FunctionsError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        FunctionsError::BadRequest {
            message: message.into(),
            code: None,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            FunctionsError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            FunctionsError::Forbidden(_) => StatusCode::FORBIDDEN,
            FunctionsError::NotFound(_) => StatusCode::NOT_FOUND,
            FunctionsError::Configuration(_) | FunctionsError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            FunctionsError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for FunctionsError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            FunctionsError::BadRequest {
                message,
                code: Some(code),
            } => json!({ "error": message, "code": code }),
            FunctionsError::Internal(detail) => {
                error!(detail = %detail, "Request failed");
                json!({ "error": "Internal server error" })
            }
            other => json!({ "error": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for FunctionsError {
    fn from(rejection: JsonRejection) -> Self {
        FunctionsError::bad_request(rejection.body_text())
    }
}

impl From<EmailError> for FunctionsError {
    fn from(err: EmailError) -> Self {
        match err {
            EmailError::NotConfigured(_) => FunctionsError::Configuration(err.to_string()),
            EmailError::InvalidRequest(message) => FunctionsError::bad_request(message),
            EmailError::Provider { .. } | EmailError::Unreachable(_) | EmailError::Decode(_) => {
                FunctionsError::Upstream(err.to_string())
            }
        }
    }
}

impl From<ResetError> for FunctionsError {
    fn from(err: ResetError) -> Self {
        match err {
            ResetError::Invalid
            | ResetError::Expired
            | ResetError::AlreadyUsed
            | ResetError::MissingField(_) => FunctionsError::BadRequest {
                message: err.to_string(),
                code: Some(err.code()),
            },
            ResetError::Store(detail) => FunctionsError::Internal(detail),
        }
    }
}

impl From<PaymentError> for FunctionsError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::NotConfigured(_) => FunctionsError::Configuration(err.to_string()),
            PaymentError::InvalidRequest(message) => FunctionsError::bad_request(message),
            PaymentError::NotFound(_) => FunctionsError::NotFound(err.to_string()),
            PaymentError::NotOwner => FunctionsError::Forbidden(err.to_string()),
            PaymentError::Gateway { .. } | PaymentError::Unreachable(_) => {
                FunctionsError::Upstream(err.to_string())
            }
            PaymentError::Ledger(detail) => FunctionsError::Internal(detail),
        }
    }
}
