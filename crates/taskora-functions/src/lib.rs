//! # Taskora Functions
//!
//! The server-side operations of the Taskora marketplace behind one axum
//! service:
//!
//! - `POST /send-email` delivers a message through the configured [`email::Mailer`]
//! - `POST /password-reset/request` and `POST /password-reset/confirm` run the
//!   single-use token flow in [`reset`]
//! - `POST /verify-payment` checks a gateway payment and credits it once
//!   ([`payment`])
//! - `GET /health`
//!
//! Handlers answer `{"error": ...}` with a non-2xx status on failure; see
//! [`FunctionsError`].

pub mod email;
pub mod error;
pub mod payment;
pub mod reset;
pub mod routes;
pub mod server;
pub mod state;

pub use error::{FunctionsError, Result, ServerError};
pub use server::{router, start_server};
pub use state::{build_state, AppState};
