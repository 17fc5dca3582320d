use crate::email::EmailMessage;
use crate::state::AppState;
use crate::Result;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::{routing::post, Json, Router};
use serde_json::{json, Value};

pub fn email_routes() -> Router<AppState> {
    Router::new().route("/send-email", post(send_email))
}

async fn send_email(
    State(state): State<AppState>,
    payload: std::result::Result<Json<EmailMessage>, JsonRejection>,
) -> Result<Json<Value>> {
    let Json(message) = payload?;
    message.validate()?;
    let message_id = state.mailer.send(&message).await?;
    Ok(Json(json!({ "ok": true, "messageId": message_id })))
}
