use crate::payment::Verification;
use crate::state::AppState;
use crate::Result;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::{routing::post, Json, Router};
use serde::Deserialize;

pub fn payment_routes() -> Router<AppState> {
    Router::new().route("/verify-payment", post(verify_payment))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerifyRequest {
    #[serde(default)]
    payment_id: String,
    #[serde(default)]
    user_id: String,
}

async fn verify_payment(
    State(state): State<AppState>,
    payload: std::result::Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Json<Verification>> {
    let Json(req) = payload?;
    let verification = state.payments.verify(&req.payment_id, &req.user_id).await?;
    Ok(Json(verification))
}
