use crate::state::AppState;
use crate::Result;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::{routing::post, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

pub fn reset_routes() -> Router<AppState> {
    Router::new()
        .route("/password-reset/request", post(request_reset))
        .route("/password-reset/confirm", post(confirm_reset))
}

#[derive(Debug, Deserialize)]
struct ResetRequest {
    #[serde(default)]
    email: String,
}

#[derive(Debug, Deserialize)]
struct ResetConfirmation {
    #[serde(default)]
    token: String,
    #[serde(default)]
    password: String,
}

async fn request_reset(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ResetRequest>, JsonRejection>,
) -> Result<Json<Value>> {
    let Json(req) = payload?;
    state.resets.request(&req.email).await?;
    Ok(Json(json!({ "ok": true })))
}

async fn confirm_reset(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ResetConfirmation>, JsonRejection>,
) -> Result<Json<Value>> {
    let Json(req) = payload?;
    state.resets.confirm(&req.token, &req.password).await?;
    Ok(Json(json!({ "ok": true })))
}
