//! Signature-verified webhook intake.
//!
//! The raw body is read as bytes so HMAC verification sees exactly what
//! the hosting platform signed. Accepted deliveries answer 202 and are
//! processed asynchronously; downstream failures never reach the caller.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use serde_json::{json, Value};
use tracing::{debug, instrument};

use crate::core::app_state::AppState;
use crate::error_handler::{AppError, AppResult};
use crate::signature::verify_signature;

#[instrument(name = "github_webhook_route", skip(state, headers, body))]
pub async fn github_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<(StatusCode, Json<Value>)> {
    let event_type = headers
        .get("X-GitHub-Event")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or(AppError::MissingEventHeader)?;

    let delivery_id = headers
        .get("X-GitHub-Delivery")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let signature = headers
        .get("X-Hub-Signature-256")
        .and_then(|v| v.to_str().ok());
    if !verify_signature(&state.config.webhook_secret, signature, &body) {
        return Err(AppError::InvalidSignature);
    }

    let dispatcher = state
        .dispatcher
        .as_ref()
        .ok_or(AppError::ProcessorUnavailable)?;

    dispatcher.enqueue(event_type, &body, delivery_id)?;
    debug!(event = event_type, delivery = delivery_id, "webhook enqueued");

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "status": "queued",
            "event_type": event_type,
            "delivery_id": delivery_id,
        })),
    ))
}
