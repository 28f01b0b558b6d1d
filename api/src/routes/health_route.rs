use axum::Json;
use serde_json::{json, Value};

/// Liveness probe; always 200.
pub async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}
