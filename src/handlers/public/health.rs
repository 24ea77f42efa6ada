// handlers/public/health.rs - GET /health and GET /health/n8n

use axum::{extract::State, response::Json};
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::state::AppState;
use crate::webhook::ProbeOutcome;

/// GET /health - process liveness only, touches nothing remote
pub async fn health() -> Json<Value> {
    Json(json!({ "ok": true }))
}

/// GET /health/n8n - reachability of the webhook host.
///
/// Any answer below 500 counts as up. No answer at all is a 503.
pub async fn health_n8n(State(state): State<AppState>) -> Result<Json<ProbeOutcome>, ApiError> {
    if !state.webhook.is_configured() {
        return Err(ApiError::bad_request("N8N_WEBHOOK_URL is not configured"));
    }

    match state.webhook.probe().await {
        Ok(outcome) => Ok(Json(outcome)),
        Err(e) => {
            tracing::warn!("Webhook host unreachable: {}", e);
            Err(ApiError::service_unavailable(format!("n8n unreachable: {}", e)))
        }
    }
}
