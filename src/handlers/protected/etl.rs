use axum::{extract::State, response::Json, Extension};
use serde_json::Value;

use crate::auth::SessionClaims;
use crate::error::ApiError;
use crate::middleware::ValidJson;
use crate::state::AppState;
use crate::webhook::ForwardOutcome;

/// POST /etl/ingest - hand the JSON body to the n8n webhook as-is.
///
/// A webhook that answers, whatever the status, is reported back with
/// `ok = status < 300`. Only a failed request is a 502.
pub async fn ingest_post(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    ValidJson(payload): ValidJson<Value>,
) -> Result<Json<ForwardOutcome>, ApiError> {
    tracing::info!("Forwarding ingest payload from {}@{}", claims.user, claims.host);
    let outcome = state.webhook.forward(&payload).await.map_err(|e| {
        tracing::warn!("Ingest forwarding failed: {}", e);
        ApiError::from(e)
    })?;
    Ok(Json(outcome))
}
