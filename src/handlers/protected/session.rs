use axum::{response::Json, Extension};
use serde_json::{json, Value};

use crate::auth::SessionClaims;

/// GET /me - who the presented token belongs to. The embedded password is
/// never echoed.
pub async fn whoami(Extension(claims): Extension<SessionClaims>) -> Json<Value> {
    Json(json!({
        "sub": claims.sub,
        "iss": claims.iss,
        "host": claims.host,
        "user": claims.user,
        "exp": claims.exp,
    }))
}
