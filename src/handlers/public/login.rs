// handlers/public/login.rs - POST /login handler

use axum::{extract::State, response::Json};
use serde::Deserialize;

use crate::auth::{issue_session, IssuedToken};
use crate::error::ApiError;
use crate::middleware::ValidJson;
use crate::state::AppState;

/// No `Debug`: the body carries a password.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub host: String,
    pub user: String,
    pub password: String,
}

/// POST /login - verify IBM i credentials and receive a session token
///
/// Expected Input:
/// ```json
/// { "host": "ibmi.example.com", "user": "QUSER", "password": "..." }
/// ```
///
/// Expected Output:
/// ```json
/// { "access_token": "eyJhbGciOiJIUzI1NiI...", "token_type": "bearer", "expires_in": 3600 }
/// ```
///
/// The credentials are checked with a live round trip before anything is
/// signed. Empty fields are a 400, an unreachable host a 502 and any other
/// failure a 401.
pub async fn login_post(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<LoginRequest>,
) -> Result<Json<IssuedToken>, ApiError> {
    let token = issue_session(&state.connector, &state.signer, &body.host, &body.user, &body.password).await?;
    Ok(Json(token))
}
