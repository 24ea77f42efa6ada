// handlers/protected/extract.rs - POST /extract?format=json|csv|xlsx

use axum::{extract::State, Extension};
use serde::Deserialize;

use crate::auth::SessionClaims;
use crate::catalog::{CatalogQueryBuilder, Identifier, ROW_LIMIT};
use crate::error::ApiError;
use crate::middleware::{ValidJson, ValidQuery};
use crate::render::{render, Export, ExportFormat};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtractRequest {
    pub library: String,
    pub table: String,
    pub limit: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExtractParams {
    pub format: Option<String>,
}

/// Read up to `limit` rows (default 200, at most 5000) from one table.
///
/// Library and table are validated before any SQL is built; format aliases
/// `xls` and `excel` mean `xlsx`.
pub async fn extract_post(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    ValidQuery(params): ValidQuery<ExtractParams>,
    ValidJson(body): ValidJson<ExtractRequest>,
) -> Result<Export, ApiError> {
    let format = match params.format.as_deref() {
        Some(raw) => raw.parse::<ExportFormat>()?,
        None => ExportFormat::Json,
    };
    let library = Identifier::parse(&body.library)?;
    let table = Identifier::parse(&body.table)?;
    let limit = ROW_LIMIT.clamp(body.limit);

    let statement = CatalogQueryBuilder::extract_rows(&library, &table, limit);
    let rows = state
        .connector
        .run(&claims.credentials(), &statement)
        .await
        .map_err(|e| ApiError::remote("Error executing SQL", &e))?;

    tracing::info!(
        "Extracted {} rows from {}.{} for {} as {:?}",
        rows.len(),
        library,
        table,
        claims.user,
        format
    );
    Ok(render(format, &rows, &library, &table)?)
}
