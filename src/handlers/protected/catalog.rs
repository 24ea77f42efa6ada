// handlers/protected/catalog.rs - POST /catalog and POST /catalog/schemas

use axum::{extract::State, response::Json, Extension};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::SessionClaims;
use crate::catalog::{
    resolve_libraries, retain_allowed, CatalogQueryBuilder, WildcardPattern, SCHEMA_LIMIT, TABLE_LIMIT,
};
use crate::error::ApiError;
use crate::middleware::ValidJson;
use crate::remote::value_to_text;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogRequest {
    pub library: Option<String>,
    pub pattern: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaRequest {
    pub pattern: Option<String>,
    pub limit: Option<i64>,
}

/// POST /catalog - tables in the allow-listed schemas, or in `library`
/// when no allow-list is configured.
///
/// Output: `{ "items": [{"schema", "table"}], "count", "libs" }`
pub async fn catalog_post(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    ValidJson(body): ValidJson<CatalogRequest>,
) -> Result<Json<Value>, ApiError> {
    let libs = resolve_libraries(&state.config.catalog.allowed_libraries, body.library.as_deref())?;
    let pattern = WildcardPattern::parse(body.pattern.as_deref());
    let limit = TABLE_LIMIT.clamp(body.limit);

    let statement = CatalogQueryBuilder::list_tables(&libs, pattern.as_ref(), limit);
    let rows = state
        .connector
        .run(&claims.credentials(), &statement)
        .await
        .map_err(|e| ApiError::remote("Error executing SQL", &e))?;

    let items: Vec<Value> = rows
        .rows
        .iter()
        .map(|row| {
            let cell = |i: usize| row.get(i).map(value_to_text).unwrap_or_default();
            json!({ "schema": cell(0), "table": cell(1) })
        })
        .collect();

    Ok(Json(json!({
        "count": items.len(),
        "items": items,
        "libs": libs,
    })))
}

/// POST /catalog/schemas - schema names, optionally filtered by a `*`/`?`
/// pattern. With an allow-list configured only allow-listed names survive.
pub async fn catalog_schemas_post(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    ValidJson(body): ValidJson<SchemaRequest>,
) -> Result<Json<Value>, ApiError> {
    let pattern = WildcardPattern::parse(body.pattern.as_deref());
    let limit = SCHEMA_LIMIT.clamp(body.limit);

    let statement = CatalogQueryBuilder::list_schemas(pattern.as_ref(), limit);
    let rows = state
        .connector
        .run(&claims.credentials(), &statement)
        .await
        .map_err(|e| ApiError::remote("Error executing SQL", &e))?;

    let schemas = retain_allowed(rows.first_column_strings(), &state.config.catalog.allowed_libraries);
    Ok(Json(json!({
        "count": schemas.len(),
        "schemas": schemas,
    })))
}
