pub mod identifier;
pub mod query;

use thiserror::Error;

pub use identifier::{Identifier, IdentifierError};
pub use query::{
    translate_wildcards, CatalogQueryBuilder, LimitPolicy, SqlStatement, WildcardPattern, ROW_LIMIT,
    SCHEMA_LIMIT, TABLE_LIMIT,
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Must specify 'library' or configure ALLOW_LIBS on the server")]
    NoLibrary,

    #[error(transparent)]
    Identifier(#[from] IdentifierError),
}

/// Schemas a table listing covers: the allow-list when configured, otherwise
/// the caller's library.
pub fn resolve_libraries(
    allowed: &[Identifier],
    requested: Option<&str>,
) -> Result<Vec<Identifier>, CatalogError> {
    if !allowed.is_empty() {
        return Ok(allowed.to_vec());
    }
    match requested.map(str::trim).filter(|s| !s.is_empty()) {
        Some(library) => Ok(vec![Identifier::parse(library)?]),
        None => Err(CatalogError::NoLibrary),
    }
}

/// Drop schema names outside the allow-list. An empty allow-list keeps everything.
pub fn retain_allowed(schemas: Vec<String>, allowed: &[Identifier]) -> Vec<String> {
    if allowed.is_empty() {
        return schemas;
    }
    schemas
        .into_iter()
        .filter(|s| {
            let upper = s.trim().to_ascii_uppercase();
            allowed.iter().any(|a| a.as_str() == upper)
        })
        .collect()
}
