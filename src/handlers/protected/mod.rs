// handlers/protected/mod.rs - Protected handlers (bearer token required)
//
// Every handler here runs after jwt_auth_middleware and reads the caller's
// remote credentials from the `SessionClaims` extension.
pub mod catalog;
pub mod etl;
pub mod extract;
pub mod session;

pub use catalog::{catalog_post, catalog_schemas_post, CatalogRequest, SchemaRequest};
pub use etl::ingest_post;
pub use extract::{extract_post, ExtractParams, ExtractRequest};
pub use session::whoami;
