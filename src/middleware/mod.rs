pub mod auth;
pub mod json;
pub mod query;

pub use auth::jwt_auth_middleware;
pub use json::ValidJson;
pub use query::ValidQuery;
