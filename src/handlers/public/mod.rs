// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Liveness checks and token acquisition.
pub mod health;
pub mod login;

pub use health::{health, health_n8n};
pub use login::{login_post, LoginRequest};
