// handlers/mod.rs - two handler tiers
//
// Public (no auth) → Protected (bearer token required). The routing table
// in lib.rs decides which tier gets the JWT middleware.
pub mod public;
pub mod protected;
