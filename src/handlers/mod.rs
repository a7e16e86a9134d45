// handlers/mod.rs - Two-tier handler layout
//
// Public (no auth) -> Protected (access token, some routes admin-only)

pub mod extract;
pub mod protected;
pub mod public;
pub mod validate;
