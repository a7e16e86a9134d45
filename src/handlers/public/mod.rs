// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Health probing and token acquisition. Everything else lives under
// `protected` behind the bearer-token middleware.

pub mod auth;
pub mod health;

pub use health::health_get;
