// handlers/public/auth/mod.rs - Token acquisition (no authentication required)

pub mod login;   // POST /api/auth/login
pub mod refresh; // POST /api/auth/refresh

pub use login::login_post;
pub use refresh::refresh_post;
