// handlers/protected/mod.rs - Protected handlers (bearer access token required)
//
// Every route here sits behind `middleware::require_auth`, which loads the
// operator into a `CurrentUser` extension. `users` and settings writes are
// additionally wrapped in `middleware::require_admin`.

pub mod auth;
pub mod backups;
pub mod devices;
pub mod schedules;
pub mod settings;
pub mod users;
