pub mod password;
pub mod session;

// Re-export handler functions for use in routing
pub use password::change_password as password_put;
pub use session::logout as session_logout;
pub use session::me as session_me;
