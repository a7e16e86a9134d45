pub mod admin;
pub mod key;
pub mod serve;
