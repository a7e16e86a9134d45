//! Operator authentication and credential protection.
//!
//! * `password` - bcrypt hashing for operator passwords
//! * `tokens` - HMAC JWT access/refresh token pairs
//! * `crypto` - Fernet encryption of device API keys

pub mod crypto;
pub mod password;
pub mod tokens;

pub use crypto::{CryptoError, CryptoService};
pub use password::{dummy_hash, dummy_verify, hash_password, verify_password, PasswordError};
pub use tokens::{Claims, TokenError, TokenPair, TokenService, TokenType};
