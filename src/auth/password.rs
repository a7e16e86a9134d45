#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("Password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),
}

/// Hash a password with bcrypt at the given cost. Every call draws a fresh salt.
pub fn hash_password(password: &str, cost: u32) -> Result<String, PasswordError> {
    Ok(bcrypt::hash(password, cost)?)
}

/// Verify a password against a stored bcrypt hash.
///
/// Malformed hashes count as a mismatch rather than an error so callers
/// cannot accidentally distinguish "bad hash" from "bad password".
pub fn verify_password(password: &str, hash: &str) -> bool {
    if password.is_empty() {
        return false;
    }
    bcrypt::verify(password, hash).unwrap_or(false)
}

/// Hash of a random string nobody knows, at `cost`. Built once at startup
/// with the configured cost so it matches the work of a real verification.
pub fn dummy_hash(cost: u32) -> Result<String, PasswordError> {
    hash_password(&uuid::Uuid::new_v4().to_string(), cost)
}

/// Burn one bcrypt verification against `dummy_hash` so a login for an
/// unknown username takes as long as one for a known username with a
/// wrong password.
pub fn dummy_verify(password: &str, dummy_hash: &str) {
    let _ = bcrypt::verify(password, dummy_hash);
}
