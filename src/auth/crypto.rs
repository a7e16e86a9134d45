use fernet::Fernet;

#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("Invalid Fernet key: expected 32 bytes of url-safe base64 (run `backup-manager generate-key`)")]
    InvalidKey,

    #[error("Invalid or corrupted encrypted data")]
    InvalidToken,
}

/// Encrypts device API credentials at rest using Fernet
/// (AES-128-CBC + HMAC-SHA256, timestamped, base64 url-safe tokens).
pub struct CryptoService {
    fernet: Fernet,
}

impl std::fmt::Debug for CryptoService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CryptoService { .. }")
    }
}

impl CryptoService {
    pub fn new(key: &str) -> Result<Self, CryptoError> {
        let fernet = Fernet::new(key.trim()).ok_or(CryptoError::InvalidKey)?;
        Ok(Self { fernet })
    }

    /// Encrypt a string. A fresh IV is drawn per call.
    pub fn encrypt(&self, plaintext: &str) -> String {
        self.fernet.encrypt(plaintext.as_bytes())
    }

    pub fn decrypt(&self, ciphertext: &str) -> Result<String, CryptoError> {
        let bytes = self
            .fernet
            .decrypt(ciphertext)
            .map_err(|_| CryptoError::InvalidToken)?;
        String::from_utf8(bytes).map_err(|_| CryptoError::InvalidToken)
    }

    /// Generate a new key suitable for `FERNET_KEY`.
    pub fn generate_key() -> String {
        Fernet::generate_key()
    }
}
