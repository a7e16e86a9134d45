use std::sync::Arc;

use crate::auth::{dummy_hash, CryptoError, CryptoService, PasswordError, TokenError, TokenService};
use crate::config::AppConfig;
use crate::database::Store;

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error(transparent)]
    Tokens(#[from] TokenError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Password(#[from] PasswordError),
}

/// Shared handles passed to every handler through axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn Store>,
    pub tokens: Arc<TokenService>,
    pub crypto: Arc<CryptoService>,
    /// Verified against on logins for unknown usernames.
    pub dummy_hash: Arc<str>,
}

impl AppState {
    /// Fails when the JWT settings, the Fernet key or the bcrypt cost in
    /// `config` are unusable.
    pub fn new(config: AppConfig, store: Arc<dyn Store>) -> Result<Self, StateError> {
        let tokens = TokenService::new(&config.security)?;
        let crypto = CryptoService::new(&config.security.fernet_key)?;
        let decoy = dummy_hash(config.security.bcrypt_cost)?;

        Ok(Self {
            config: Arc::new(config),
            store,
            tokens: Arc::new(tokens),
            crypto: Arc::new(crypto),
            dummy_hash: Arc::from(decoy),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> AppConfig {
        let map: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn dummy_hash_follows_configured_cost() {
        let key = CryptoService::generate_key();
        let state = AppState::new(
            config(&[("FERNET_KEY", key.as_str()), ("BCRYPT_COST", "5")]),
            Arc::new(MemoryStore::new()),
        )
        .unwrap();
        assert!(state.dummy_hash.starts_with("$2b$05$"));
    }

    #[test]
    fn placeholder_fernet_key_is_rejected() {
        let result = AppState::new(config(&[("BCRYPT_COST", "4")]), Arc::new(MemoryStore::new()));
        assert!(matches!(result, Err(StateError::Crypto(_))));
    }
}
