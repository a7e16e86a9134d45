use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::config::SecurityConfig;

/// Which half of the token pair a JWT is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user id, as a string.
    pub sub: String,
    #[serde(rename = "type")]
    pub token_type: TokenType,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

impl Claims {
    /// Parse the subject as a numeric user id.
    pub fn user_id(&self) -> Option<i32> {
        self.sub.parse().ok()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("JWT generation error: {0}")]
    Generation(String),

    #[error("Invalid or expired token")]
    Invalid,

    #[error("Invalid token type")]
    WrongType,
}

/// Access/refresh token pair as returned by login and refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
}

/// Signs and verifies the HMAC JWTs handed to operators.
#[derive(Clone)]
pub struct TokenService {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("algorithm", &self.algorithm)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

impl TokenService {
    pub fn new(security: &SecurityConfig) -> Result<Self, TokenError> {
        let algorithm = match Algorithm::from_str(&security.jwt_algorithm) {
            Ok(alg @ (Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512)) => alg,
            _ => {
                return Err(TokenError::Generation(format!(
                    "unsupported algorithm {}",
                    security.jwt_algorithm
                )))
            }
        };

        let access_ttl = Duration::try_minutes(security.jwt_access_token_expire_minutes)
            .ok_or_else(|| TokenError::Generation("access token lifetime out of range".into()))?;
        let refresh_ttl = Duration::try_days(security.jwt_refresh_token_expire_days)
            .ok_or_else(|| TokenError::Generation("refresh token lifetime out of range".into()))?;

        Ok(Self {
            algorithm,
            encoding_key: EncodingKey::from_secret(security.secret_key.as_bytes()),
            decoding_key: DecodingKey::from_secret(security.secret_key.as_bytes()),
            access_ttl,
            refresh_ttl,
        })
    }

    /// Issue an access token. `expires_in` overrides the configured lifetime.
    pub fn create_access_token(
        &self,
        sub: &str,
        expires_in: Option<Duration>,
    ) -> Result<String, TokenError> {
        self.sign(sub, TokenType::Access, expires_in.unwrap_or(self.access_ttl))
    }

    pub fn create_refresh_token(&self, sub: &str) -> Result<String, TokenError> {
        self.sign(sub, TokenType::Refresh, self.refresh_ttl)
    }

    pub fn issue_pair(&self, sub: &str) -> Result<TokenPair, TokenError> {
        Ok(TokenPair {
            access_token: self.create_access_token(sub, None)?,
            refresh_token: self.create_refresh_token(sub)?,
            token_type: "bearer".to_string(),
        })
    }

    /// Decode and validate any token. Signature, algorithm and expiry must all
    /// check out; every failure collapses to `None`.
    pub fn decode_token(&self, token: &str) -> Option<Claims> {
        if token.is_empty() {
            return None;
        }
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;
        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .ok()
    }

    pub fn decode_access(&self, token: &str) -> Result<Claims, TokenError> {
        self.decode_typed(token, TokenType::Access)
    }

    pub fn decode_refresh(&self, token: &str) -> Result<Claims, TokenError> {
        self.decode_typed(token, TokenType::Refresh)
    }

    fn decode_typed(&self, token: &str, expected: TokenType) -> Result<Claims, TokenError> {
        let claims = self.decode_token(token).ok_or(TokenError::Invalid)?;
        if claims.token_type != expected {
            return Err(TokenError::WrongType);
        }
        Ok(claims)
    }

    fn sign(&self, sub: &str, token_type: TokenType, ttl: Duration) -> Result<String, TokenError> {
        let now = Utc::now();
        let expires = now
            .checked_add_signed(ttl)
            .ok_or_else(|| TokenError::Generation("token expiry out of range".into()))?;
        let claims = Claims {
            sub: sub.to_string(),
            token_type,
            exp: expires.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Generation(e.to_string()))
    }
}
