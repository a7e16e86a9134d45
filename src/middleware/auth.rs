use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
    Extension,
};

use crate::auth::TokenError;
use crate::database::models::User;
use crate::error::ApiError;
use crate::state::AppState;

/// The operator behind the bearer token, loaded fresh from the store on
/// every request.
#[derive(Clone, Debug)]
pub struct CurrentUser(pub User);

impl std::ops::Deref for CurrentUser {
    type Target = User;

    fn deref(&self) -> &User {
        &self.0
    }
}

/// Validates the bearer access token and injects `CurrentUser` into the
/// request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer(&headers).map_err(|msg| {
        tracing::debug!("Rejected request to {}: {}", request.uri().path(), msg);
        ApiError::unauthorized("Not authenticated")
    })?;

    let claims = state.tokens.decode_access(token).map_err(|err| {
        tracing::warn!("Rejected token on {}: {}", request.uri().path(), err);
        match err {
            TokenError::WrongType => ApiError::unauthorized("Invalid token type"),
            _ => ApiError::unauthorized("Could not validate credentials"),
        }
    })?;

    let user_id = claims
        .user_id()
        .ok_or_else(|| ApiError::unauthorized("Could not validate credentials"))?;

    let user = match state.store.get_user(user_id).await? {
        Some(user) if user.is_active => user,
        Some(_) => {
            tracing::warn!("Inactive user {} presented a valid token", user_id);
            return Err(ApiError::unauthorized("User not found or inactive"));
        }
        None => return Err(ApiError::unauthorized("User not found or inactive")),
    };

    request.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(request).await)
}

/// Must sit inside `require_auth`.
pub async fn require_admin(
    Extension(user): Extension<CurrentUser>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if !user.is_admin {
        tracing::warn!("User {} denied admin route {}", user.username, request.uri().path());
        return Err(ApiError::forbidden("Admin privileges required"));
    }
    Ok(next.run(request).await)
}

/// Extract the token from an `Authorization: Bearer <token>` header
fn extract_bearer(headers: &HeaderMap) -> Result<&str, &'static str> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or("missing Authorization header")?
        .to_str()
        .map_err(|_| "Authorization header is not valid ASCII")?;

    let (scheme, token) = value
        .split_once(' ')
        .ok_or("Authorization header must use Bearer scheme")?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err("Authorization header must use Bearer scheme");
    }

    let token = token.trim();
    if token.is_empty() {
        return Err("empty bearer token");
    }
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn extracts_bearer_token() {
        assert_eq!(extract_bearer(&headers("Bearer abc.def.ghi")), Ok("abc.def.ghi"));
        assert_eq!(extract_bearer(&headers("bearer abc")), Ok("abc"));
    }

    #[test]
    fn rejects_other_schemes_and_empty_tokens() {
        assert!(extract_bearer(&HeaderMap::new()).is_err());
        assert!(extract_bearer(&headers("Basic dXNlcjpwYXNz")).is_err());
        assert!(extract_bearer(&headers("Bearer ")).is_err());
        assert!(extract_bearer(&headers("Bearer")).is_err());
    }
}
