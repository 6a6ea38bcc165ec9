use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, Request, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::warn;

use crate::application::auth::{AuthError, Principal, strip_bearer};

use super::error::ApiError;
use super::state::ApiState;

const LEGACY_TOKEN_HEADER: &str = "token";

pub async fn require_token(
    State(state): State<ApiState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let token = match extract_token(request.headers()) {
        Some(value) => value,
        None => return ApiError::unauthorized().into_response(),
    };

    let principal = match state.tokens.verify(&token) {
        Ok(principal) => principal,
        Err(AuthError::Expired) => return ApiError::expired().into_response(),
        Err(AuthError::Missing) | Err(AuthError::Invalid) | Err(AuthError::Signing(_)) => {
            return ApiError::unauthorized().into_response();
        }
    };

    request.extensions_mut().insert(principal.clone());
    let mut response = next.run(request).await;
    response.extensions_mut().insert(principal);
    response
}

/// Runs after `require_token`; rejects principals without the admin role.
pub async fn require_admin(request: Request<Body>, next: Next) -> Response {
    let role = request
        .extensions()
        .get::<Principal>()
        .map(|principal| (principal.is_admin, principal.username.clone()));

    match role {
        Some((true, _)) => next.run(request).await,
        Some((false, username)) => {
            warn!(
                target = "vitrine::http::auth",
                username = %username,
                path = %request.uri().path(),
                "non-admin principal rejected"
            );
            ApiError::forbidden().into_response()
        }
        None => ApiError::unauthorized().into_response(),
    }
}

fn extract_token(headers: &HeaderMap) -> Option<String> {
    header_token(headers.get(header::AUTHORIZATION))
        .or_else(|| header_token(headers.get(LEGACY_TOKEN_HEADER)))
}

fn header_token(value: Option<&HeaderValue>) -> Option<String> {
    let raw = value?.to_str().ok()?;
    let token = strip_bearer(raw);
    (!token.is_empty()).then(|| token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorization_header_wins_over_legacy_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer one"));
        headers.insert(LEGACY_TOKEN_HEADER, HeaderValue::from_static("Bearer two"));
        assert_eq!(extract_token(&headers).as_deref(), Some("one"));
    }

    #[test]
    fn legacy_token_header_is_accepted() {
        let mut headers = HeaderMap::new();
        headers.insert(LEGACY_TOKEN_HEADER, HeaderValue::from_static("Bearer two"));
        assert_eq!(extract_token(&headers).as_deref(), Some("two"));
    }

    #[test]
    fn empty_bearer_is_missing() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert!(extract_token(&headers).is_none());
    }
}
