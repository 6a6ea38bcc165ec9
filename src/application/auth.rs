//! Bearer token issuing and verification.
//!
//! Tokens are HS256 JWTs. The signing secret decides the role: a token signed
//! with the admin secret grants admin access, one signed with the user secret
//! does not.

use std::time::Duration;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing token")]
    Missing,
    #[error("invalid token")]
    Invalid,
    #[error("expired token")]
    Expired,
    #[error("token could not be signed: {0}")]
    Signing(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub username: String,
    pub is_admin: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    usr: String,
    exp: i64,
}

#[derive(Clone)]
pub struct TokenVerifier {
    user: Keys,
    admin: Keys,
    validation: Validation,
    ttl: Duration,
}

#[derive(Clone)]
struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl Keys {
    fn from_secret(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

impl TokenVerifier {
    pub fn new(user_secret: &str, admin_secret: &str, ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            user: Keys::from_secret(user_secret),
            admin: Keys::from_secret(admin_secret),
            validation,
            ttl,
        }
    }

    pub fn issue(&self, username: &str, admin: bool) -> Result<String, AuthError> {
        let expires_at = OffsetDateTime::now_utc() + self.ttl;
        self.issue_with_expiry(username, admin, expires_at)
    }

    pub fn issue_with_expiry(
        &self,
        username: &str,
        admin: bool,
        expires_at: OffsetDateTime,
    ) -> Result<String, AuthError> {
        let claims = Claims {
            usr: username.to_string(),
            exp: expires_at.unix_timestamp(),
        };
        let keys = if admin { &self.admin } else { &self.user };
        encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding)
            .map_err(|err| AuthError::Signing(err.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<Principal, AuthError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::Missing);
        }

        match self.decode_with(token, &self.user) {
            Ok(claims) => Ok(Principal {
                username: claims.usr,
                is_admin: false,
            }),
            Err(DecodeOutcome::WrongKey) => match self.decode_with(token, &self.admin) {
                Ok(claims) => Ok(Principal {
                    username: claims.usr,
                    is_admin: true,
                }),
                Err(DecodeOutcome::Expired) => Err(AuthError::Expired),
                Err(_) => Err(AuthError::Invalid),
            },
            Err(DecodeOutcome::Expired) => Err(AuthError::Expired),
            Err(DecodeOutcome::Malformed) => Err(AuthError::Invalid),
        }
    }

    fn decode_with(&self, token: &str, keys: &Keys) -> Result<Claims, DecodeOutcome> {
        decode::<Claims>(token, &keys.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|err| match err.kind() {
                ErrorKind::InvalidSignature => DecodeOutcome::WrongKey,
                ErrorKind::ExpiredSignature => DecodeOutcome::Expired,
                _ => DecodeOutcome::Malformed,
            })
    }
}

enum DecodeOutcome {
    WrongKey,
    Expired,
    Malformed,
}

/// Extract the raw token from an `Authorization`-style header value.
/// Both `Bearer <token>` and a bare token are accepted.
pub fn strip_bearer(value: &str) -> &str {
    let value = value.trim();
    if value.eq_ignore_ascii_case("bearer") {
        return "";
    }
    match value.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") => token.trim(),
        _ => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verifier() -> TokenVerifier {
        TokenVerifier::new("user-secret", "admin-secret", Duration::from_secs(3600))
    }

    #[test]
    fn user_token_is_not_admin() {
        let verifier = verifier();
        let token = verifier.issue("alice", false).expect("issue");
        let principal = verifier.verify(&token).expect("verify");
        assert_eq!(
            principal,
            Principal {
                username: "alice".to_string(),
                is_admin: false,
            }
        );
    }

    #[test]
    fn admin_token_is_admin() {
        let verifier = verifier();
        let token = verifier.issue("root", true).expect("issue");
        assert!(verifier.verify(&token).expect("verify").is_admin);
    }

    #[test]
    fn foreign_secret_is_rejected() {
        let other = TokenVerifier::new("x", "y", Duration::from_secs(60));
        let token = other.issue("mallory", true).expect("issue");
        assert!(matches!(verifier().verify(&token), Err(AuthError::Invalid)));
    }

    #[test]
    fn expired_token_is_reported() {
        let verifier = verifier();
        let past = OffsetDateTime::now_utc() - time::Duration::hours(1);
        let token = verifier
            .issue_with_expiry("alice", false, past)
            .expect("issue");
        assert!(matches!(verifier.verify(&token), Err(AuthError::Expired)));

        let token = verifier
            .issue_with_expiry("root", true, past)
            .expect("issue");
        assert!(matches!(verifier.verify(&token), Err(AuthError::Expired)));
    }

    #[test]
    fn garbage_and_empty_tokens() {
        let verifier = verifier();
        assert!(matches!(verifier.verify("   "), Err(AuthError::Missing)));
        assert!(matches!(
            verifier.verify("not-a-jwt"),
            Err(AuthError::Invalid)
        ));
    }

    #[test]
    fn bearer_prefix_is_optional() {
        assert_eq!(strip_bearer("Bearer abc"), "abc");
        assert_eq!(strip_bearer("  abc "), "abc");
        assert_eq!(strip_bearer("Bearer "), "");
    }
}
