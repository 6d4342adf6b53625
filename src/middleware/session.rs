//! Session authentication — HS256 bearer JWTs issued by the identity layer.
//!
//! Every protected handler takes a [`Session`] argument; the extractor reads
//! `Authorization: Bearer <jwt>`, verifies signature and expiry, and rejects
//! with 401 otherwise. The `sub` claim is the principal id that CSRF tokens
//! are scoped to.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Principal id.
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
    /// Expiration (Unix timestamp)
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
}

impl SessionClaims {
    /// Claims for `sub` valid for `ttl_secs` from now.
    pub fn new(sub: impl Into<String>, ttl_secs: i64) -> Self {
        let now = Utc::now().timestamp();
        Self {
            sub: sub.into(),
            email: None,
            name: None,
            roles: Vec::new(),
            permissions: Vec::new(),
            exp: now + ttl_secs,
            iat: Some(now),
        }
    }
}

/// Key pair for signing and verifying session JWTs.
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl SessionKeys {
    pub fn from_secret(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.required_spec_claims = ["exp", "sub"].iter().map(|s| s.to_string()).collect();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
        }
    }

    pub fn mint(&self, claims: &SessionClaims) -> anyhow::Result<String> {
        let jwt = jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding)?;
        Ok(jwt)
    }

    pub fn verify(&self, jwt: &str) -> Result<SessionClaims, jsonwebtoken::errors::Error> {
        jsonwebtoken::decode::<SessionClaims>(jwt, &self.decoding, &self.validation)
            .map(|data| data.claims)
    }
}

/// An authenticated caller.
#[derive(Debug, Clone)]
pub struct Session {
    pub claims: SessionClaims,
}

impl Session {
    pub fn principal_id(&self) -> &str {
        &self.claims.sub
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for Session {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let Some(jwt) = bearer_token(parts) else {
            tracing::debug!(path = %parts.uri.path(), "no bearer session");
            return Err(AppError::Unauthenticated);
        };

        match state.sessions.verify(jwt) {
            Ok(claims) if !claims.sub.is_empty() => Ok(Session { claims }),
            Ok(_) => {
                tracing::warn!("session token has an empty subject");
                Err(AppError::Unauthenticated)
            }
            Err(e) => {
                tracing::warn!(path = %parts.uri.path(), "session rejected: {}", e);
                Err(AppError::Unauthenticated)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mint_then_verify() {
        let keys = SessionKeys::from_secret(b"session-secret");
        let mut claims = SessionClaims::new("kp_42", 600);
        claims.roles = vec!["POC-Admin".into()];
        let jwt = keys.mint(&claims).unwrap();

        let verified = keys.verify(&jwt).unwrap();
        assert_eq!(verified.sub, "kp_42");
        assert_eq!(verified.roles, vec!["POC-Admin".to_string()]);
        assert!(verified.permissions.is_empty());
    }

    #[test]
    fn test_expired_session_rejected() {
        let keys = SessionKeys::from_secret(b"session-secret");
        let jwt = keys.mint(&SessionClaims::new("kp_42", -60)).unwrap();
        assert!(keys.verify(&jwt).is_err());
    }

    #[test]
    fn test_foreign_signature_rejected() {
        let ours = SessionKeys::from_secret(b"session-secret");
        let theirs = SessionKeys::from_secret(b"another-secret");
        let jwt = theirs.mint(&SessionClaims::new("kp_42", 600)).unwrap();
        assert!(ours.verify(&jwt).is_err());
    }

    #[test]
    fn test_bearer_token_parsing() {
        let req = axum::http::Request::builder()
            .header("authorization", "Bearer  abc.def.ghi ")
            .body(())
            .unwrap();
        let (parts, _) = req.into_parts();
        assert_eq!(bearer_token(&parts), Some("abc.def.ghi"));

        let req = axum::http::Request::builder()
            .header("authorization", "Basic dXNlcjpwYXNz")
            .body(())
            .unwrap();
        let (parts, _) = req.into_parts();
        assert_eq!(bearer_token(&parts), None);
    }
}
