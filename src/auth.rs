use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, decode_header, encode,
    errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{error::AppError, repository::RepositoryState};

/// Lifetime of every issued session token.
pub const TOKEN_TTL_HOURS: i64 = 2;

/// RegisteredClaims
///
/// The standard JWT time claims, in seconds since the Unix epoch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegisteredClaims {
    pub iat: i64,
    pub exp: i64,
}

/// Claims
///
/// Session token payload. The identity field sits next to the registered
/// claims on the wire: `{"user_id": 1, "iat": .., "exp": ..}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    pub user_id: i64,
    #[serde(flatten)]
    pub registered: RegisteredClaims,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,
    #[error("token has expired")]
    Expired,
    #[error("token signature or claims are invalid")]
    Invalid,
    #[error("token could not be signed")]
    Signing,
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// TokenService
///
/// Issues and verifies HS256 session tokens with a single shared secret.
/// Cheap to clone; the keys live behind an `Arc`.
#[derive(Clone)]
pub struct TokenService {
    keys: Arc<Keys>,
    ttl: Duration,
}

struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenService {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            keys: Arc::new(Keys {
                encoding: EncodingKey::from_secret(secret.as_bytes()),
                decoding: DecodingKey::from_secret(secret.as_bytes()),
            }),
            ttl,
        }
    }

    /// A service using the standard session lifetime.
    pub fn with_default_ttl(secret: &str) -> Self {
        Self::new(secret, Duration::hours(TOKEN_TTL_HOURS))
    }

    pub fn issue(&self, user_id: i64) -> Result<IssuedToken, TokenError> {
        self.issue_at(user_id, Utc::now())
    }

    pub fn issue_at(&self, user_id: i64, now: DateTime<Utc>) -> Result<IssuedToken, TokenError> {
        let expires_at = now + self.ttl;
        let claims = Claims {
            user_id,
            registered: RegisteredClaims {
                iat: now.timestamp(),
                exp: expires_at.timestamp(),
            },
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.keys.encoding).map_err(|e| {
            tracing::error!("failed to sign token: {:?}", e);
            TokenError::Signing
        })?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Returns the user id carried by a valid, unexpired token.
    pub fn verify(&self, token: &str) -> Result<i64, TokenError> {
        self.verify_at(token, Utc::now())
    }

    /// verify_at
    ///
    /// Checks run in order: header shape and algorithm, signature and payload,
    /// then expiry against `now`. Expiry is checked here rather than by the
    /// library so tests can pin the clock.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<i64, TokenError> {
        let header = decode_header(token).map_err(|_| TokenError::Malformed)?;
        if header.alg != Algorithm::HS256 {
            return Err(TokenError::Malformed);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;

        let data = decode::<Claims>(token, &self.keys.decoding, &validation).map_err(|e| match e.kind() {
            ErrorKind::InvalidToken | ErrorKind::Base64(_) | ErrorKind::Utf8(_) => TokenError::Malformed,
            _ => TokenError::Invalid,
        })?;

        let expires_at = Utc
            .timestamp_opt(data.claims.registered.exp, 0)
            .single()
            .ok_or(TokenError::Invalid)?;
        if now >= expires_at {
            return Err(TokenError::Expired);
        }

        Ok(data.claims.user_id)
    }
}

/// AuthUser
///
/// The resolved identity of an authenticated request. Inserted into the
/// request extensions by `auth_middleware`.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: i64,
    pub roles_id: i64,
}

/// AuthUser Extractor Implementation
///
/// 1. Reads `Authorization: Bearer <token>`.
/// 2. Verifies the token through the `TokenService`.
/// 3. Loads the user so deleted or deactivated accounts lose access immediately.
///
/// Rejection: `AppError::Unauthorized` (401) on any failure.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    TokenService: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // Already resolved further up the stack.
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AppError::unauthorized("Unauthorized Access"))?;

        let tokens = TokenService::from_ref(state);
        let user_id = tokens.verify(token).map_err(|e| {
            tracing::debug!("token rejected: {}", e);
            AppError::unauthorized("Token Invalid or Expired")
        })?;

        let repo = RepositoryState::from_ref(state);
        let user = repo
            .get_user(user_id)
            .await?
            .filter(|user| user.is_active)
            .ok_or_else(|| {
                tracing::debug!(user_id, "token subject is missing or inactive");
                AppError::unauthorized("Token Invalid or Expired")
            })?;

        Ok(AuthUser {
            id: user.id,
            roles_id: user.roles_id,
        })
    }
}
