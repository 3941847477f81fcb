//! Access tokens.
//!
//! Access tokens are compact JWTs signed with a single shared secret (HMAC). The claim set carries only the user id,
//! the issue time and the expiry time. Tokens are never stored on the server and cannot be revoked; they simply stop
//! verifying once they expire or the secret changes.
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use log::*;
use marketplace_engine::{AppError, UserId};
use mp_common::Secret;
use serde::{Deserialize, Serialize};

use crate::config::AuthConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    pub user_id: UserId,
    pub iat: i64,
    pub exp: i64,
}

/// Only the symmetric (HMAC) family is accepted. A token whose header names any other algorithm is rejected before
/// its signature is looked at.
const ACCEPTED_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

/// Signs a new token for `user_id` that expires `ttl` from now.
pub fn issue_token(user_id: UserId, secret: &Secret<String>, ttl: Duration) -> Result<String, AppError> {
    let now = Utc::now();
    let claims = JwtClaims { user_id, iat: now.timestamp(), exp: (now + ttl).timestamp() };
    let key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::new(Algorithm::HS256), &claims, &key)
        .map_err(|e| AppError::internal(format!("Could not sign access token. {e}")))
}

/// Checks the token's algorithm, signature and expiry, and returns the user id it was issued to. Every failure,
/// whatever its cause, is reported as [`AppError::InvalidToken`].
pub fn verify_token(token: &str, secret: &Secret<String>) -> Result<UserId, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.algorithms = ACCEPTED_ALGORITHMS.to_vec();
    validation.leeway = 0;
    validation.validate_exp = true;
    validation.set_required_spec_claims(&["exp"]);
    let key = DecodingKey::from_secret(secret.as_bytes());
    let data = decode::<JwtClaims>(token, &key, &validation).map_err(|e| {
        debug!("🔐️ Access token rejected. {e}");
        AppError::InvalidToken
    })?;
    Ok(data.claims.user_id)
}

/// Issues and verifies access tokens with the configured secret and lifetime.
#[derive(Clone, Debug)]
pub struct TokenService {
    secret: Secret<String>,
    ttl: Duration,
}

impl TokenService {
    pub fn new(config: &AuthConfig) -> Self {
        Self { secret: config.jwt_secret.clone(), ttl: config.token_ttl }
    }

    pub fn issue(&self, user_id: UserId) -> Result<String, AppError> {
        issue_token(user_id, &self.secret, self.ttl)
    }

    pub fn verify(&self, token: &str) -> Result<UserId, AppError> {
        verify_token(token, &self.secret)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}
