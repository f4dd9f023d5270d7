use std::sync::Arc;

use anyhow::{Context, Result};
use argon2::{password_hash::SaltString, Argon2, PasswordHash, PasswordVerifier};
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{config::AppConfig, errors::RequestError};

const TOKEN_LIFETIME: time::Duration = time::Duration::days(90);
const TOKEN_SCHEME: &str = "Token ";
const INVALID_TOKEN: &str = "Invalid token.";

#[derive(Debug, Serialize, Deserialize)]
struct TokenClaims {
    user_id: i64,
    exp: i64,
}

/// An authenticated account.
#[derive(Debug)]
pub struct AuthUser {
    pub id: i64,
}

/// The caller behind an optional `Authorization: Token <jwt>` header.
/// A missing header is an anonymous visitor; a present but bad one is rejected.
pub struct MaybeUser(pub Option<AuthUser>);

impl MaybeUser {
    pub fn get_id(&self) -> Option<i64> {
        self.0.as_ref().map(|user| user.id)
    }

    pub fn require(self) -> Result<AuthUser, RequestError> {
        self.0.ok_or(RequestError::NotAuthorized(
            "Authentication credentials were not provided.",
        ))
    }
}

fn bearer_token(parts: &Parts) -> Option<Result<&str, RequestError>> {
    let value = parts.headers.get(AUTHORIZATION)?;
    let token = value
        .to_str()
        .ok()
        .and_then(|value| value.strip_prefix(TOKEN_SCHEME))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| {
            tracing::debug!("malformed authorization header");
            RequestError::NotAuthorized(INVALID_TOKEN)
        });
    Some(token)
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync + 'static,
{
    type Rejection = RequestError;

    async fn from_request_parts(
        parts: &mut Parts,
        _: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        let token = match bearer_token(parts) {
            Some(token) => token?,
            None => return Ok(MaybeUser(None)),
        };
        let config = parts
            .extensions
            .get::<Arc<AppConfig>>()
            .ok_or(RequestError::ServerError)?;
        let id = verify_jwt_token(token, &config.jwt_secret)?;
        Ok(MaybeUser(Some(AuthUser { id })))
    }
}

pub fn get_jwt_token(user_id: i64, jwt_secret: &str) -> Result<String> {
    let claims = TokenClaims {
        user_id,
        exp: (OffsetDateTime::now_utc() + TOKEN_LIFETIME).unix_timestamp(),
    };
    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )
    .context("Failed to sign token")
}

pub fn verify_jwt_token(token: &str, jwt_secret: &str) -> Result<i64, RequestError> {
    let claims = jsonwebtoken::decode::<TokenClaims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        tracing::debug!(error = %e, "rejected token");
        RequestError::NotAuthorized(INVALID_TOKEN)
    })?
    .claims;
    if claims.exp < OffsetDateTime::now_utc().unix_timestamp() {
        return Err(RequestError::NotAuthorized("Token expired."));
    }
    Ok(claims.user_id)
}

pub async fn verify_password_argon2(password: String, hash: &str) -> Result<bool> {
    let hash = hash.to_owned();
    tokio::task::spawn_blocking(move || {
        let hash = PasswordHash::new(hash.as_str())
            .map_err(|_| anyhow::anyhow!("Stored password hash is malformed"))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &hash)
            .is_ok())
    })
    .await
    .context("Failed to verify password")?
}

pub async fn hash_password_argon2(password: String) -> Result<String> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(rand::thread_rng());
        let hash = PasswordHash::generate(Argon2::default(), password, salt.as_salt())
            .map_err(|_| anyhow::anyhow!("Failed to hash password"))?;
        Ok(hash.to_string())
    })
    .await
    .context("Failed to hash password")?
}
