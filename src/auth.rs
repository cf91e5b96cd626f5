//! Password hashes and bearer tokens for the backend.
//!
//! Passwords are stored as Argon2id PHC strings. Tokens are random 256-bit
//! hex strings recorded in [`AppData::tokens`] with an expiry.

use crate::errors::AppError;
use crate::models::{AppData, TokenClaims, TokenRecord};
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode};
use chrono::{DateTime, Duration, Utc};
use rand::{rngs::OsRng, RngCore};

const TOKEN_LEN: usize = 32;

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut argon2::password_hash::rand_core::OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| AppError::new(StatusCode::INTERNAL_SERVER_ERROR, format!("Password hashing failed: {err}")))
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    PasswordHash::new(stored).is_ok_and(|hash| {
        Argon2::default()
            .verify_password(password.as_bytes(), &hash)
            .is_ok()
    })
}

/// Records a fresh token for the user and drops any that have expired.
pub fn issue_token(
    data: &mut AppData,
    user_id: &str,
    email: &str,
    ttl: Duration,
    now: DateTime<Utc>,
) -> String {
    data.tokens.retain(|_, record| record.expires_at > now);

    let mut bytes = [0u8; TOKEN_LEN];
    OsRng.fill_bytes(&mut bytes);
    let token = hex::encode(bytes);
    data.tokens.insert(
        token.clone(),
        TokenRecord {
            user_id: user_id.to_string(),
            email: email.to_string(),
            issued_at: now,
            expires_at: now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
        },
    );
    token
}

pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::unauthorized("No token provided"))
}

/// Claims of a known, unexpired token. Does not check that the user still exists.
pub fn token_claims(data: &AppData, token: &str, now: DateTime<Utc>) -> Result<TokenClaims, AppError> {
    let record = data
        .tokens
        .get(token)
        .filter(|record| record.expires_at > now)
        .ok_or_else(|| AppError::unauthorized("Invalid token"))?;

    Ok(TokenClaims {
        user_id: record.user_id.clone(),
        email: record.email.clone(),
    })
}

/// Like [`token_claims`], but also rejects tokens whose user is gone.
pub fn authenticate(data: &AppData, token: &str, now: DateTime<Utc>) -> Result<TokenClaims, AppError> {
    let claims = token_claims(data, token, now)?;
    if !data.users.contains_key(&claims.user_id) {
        return Err(AppError::unauthorized("User not found"));
    }
    Ok(claims)
}
