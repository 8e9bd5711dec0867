//! Credential verification and session tokens.
//!
//! Passwords are bcrypt-hashed before they ever reach the store, and login
//! compares the submitted secret against the stored hash (bcrypt's compare is
//! salt-aware and constant-time). An unknown email and a wrong password are
//! deliberately indistinguishable to the caller so identifiers cannot be
//! enumerated through the login form.

use crate::models::{SessionClaims, User};
use crate::storage::InvoiceStore;
use bcrypt::{hash, verify, DEFAULT_COST};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

const DEFAULT_SECRET: &[u8] = b"invoice-dash-dev-secret";
const SESSION_TTL_SECS: usize = 3600; // 1 hour

/// Why credential verification failed. `InvalidCredentials` covers shape
/// failures, unknown identifiers, and wrong secrets alike; `Unknown` is
/// reserved for systemic failures (store unreachable, hash backend error)
/// and is the only kind worth re-raising past the pipeline.
#[derive(Debug, Error)]
pub enum AuthFailure {
    #[error("Invalid credentials.")]
    InvalidCredentials,
    #[error("Something went wrong.")]
    Unknown(String),
}

fn session_secret() -> Vec<u8> {
    std::env::var("SESSION_SECRET")
        .map(String::into_bytes)
        .unwrap_or_else(|_| DEFAULT_SECRET.to_vec())
}

pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    hash(password, DEFAULT_COST)
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, bcrypt::BcryptError> {
    verify(password, hash)
}

pub fn create_session_token(email: &str) -> Result<String, jsonwebtoken::errors::Error> {
    let expiration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as usize)
        .unwrap_or(0)
        + SESSION_TTL_SECS;

    let claims = SessionClaims {
        sub: email.to_owned(),
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(&session_secret()),
    )
}

pub fn validate_session_token(token: &str) -> Result<SessionClaims, jsonwebtoken::errors::Error> {
    let token_data = decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(&session_secret()),
        &Validation::new(Algorithm::HS256),
    )?;
    Ok(token_data.claims)
}

/// Minimal credential shape: an email-like identifier and a secret of at
/// least six characters. A malformed submission is a verification failure,
/// not a crash, and skips the store lookup entirely.
fn credentials_well_formed(email: &str, password: &str) -> bool {
    let email_ok = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.'),
        None => false,
    };
    email_ok && password.len() >= 6
}

/// Verify submitted credentials against the store.
pub async fn verify_credentials(
    store: &dyn InvoiceStore,
    email: &str,
    password: &str,
) -> Result<User, AuthFailure> {
    if !credentials_well_formed(email, password) {
        return Err(AuthFailure::InvalidCredentials);
    }

    let user = store
        .get_user_by_email(email)
        .await
        .map_err(|e| AuthFailure::Unknown(e.to_string()))?
        .ok_or(AuthFailure::InvalidCredentials)?;

    let matches = verify_password(password, &user.password)
        .map_err(|e| AuthFailure::Unknown(e.to_string()))?;
    if !matches {
        return Err(AuthFailure::InvalidCredentials);
    }
    Ok(user)
}
