//! JWT access token validation

use std::fmt;

use anyhow::{Result, anyhow};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::core::constants::DEFAULT_TOKEN_TTL_HOURS;

/// JWT validation error
#[derive(Debug)]
pub enum JwtError {
    /// Token has expired
    Expired,
    /// Token signature is invalid
    InvalidSignature,
    /// Other validation error
    Invalid(String),
}

impl fmt::Display for JwtError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Expired => write!(f, "Access token has expired"),
            Self::InvalidSignature => write!(f, "Invalid access token signature"),
            Self::Invalid(msg) => write!(f, "Invalid access token: {}", msg),
        }
    }
}

impl std::error::Error for JwtError {}

/// Identity claims carried by an access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// User ID, a UUID
    pub sub: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    pub iat: i64,
    pub exp: i64,
}

impl TokenClaims {
    pub fn new(
        user_id: &str,
        email: Option<&str>,
        given_name: Option<&str>,
        family_name: Option<&str>,
    ) -> Self {
        let now = Utc::now();
        let exp = now + Duration::hours(DEFAULT_TOKEN_TTL_HOURS as i64);

        Self {
            sub: user_id.to_string(),
            email: email.map(str::to_string),
            given_name: given_name.map(str::to_string),
            family_name: family_name.map(str::to_string),
            iat: now.timestamp(),
            exp: exp.timestamp(),
        }
    }
}

/// Sign an access token. Production deployments validate tokens from an
/// external issuer; this exists for local development and tests.
pub fn create_access_token(signing_key: &[u8], claims: &TokenClaims) -> Result<String> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(signing_key),
    )
    .map_err(|e| anyhow!("Failed to create JWT: {}", e))
}

/// Validate and decode an access token
pub fn validate_access_token(token: &str, signing_key: &[u8]) -> Result<TokenClaims, JwtError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    let token_data =
        decode::<TokenClaims>(token, &DecodingKey::from_secret(signing_key), &validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
                jsonwebtoken::errors::ErrorKind::InvalidSignature => JwtError::InvalidSignature,
                _ => JwtError::Invalid(e.to_string()),
            })?;

    Ok(token_data.claims)
}
