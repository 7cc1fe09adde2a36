//! Authentication manager

use rand::RngCore;

use super::jwt::{JwtError, TokenClaims, validate_access_token};

/// Holds the token signing key and validates bearer tokens
#[derive(Debug)]
pub struct AuthManager {
    signing_key: Vec<u8>,
}

impl AuthManager {
    /// Build from a configured secret; a missing secret gets a process-local
    /// random key, which invalidates tokens across restarts.
    pub fn new(secret: Option<&str>) -> Self {
        let signing_key = match secret {
            Some(secret) if !secret.trim().is_empty() => secret.trim().as_bytes().to_vec(),
            _ => {
                tracing::warn!(
                    "no JWT secret configured, generating an ephemeral signing key; \
                     tokens will not survive a restart"
                );
                let mut key = vec![0u8; 32];
                rand::thread_rng().fill_bytes(&mut key);
                key
            }
        };
        Self { signing_key }
    }

    pub fn validate(&self, token: &str) -> Result<TokenClaims, JwtError> {
        validate_access_token(token, &self.signing_key)
    }

    pub fn signing_key(&self) -> &[u8] {
        &self.signing_key
    }
}
