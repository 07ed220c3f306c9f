//! JWT Token Handler
//! Mission: Generate and validate access/refresh tokens securely

use crate::auth::models::{Claims, TokenPair};
use anyhow::{Context, Result};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

/// Token verification failure. Expired, tampered and malformed tokens all
/// collapse into this one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidToken;

impl std::fmt::Display for InvalidToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Invalid or expired token")
    }
}

impl std::error::Error for InvalidToken {}

/// JWT Handler for token operations
pub struct JwtHandler {
    access_secret: String,
    refresh_secret: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl JwtHandler {
    /// Create a handler with the default lifetimes (15 minutes / 7 days)
    pub fn new(access_secret: String, refresh_secret: String) -> Self {
        Self::with_ttls(
            access_secret,
            refresh_secret,
            Duration::from_secs(15 * 60),
            Duration::from_secs(7 * 24 * 3600),
        )
    }

    pub fn with_ttls(
        access_secret: String,
        refresh_secret: String,
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> Self {
        Self {
            access_secret,
            refresh_secret,
            access_ttl,
            refresh_ttl,
        }
    }

    /// Issue an access/refresh pair for a user id
    pub fn issue(&self, subject: Uuid) -> Result<TokenPair> {
        let access_token = sign(&self.access_secret, subject, self.access_ttl)?;
        let refresh_token = sign(&self.refresh_secret, subject, self.refresh_ttl)?;

        debug!(
            "Issued token pair for user {}, access expires in {}s",
            subject,
            self.access_ttl.as_secs()
        );

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Validate an access token and return its subject
    pub fn verify(&self, token: &str) -> Result<Uuid, InvalidToken> {
        let mut validation = Validation::default();
        validation.leeway = 0;

        let decoded = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.access_secret.as_bytes()),
            &validation,
        )
        .map_err(|_| InvalidToken)?;

        Uuid::parse_str(&decoded.claims.sub).map_err(|_| InvalidToken)
    }
}

fn sign(secret: &str, subject: Uuid, ttl: Duration) -> Result<String> {
    let now = Utc::now().timestamp() as usize;
    let claims = Claims {
        sub: subject.to_string(),
        iat: now,
        exp: now + ttl.as_secs() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .context("Failed to generate JWT")
}
