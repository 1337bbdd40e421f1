//! Bearer token handling.
//!
//! Tokens are verified elsewhere; the server only needs a [`TokenValidator`]
//! that turns a token into a claims principal.

use std::collections::HashMap;

use ambit_core::ClaimsPrincipal;
use async_trait::async_trait;
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token is not recognised")]
    Unknown,
    #[error("token rejected: {0}")]
    Rejected(String),
}

/// Maps a bearer token to the principal it authenticates.
#[async_trait]
pub trait TokenValidator: Send + Sync {
    async fn validate(&self, token: &str) -> Result<ClaimsPrincipal, TokenError>;
}

/// Validator backed by a fixed token table.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenValidator {
    tokens: HashMap<String, ClaimsPrincipal>,
}

impl StaticTokenValidator {
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>, principal: ClaimsPrincipal) -> Self {
        self.tokens.insert(token.into(), principal);
        self
    }
}

#[async_trait]
impl TokenValidator for StaticTokenValidator {
    async fn validate(&self, token: &str) -> Result<ClaimsPrincipal, TokenError> {
        self.tokens.get(token).cloned().ok_or(TokenError::Unknown)
    }
}

/// Reads the bearer token straight from the `Authorization` header.
///
/// Going through the header (rather than an auth extractor) keeps token
/// access free of any claims resolution, which itself may need the token.
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then(|| token.to_string())
}
