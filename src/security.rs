//! Webhook Authentication
//!
//! Telegram echoes the `secret_token` passed to `setWebhook` back in the
//! `X-Telegram-Bot-Api-Secret-Token` header of every delivery. A request is
//! admitted only if that header matches the configured secret.
//!
//! ```text
//! Request -> header lookup (case-insensitive) -> constant-time compare -> admit / 403
//! ```

use http::HeaderMap;
use tracing::warn;

/// Header carrying the shared secret on webhook deliveries
pub const SECRET_TOKEN_HEADER: &str = "X-Telegram-Bot-Api-Secret-Token";

/// Result of checking a delivery's secret header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthResult {
    /// Header present and matching
    Authenticated,
    /// Header absent or not valid UTF-8
    MissingHeader,
    /// Header present but wrong
    InvalidToken,
}

impl AuthResult {
    /// Check if authentication was successful
    pub fn is_ok(&self) -> bool {
        matches!(self, AuthResult::Authenticated)
    }
}

/// Verifies the secret header against the configured token
#[derive(Clone)]
pub struct SecretTokenVerifier {
    secret: Vec<u8>,
}

impl SecretTokenVerifier {
    /// Create a verifier for `secret`
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into().into_bytes(),
        }
    }

    /// Verify a supplied token (constant-time for equal lengths)
    pub fn verify_token(&self, supplied: &str) -> bool {
        constant_time_compare(&self.secret, supplied.as_bytes())
    }

    /// Authenticate a request from its headers.
    ///
    /// `HeaderMap` lookups are case-insensitive, so any casing of the
    /// header name is accepted.
    pub fn authenticate(&self, headers: &HeaderMap) -> AuthResult {
        let supplied = match headers
            .get(SECRET_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
        {
            Some(s) => s,
            None => return AuthResult::MissingHeader,
        };

        if self.verify_token(supplied) {
            AuthResult::Authenticated
        } else {
            warn!("Webhook delivery with invalid secret token");
            AuthResult::InvalidToken
        }
    }
}

impl std::fmt::Debug for SecretTokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretTokenVerifier")
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Constant-time byte comparison to prevent timing attacks
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}
