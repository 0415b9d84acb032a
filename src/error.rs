//! # Validation Errors
//!
//! Every expected validation failure collapses to the single externally
//! visible kind [`Error::InvalidToken`], carrying a free-text description
//! for diagnostics. The engine deliberately does not distinguish "wrong
//! signature" from "expired" from "malformed" at the type level, to avoid
//! handing an attacker a signature oracle via differentiated errors; the
//! finer-grained causes are emitted on the `tracing` debug channel only.
//!
//! Construction-time misuse (for example requesting private material from a
//! key that has none) is a programming error, not a validation outcome, and
//! panics rather than producing a recoverable result.

use thiserror::Error;

/// Token validation error.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// The token failed validation. The description says why, in terms
    /// suitable for server-side diagnostics, not for returning verbatim to
    /// an untrusted client.
    #[error(r#"{{"error": "invalid_token", "error_description": "{0}"}}"#)]
    InvalidToken(String),
}

impl Error {
    /// The human-readable failure description.
    #[must_use]
    pub fn description(&self) -> &str {
        match self {
            Self::InvalidToken(description) => description,
        }
    }
}
