/*!
 * Error types for the mclt application.
 *
 * This module contains custom error types for the different stages of a
 * translation run, using the thiserror crate for ergonomic error definitions.
 *
 * Only `ParseError` is fatal for a run. The entry-level errors
 * (`TokenLossError`, `TranslationError::Exhausted`) are collected into the
 * run manifest and the affected entry keeps its source value.
 */

use std::fmt;
use thiserror::Error;

use crate::shield::TokenKind;

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The attempt did not finish within the configured timeout
    #[error("Request timed out after {0} ms")]
    Timeout(u64),

    /// The provider answered, but with nothing usable
    #[error("Provider returned an empty translation")]
    EmptyResponse,
}

impl ProviderError {
    /// Whether another attempt against the same provider may succeed.
    ///
    /// Authentication problems and client errors other than 429 are
    /// permanent for the provider; everything else is worth a retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::AuthenticationError(_) => false,
            Self::ApiError { status_code, .. } => *status_code == 429 || *status_code >= 500,
            Self::RequestFailed(_)
            | Self::ParseError(_)
            | Self::ConnectionError(_)
            | Self::RateLimitExceeded(_)
            | Self::Timeout(_)
            | Self::EmptyResponse => true,
        }
    }

    /// Map an HTTP status and body to the matching provider error
    pub fn from_status(status_code: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status_code {
            401 | 403 => Self::AuthenticationError(message),
            429 => Self::RateLimitExceeded(message),
            _ => Self::ApiError { status_code, message },
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout(0)
        } else if error.is_connect() {
            Self::ConnectionError(error.to_string())
        } else if error.is_decode() {
            Self::ParseError(error.to_string())
        } else {
            Self::RequestFailed(error.to_string())
        }
    }
}

/// Unrecoverable structural corruption of the input document
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// No content line carries a recognizable key delimiter
    #[error("No recognizable `key: value` line found in {content_lines} content line(s)")]
    NoKeyDelimiter {
        /// Number of non-blank, non-comment lines inspected
        content_lines: usize,
    },

    /// The same key appears more than once, so entries cannot be matched
    #[error("Duplicate key '{key}' on lines {first_line} and {second_line}")]
    DuplicateKey {
        /// Full dotted key
        key: String,
        /// Line of the first occurrence (1-based)
        first_line: usize,
        /// Line of the repeated occurrence (1-based)
        second_line: usize,
    },
}

/// A protected token whose marker did not come back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LostToken {
    /// The marker text that was expected, e.g. `[#001]`
    pub marker: String,
    /// Kind of the token behind the marker
    pub kind: TokenKind,
    /// Original token text
    pub canonical: String,
}

impl fmt::Display for LostToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}' lost (marker {})", self.kind, self.canonical, self.marker)
    }
}

/// Shielded markers vanished from a translated value
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{} protected token(s) missing from the translation: {}", .lost.len(), join_lost(.lost))]
pub struct TokenLossError {
    /// Every missing token, in marker order
    pub lost: Vec<LostToken>,
}

fn join_lost(lost: &[LostToken]) -> String {
    lost.iter().map(|t| t.to_string()).collect::<Vec<_>>().join("; ")
}

/// Errors that can occur during translation of a single entry
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TranslationError {
    /// Every configured provider failed for this entry
    #[error("All {providers} provider(s) failed after {attempts} attempt(s); last error: {last_error}")]
    Exhausted {
        /// Number of providers tried
        providers: usize,
        /// Total attempts over all providers
        attempts: u32,
        /// Last error observed
        last_error: String,
    },
}
