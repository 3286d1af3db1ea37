//! Error types for SnipNote extraction.
//!
//! [`ExtractionError`] is the single failure surface of the pipeline. Every
//! variant maps onto a stable [`ErrorKind`] tag so callers (and the CLI) can
//! branch on the failure class without matching on message text.
//!
//! # Example
//!
//! ```rust
//! use snipnote_core::{ErrorKind, ExtractionError};
//!
//! let err = ExtractionError::Validation("content too short".to_string());
//! assert_eq!(err.kind(), ErrorKind::Validation);
//! assert_eq!(err.kind().as_str(), "ValidationError");
//! ```

use std::fmt;

use thiserror::Error;

use crate::fetch::FetchError;

/// Stable classification of an [`ExtractionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Rule or cookie configuration could not be loaded.
    Config,
    /// Network failure, timeout, or every header profile was rejected.
    Fetch,
    /// The archive snapshot attempt for a paywalled page failed.
    PaywallFallbackFailed,
    /// No content locator matched the page.
    Selection,
    /// The extracted body did not pass the minimum-content gate.
    Validation,
}

impl ErrorKind {
    /// Tag used in logs and CLI output.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Config => "ConfigError",
            ErrorKind::Fetch => "FetchError",
            ErrorKind::PaywallFallbackFailed => "PaywallFallbackFailed",
            ErrorKind::Selection => "SelectionError",
            ErrorKind::Validation => "ValidationError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main error type for extraction operations.
///
/// No variant carries a partial result: an extraction either returns a
/// complete [`ExtractionResult`](crate::ExtractionResult) or one of these.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// Rule file, cookie file, or extractor configuration is invalid.
    ///
    /// Raised at load time, never while processing a page.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Retrieval failed after the fetcher's retry budget was spent.
    #[error("Fetch failed: {0}")]
    Fetch(FetchError),

    /// The page looked paywalled and the archive snapshot could not be used.
    #[error("Paywall fallback failed for {url}: {detail}")]
    PaywallFallbackFailed { url: String, detail: String },

    /// None of the rule's locators produced a non-empty container.
    #[error("No content container matched for rule `{rule}` at {url} ({attempted} locators tried)")]
    Selection { rule: String, url: String, attempted: usize },

    /// The rendered Markdown failed the minimum-content check.
    #[error("{0}")]
    Validation(String),
}

impl ExtractionError {
    /// Returns the stable kind tag for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExtractionError::Config(_) => ErrorKind::Config,
            ExtractionError::Fetch(_) => ErrorKind::Fetch,
            ExtractionError::PaywallFallbackFailed { .. } => ErrorKind::PaywallFallbackFailed,
            ExtractionError::Selection { .. } => ErrorKind::Selection,
            ExtractionError::Validation(_) => ErrorKind::Validation,
        }
    }
}

impl From<FetchError> for ExtractionError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::PaywallFallbackFailed { url, reason } => {
                ExtractionError::PaywallFallbackFailed { url, detail: reason }
            }
            other => ExtractionError::Fetch(other),
        }
    }
}

/// Result type alias for ExtractionError.
pub type Result<T> = std::result::Result<T, ExtractionError>;
