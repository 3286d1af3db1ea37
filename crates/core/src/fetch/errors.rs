use std::fmt;

use reqwest::StatusCode;
use thiserror::Error;

/// What happened on one delivery attempt that did not produce a usable page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Blocking or server-side status (401/403/429/5xx).
    Status(StatusCode),
    Timeout,
    Network(String),
    /// The body contained this paywall marker.
    PaywallMarker(String),
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptOutcome::Status(status) => write!(f, "HTTP {}", status.as_u16()),
            AttemptOutcome::Timeout => f.write_str("timeout"),
            AttemptOutcome::Network(detail) => write!(f, "network error ({})", detail),
            AttemptOutcome::PaywallMarker(marker) => write!(f, "paywall marker `{}`", marker),
        }
    }
}

/// One failed attempt, kept for the final error report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord {
    /// Header profile used for the attempt.
    pub profile: &'static str,
    pub outcome: AttemptOutcome,
}

impl fmt::Display for AttemptRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.profile, self.outcome)
    }
}

fn summarize(attempts: &[AttemptRecord]) -> String {
    attempts.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("http error {status}")]
    Http { status: StatusCode },

    #[error("unsupported content-type: {0}")]
    UnsupportedContentType(String),

    #[error("body too large ({0} bytes)")]
    BodyTooLarge(u64),

    #[error("invalid request header: {0}")]
    InvalidHeader(String),

    #[error("io error: {0}")]
    Io(String),

    #[error("http client error: {0}")]
    Client(String),

    #[error("all {} header profiles failed ({})", .attempts.len(), summarize(.attempts))]
    Exhausted { attempts: Vec<AttemptRecord> },

    #[error("paywall detected (marker `{marker}`)")]
    Paywalled { marker: String, attempts: Vec<AttemptRecord> },

    #[error("archive snapshot {url} unusable: {reason}")]
    PaywallFallbackFailed { url: String, reason: String },
}

impl FetchError {
    /// Records made before the fetcher gave up, if any.
    pub fn attempts(&self) -> &[AttemptRecord] {
        match self {
            FetchError::Exhausted { attempts } | FetchError::Paywalled { attempts, .. } => attempts,
            _ => &[],
        }
    }
}

/// Whether a status means "try the next header profile" rather than a hard
/// failure.
pub fn is_retryable_status(status: StatusCode) -> bool {
    matches!(status.as_u16(), 401 | 403 | 429) || status.is_server_error()
}

/// Classifies a transport error as a retryable attempt outcome.
pub fn outcome_from_reqwest(err: &reqwest::Error) -> AttemptOutcome {
    if err.is_timeout() {
        AttemptOutcome::Timeout
    } else if let Some(status) = err.status() {
        AttemptOutcome::Status(status)
    } else {
        AttemptOutcome::Network(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_statuses() {
        for code in [401, 403, 429, 500, 502, 503] {
            assert!(is_retryable_status(StatusCode::from_u16(code).unwrap()), "{}", code);
        }
        for code in [400, 404, 410, 451] {
            assert!(!is_retryable_status(StatusCode::from_u16(code).unwrap()), "{}", code);
        }
    }

    #[test]
    fn test_exhausted_lists_attempts() {
        let err = FetchError::Exhausted {
            attempts: vec![
                AttemptRecord { profile: "desktop", outcome: AttemptOutcome::Status(StatusCode::FORBIDDEN) },
                AttemptRecord { profile: "mobile", outcome: AttemptOutcome::Timeout },
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("all 2 header profiles failed"));
        assert!(msg.contains("desktop: HTTP 403"));
        assert!(msg.contains("mobile: timeout"));
        assert_eq!(err.attempts().len(), 2);
    }
}
