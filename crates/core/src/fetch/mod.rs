//! HTTP retrieval with header profiles, retry, and paywall fallback.
//!
//! [`Fetcher::fetch`] walks the [`HEADER_PROFILES`] in order, sleeping a
//! jittered exponential backoff between attempts. Blocking statuses,
//! timeouts, network errors, and paywall markers move on to the next
//! profile; any other non-success status fails immediately. For rules marked
//! `paywall_prone` one extra attempt is made against an archive snapshot once
//! the live page is exhausted or paywalled.

mod backoff;
mod client;
mod decode;
mod errors;
mod profiles;

pub use backoff::backoff_delay;
pub use client::Fetcher;
pub use decode::{decode_body, detect_encoding};
pub use errors::{AttemptOutcome, AttemptRecord, FetchError, is_retryable_status};
pub use profiles::{DESKTOP, HEADER_PROFILES, HeaderProfile, MOBILE};

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use url::Url;

use crate::Result;

/// Snapshot service used for paywalled pages; `{url}` is the page URL.
pub const DEFAULT_ARCHIVE_TEMPLATE: &str = "https://archive.ph/newest/{url}";

/// HTTP client configuration for fetching web pages.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Per-attempt timeout in seconds.
    pub timeout: u64,
    /// Base delay for the backoff between header profiles.
    pub backoff_base: Duration,
    /// Archive snapshot URL template. `{url}` is replaced verbatim,
    /// `{url_encoded}` percent-encoded.
    pub archive_url_template: String,
    /// Replaces the desktop profile's User-Agent when set.
    pub user_agent: Option<String>,
    /// Largest body accepted, in bytes.
    pub max_body_bytes: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: 10,
            backoff_base: Duration::from_millis(400),
            archive_url_template: DEFAULT_ARCHIVE_TEMPLATE.to_string(),
            user_agent: None,
            max_body_bytes: 5 * 1024 * 1024,
        }
    }
}

/// A successfully retrieved and decoded page.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub body: String,
    /// URL after redirects; the archive URL when the snapshot was used.
    pub final_url: Url,
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// Encoding the body was decoded from.
    pub charset: &'static str,
    pub from_archive: bool,
    /// Failed attempts made before this one succeeded.
    pub attempts: Vec<AttemptRecord>,
}

/// Reads HTML content from a local file.
pub fn fetch_file(path: &str) -> Result<String> {
    let path_buf = PathBuf::from(path);
    let bytes = fs::read(&path_buf)
        .map_err(|e| FetchError::Io(format!("cannot read {}: {}", path_buf.display(), e)))?;
    Ok(decode_body(&bytes, None, None).0)
}

/// Reads HTML content from standard input.
pub fn fetch_stdin() -> Result<String> {
    use std::io::{self, Read};

    let mut buffer = Vec::new();
    io::stdin()
        .read_to_end(&mut buffer)
        .map_err(|e| FetchError::Io(format!("cannot read stdin: {}", e)))?;
    Ok(decode_body(&buffer, None, None).0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.timeout, 10);
        assert!(config.archive_url_template.contains("{url}"));
        assert!(config.user_agent.is_none());
    }

    #[test]
    fn test_fetch_file_not_found() {
        let err = fetch_file("/nonexistent/file.html").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/file.html"));
    }

    #[test]
    fn test_fetch_file_decodes_meta_charset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.html");
        fs::write(&path, b"<meta charset=\"windows-1252\"><p>na\xefve</p>").unwrap();
        let html = fetch_file(path.to_str().unwrap()).unwrap();
        assert!(html.contains("naïve"));
    }
}
