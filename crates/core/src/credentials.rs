//! Secrets and cookies injected into requests.
//!
//! Rules never hold secret values themselves: they name an environment
//! variable (`cookie_env_var`, `{"env": ...}` header values) that is looked
//! up through a [`CredentialSource`] at request time. Site cookies can also
//! come from a shared JSON [`CookieStore`].

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{ExtractionError, Result};

/// Environment variable naming the cookie file.
pub const COOKIES_ENV_VAR: &str = "SNIPNOTE_COOKIES";

/// Looks up named secrets.
pub trait CredentialSource: Send + Sync + fmt::Debug {
    /// Value for `name`, or `None` when unset or blank.
    fn lookup(&self, name: &str) -> Option<String>;
}

/// Reads secrets from process environment variables.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvCredentials;

impl CredentialSource for EnvCredentials {
    fn lookup(&self, name: &str) -> Option<String> {
        std::env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
    }
}

/// Fixed in-memory secrets, mostly for tests and embedding.
#[derive(Debug, Default, Clone)]
pub struct StaticCredentials {
    values: HashMap<String, String>,
}

impl StaticCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }
}

impl CredentialSource for StaticCredentials {
    fn lookup(&self, name: &str) -> Option<String> {
        self.values.get(name).filter(|v| !v.trim().is_empty()).cloned()
    }
}

/// Per-domain cookies loaded from `{"domain": {"name": "value"}}`.
#[derive(Debug, Clone, Default)]
pub struct CookieStore {
    domains: BTreeMap<String, BTreeMap<String, String>>,
}

impl CookieStore {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: BTreeMap<String, BTreeMap<String, String>> = serde_json::from_str(json)
            .map_err(|e| ExtractionError::Config(format!("invalid cookie file: {}", e)))?;
        let domains = raw
            .into_iter()
            .map(|(domain, cookies)| (domain.trim().trim_start_matches('.').to_lowercase(), cookies))
            .filter(|(domain, cookies)| !domain.is_empty() && !cookies.is_empty())
            .collect();
        Ok(Self { domains })
    }

    /// Loads a cookie file; a missing file yields an empty store.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "cookie file not found, continuing without cookies");
            return Ok(Self::default());
        }
        let json = fs::read_to_string(path)
            .map_err(|e| ExtractionError::Config(format!("cannot read cookie file {}: {}", path.display(), e)))?;
        Self::from_json_str(&json)
    }

    /// Loads `$SNIPNOTE_COOKIES`, else `<config dir>/snipnote/cookies.json`.
    pub fn load_default() -> Result<Self> {
        match std::env::var(COOKIES_ENV_VAR) {
            Ok(path) if !path.trim().is_empty() => Self::from_path(path.trim()),
            _ => match default_cookies_path() {
                Some(path) => Self::from_path(path),
                None => Ok(Self::default()),
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    /// `Cookie` header value for `host`, using the most specific matching
    /// domain entry.
    pub fn cookie_header(&self, host: &str) -> Option<String> {
        let host = host.to_lowercase();
        self.domains
            .iter()
            .filter(|(domain, _)| host == **domain || host.ends_with(&format!(".{}", domain)))
            .max_by_key(|(domain, _)| domain.len())
            .map(|(_, cookies)| {
                cookies.iter().map(|(name, value)| format!("{}={}", name, value)).collect::<Vec<_>>().join("; ")
            })
    }
}

/// `<config dir>/snipnote/cookies.json`
pub fn default_cookies_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("snipnote").join("cookies.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_credentials() {
        let creds = StaticCredentials::new().with("TOKEN", "abc").with("BLANK", "  ");
        assert_eq!(creds.lookup("TOKEN").as_deref(), Some("abc"));
        assert_eq!(creds.lookup("BLANK"), None);
        assert_eq!(creds.lookup("MISSING"), None);
    }

    #[test]
    fn test_env_credentials_missing_var() {
        assert_eq!(EnvCredentials.lookup("SNIPNOTE_TEST_SURELY_UNSET_VAR"), None);
    }

    #[test]
    fn test_cookie_header_most_specific_domain() {
        let store = CookieStore::from_json_str(
            r#"{"example.com": {"a": "1"}, "news.example.com": {"b": "2", "c": "3"}, "other.org": {}}"#,
        )
        .unwrap();
        assert_eq!(store.cookie_header("www.news.example.com").as_deref(), Some("b=2; c=3"));
        assert_eq!(store.cookie_header("example.com").as_deref(), Some("a=1"));
        assert_eq!(store.cookie_header("notexample.com"), None);
        assert_eq!(store.cookie_header("other.org"), None);
    }

    #[test]
    fn test_missing_file_is_empty_store() {
        let store = CookieStore::from_path("/no/such/cookies.json").unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let err = CookieStore::from_json_str(r#"{"a.com": "not a map"}"#).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Config);
    }
}
