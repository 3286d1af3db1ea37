use std::collections::BTreeMap;

use reqwest::header::{HeaderName, HeaderValue};
use serde::Deserialize;

use super::pattern::Pattern;
use crate::actions::{PostCleanAction, PostParseAction, PrePrimaryAction, deserialize_actions};
use crate::{ExtractionError, Result};

/// Source of a per-rule request header value.
///
/// A plain string is sent as-is; `{"env": "VAR"}` is looked up through the
/// extractor's [`CredentialSource`](crate::CredentialSource) at request time.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum HeaderValueSource {
    Literal(String),
    Env { env: String },
}

/// Regex substitution applied to every rendered text block.
#[derive(Debug, Clone, Deserialize)]
pub struct TextReplacement {
    pub pattern: Pattern,
    #[serde(default)]
    pub to: String,
}

/// One site rule from the rule file.
///
/// Unknown fields are ignored and every field has a default, so
/// `{"domains": ["example.com"]}` is a complete rule.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Rule {
    pub name: String,
    pub domains: Vec<String>,
    pub primary_container_ids: Vec<String>,
    pub primary_patterns: Vec<Pattern>,
    pub drop_exact: Vec<String>,
    pub drop_patterns: Vec<Pattern>,
    pub stop_patterns: Vec<Pattern>,
    pub image_drop_keywords: Vec<String>,
    pub max_images: usize,
    pub request_headers: BTreeMap<String, HeaderValueSource>,
    pub cookie_env_var: Option<String>,
    pub paywall_prone: bool,
    pub paywall_markers: Vec<String>,
    pub preferred_encoding: Option<String>,
    #[serde(deserialize_with = "deserialize_actions")]
    pub pre_primary_actions: Vec<PrePrimaryAction>,
    #[serde(deserialize_with = "deserialize_actions")]
    pub post_clean_actions: Vec<PostCleanAction>,
    #[serde(deserialize_with = "deserialize_actions")]
    pub post_parse_actions: Vec<PostParseAction>,
    pub text_replacements: Vec<TextReplacement>,
    pub min_blocks: usize,
    pub min_blocks_error: Option<String>,
}

impl Default for Rule {
    fn default() -> Self {
        Self {
            name: String::new(),
            domains: Vec::new(),
            primary_container_ids: Vec::new(),
            primary_patterns: Vec::new(),
            drop_exact: Vec::new(),
            drop_patterns: Vec::new(),
            stop_patterns: Vec::new(),
            image_drop_keywords: Vec::new(),
            max_images: 4,
            request_headers: BTreeMap::new(),
            cookie_env_var: None,
            paywall_prone: false,
            paywall_markers: Vec::new(),
            preferred_encoding: None,
            pre_primary_actions: Vec::new(),
            post_clean_actions: Vec::new(),
            post_parse_actions: Vec::new(),
            text_replacements: Vec::new(),
            min_blocks: 0,
            min_blocks_error: None,
        }
    }
}

impl Rule {
    /// Parses one rule entry, filling in the positional name and normalizing
    /// the case-insensitive string lists.
    pub(crate) fn from_value(value: serde_json::Value, index: usize) -> Result<Self> {
        let label = value
            .get("name")
            .and_then(|n| n.as_str())
            .map(|n| format!("rule #{} (`{}`)", index, n))
            .unwrap_or_else(|| format!("rule #{}", index));

        let mut rule: Rule =
            serde_json::from_value(value).map_err(|e| ExtractionError::Config(format!("{}: {}", label, e)))?;

        if rule.name.trim().is_empty() {
            rule.name = format!("rule-{}", index);
        }
        rule.normalize();
        rule.validate().map_err(|e| ExtractionError::Config(format!("{}: {}", label, e)))?;
        Ok(rule)
    }

    fn normalize(&mut self) {
        self.domains = self
            .domains
            .iter()
            .map(|d| d.trim().trim_start_matches('.').to_lowercase())
            .filter(|d| !d.is_empty())
            .collect();
        self.image_drop_keywords = lowercase_non_empty(&self.image_drop_keywords);
        self.paywall_markers = lowercase_non_empty(&self.paywall_markers);
        self.primary_container_ids.retain(|id| !id.trim().is_empty());
        self.drop_exact.retain(|s| !s.is_empty());
    }

    fn validate(&self) -> std::result::Result<(), String> {
        for (name, source) in &self.request_headers {
            HeaderName::from_bytes(name.as_bytes()).map_err(|_| format!("invalid header name `{}`", name))?;
            if let HeaderValueSource::Literal(value) = source {
                HeaderValue::from_str(value).map_err(|_| format!("invalid value for header `{}`", name))?;
            }
        }
        if let Some(label) = &self.preferred_encoding
            && encoding_rs::Encoding::for_label(label.as_bytes()).is_none()
        {
            return Err(format!("unknown preferred_encoding `{}`", label));
        }
        Ok(())
    }

    /// Whether this rule applies to `host` (exact or subdomain match).
    pub fn matches_host(&self, host: &str) -> bool {
        let host = host.trim_end_matches('.').to_lowercase();
        self.domains.iter().any(|domain| {
            host == *domain || (host.len() > domain.len() && host.ends_with(domain.as_str()) && {
                let boundary = host.len() - domain.len() - 1;
                host.as_bytes()[boundary] == b'.'
            })
        })
    }
}

fn lowercase_non_empty(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
        .collect()
}
