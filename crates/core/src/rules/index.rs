use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::{debug, info};
use url::Url;

use super::pattern::Pattern;
use super::rule::Rule;
use crate::{ExtractionError, Result};

/// Environment variable naming the rule file.
pub const RULES_ENV_VAR: &str = "SNIPNOTE_RULES";

const DEFAULT_RULE_NAME: &str = "default";

const DEFAULT_PRIMARY_PATTERNS: &[&str] = &[
    r"<article\b[^>]*>",
    r"<main\b[^>]*>",
    r#"<div\b[^>]*\b(?:id|class)\s*=\s*["'][^"']*\b(?:article|post|entry|content)\b[^"']*["'][^>]*>"#,
    r"<body\b[^>]*>",
];

static DEFAULT_RULE: LazyLock<Rule> = LazyLock::new(|| Rule {
    name: DEFAULT_RULE_NAME.to_string(),
    primary_patterns: DEFAULT_PRIMARY_PATTERNS.iter().map(|p| Pattern::new(p).unwrap()).collect(),
    ..Rule::default()
});

/// Ordered, immutable set of site rules plus the built-in default.
///
/// Built once at startup and shared behind an `Arc`; resolution never
/// mutates it.
#[derive(Debug, Clone)]
pub struct RuleIndex {
    rules: Vec<Rule>,
    default: Rule,
    blocked_scripts: Vec<Regex>,
}

impl Default for RuleIndex {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl RuleIndex {
    /// Creates an index from already-parsed rules.
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules, default: DEFAULT_RULE.clone(), blocked_scripts: Vec::new() }
    }

    /// Parses a rule document: either a JSON array of rules or an object
    /// with `rules` and `blocked_script_sources`.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let document: Value =
            serde_json::from_str(json).map_err(|e| ExtractionError::Config(format!("invalid rule file: {}", e)))?;

        let (entries, blocked) = match document {
            Value::Array(entries) => (entries, Vec::new()),
            Value::Object(mut map) => {
                let entries = match map.remove("rules") {
                    Some(Value::Array(entries)) => entries,
                    Some(_) => return Err(ExtractionError::Config("`rules` must be an array".to_string())),
                    None => Vec::new(),
                };
                let blocked = match map.remove("blocked_script_sources") {
                    Some(value) => serde_json::from_value::<Vec<String>>(value).map_err(|e| {
                        ExtractionError::Config(format!("`blocked_script_sources` must be a list of strings: {}", e))
                    })?,
                    None => Vec::new(),
                };
                (entries, blocked)
            }
            _ => {
                return Err(ExtractionError::Config(
                    "rule file must be a JSON array or an object with `rules`".to_string(),
                ));
            }
        };

        let rules = entries
            .into_iter()
            .enumerate()
            .map(|(index, entry)| Rule::from_value(entry, index))
            .collect::<Result<Vec<_>>>()?;

        let blocked_scripts = blocked
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(blocked_script_regex)
            .collect::<Result<Vec<_>>>()?;

        debug!(rules = rules.len(), blocked_scripts = blocked_scripts.len(), "loaded rule document");
        Ok(Self { rules, default: DEFAULT_RULE.clone(), blocked_scripts })
    }

    /// Loads rules from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .map_err(|e| ExtractionError::Config(format!("cannot read rule file {}: {}", path.display(), e)))?;
        Self::from_json_str(&json)
            .map_err(|e| ExtractionError::Config(format!("{}: {}", path.display(), strip_config_prefix(&e))))
    }

    /// Loads the rule file named by `$SNIPNOTE_RULES`, else the one in the
    /// user config directory, else an index holding only the default rule.
    pub fn load_default() -> Result<Self> {
        if let Ok(path) = std::env::var(RULES_ENV_VAR)
            && !path.trim().is_empty()
        {
            info!(path = %path, "loading rules from {}", RULES_ENV_VAR);
            return Self::from_path(path.trim());
        }

        match default_rules_path() {
            Some(path) if path.exists() => {
                info!(path = %path.display(), "loading rules");
                Self::from_path(path)
            }
            _ => {
                debug!("no rule file found, using default rule only");
                Ok(Self::default())
            }
        }
    }

    /// Resolves the rule for a URL string. Unparseable or host-less URLs get
    /// the default rule.
    pub fn resolve(&self, url: &str) -> &Rule {
        match Url::parse(url).ok().as_ref().and_then(Url::host_str) {
            Some(host) => self.resolve_host(host),
            None => &self.default,
        }
    }

    /// First rule (in file order) whose domains match `host`.
    pub fn resolve_host(&self, host: &str) -> &Rule {
        self.rules.iter().find(|rule| rule.matches_host(host)).unwrap_or(&self.default)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn default_rule(&self) -> &Rule {
        &self.default
    }

    /// Compiled matchers for `<script>` elements stripped before selection.
    pub fn blocked_scripts(&self) -> &[Regex] {
        &self.blocked_scripts
    }
}

/// `<config dir>/snipnote/parser_rules.json`
pub fn default_rules_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("snipnote").join("parser_rules.json"))
}

fn blocked_script_regex(source: &str) -> Result<Regex> {
    let escaped = regex::escape(source);
    let pattern = format!(
        r#"(?is)<script\b[^>]*\bsrc\s*=\s*["']?[^"'\s>]*{}[^"'\s>]*["']?[^>]*?(?:/>|>.*?</script\s*>)"#,
        escaped
    );
    Regex::new(&pattern).map_err(|e| ExtractionError::Config(format!("blocked script `{}`: {}", source, e)))
}

fn strip_config_prefix(err: &ExtractionError) -> String {
    match err {
        ExtractionError::Config(detail) => detail.clone(),
        other => other.to_string(),
    }
}
