use std::fmt;
use std::ops::Deref;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Deserializer, de};

/// A rule regex, compiled once when the rule file is loaded.
///
/// All rule patterns are case-insensitive and `.` also matches newlines,
/// since they run against raw HTML that wraps freely.
#[derive(Clone)]
pub struct Pattern(Regex);

impl Pattern {
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        RegexBuilder::new(source)
            .case_insensitive(true)
            .dot_matches_new_line(true)
            .build()
            .map(Pattern)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Deref for Pattern {
    type Target = Regex;

    fn deref(&self) -> &Regex {
        &self.0
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pattern({:?})", self.0.as_str())
    }
}

impl<'de> Deserialize<'de> for Pattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        Pattern::new(&source).map_err(|e| de::Error::custom(format!("invalid regex `{}`: {}", source, e)))
    }
}

/// CSS selector for streaming rewrites, checked against lol_html's grammar at load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementSelector(String);

impl ElementSelector {
    pub fn new(source: &str) -> Result<Self, String> {
        source
            .parse::<lol_html::Selector>()
            .map(|_| ElementSelector(source.to_string()))
            .map_err(|e| format!("invalid selector `{}`: {}", source, e))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for ElementSelector {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        ElementSelector::new(&source).map_err(de::Error::custom)
    }
}

/// CSS selector evaluated against a parsed DOM.
#[derive(Debug, Clone)]
pub struct QuerySelector(scraper::Selector);

impl QuerySelector {
    pub fn new(source: &str) -> Result<Self, String> {
        scraper::Selector::parse(source)
            .map(QuerySelector)
            .map_err(|e| format!("invalid selector `{}`: {}", source, e))
    }
}

impl Deref for QuerySelector {
    type Target = scraper::Selector;

    fn deref(&self) -> &scraper::Selector {
        &self.0
    }
}

impl<'de> Deserialize<'de> for QuerySelector {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        QuerySelector::new(&source).map_err(de::Error::custom)
    }
}
