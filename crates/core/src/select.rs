//! Locating the main content container of a page.
//!
//! Locators are tried in a fixed order: the rule's pre-primary actions, then
//! `primary_container_ids`, then `primary_patterns`. The first locator that
//! yields a non-blank fragment wins. A rule with no container ids and no
//! patterns borrows the default rule's patterns.
//!
//! Such generic rules (and the default rule itself) also get the page's
//! JSON-LD article and meta description as competing candidates; see
//! [`ContentSelector::candidates`].

use std::borrow::Cow;
use std::fmt;

use regex::{Regex, RegexBuilder};
use tracing::debug;

use crate::actions::PrePrimaryAction;
use crate::html::balanced_inner;
use crate::rules::{Pattern, Rule, RuleIndex};
use crate::{ExtractionError, Result};

/// Which locator produced (or was tried for) a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locator {
    /// Index into `pre_primary_actions`.
    Action(usize),
    /// Index into `primary_container_ids`.
    ContainerId(usize),
    /// Index into the primary patterns in effect.
    Pattern(usize),
    /// Schema.org JSON-LD article body, generic rules only.
    JsonLd,
    /// `og:description`/`description` meta tag, generic rules only.
    MetaDescription,
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Action(i) => write!(f, "pre_primary_actions[{}]", i),
            Locator::ContainerId(i) => write!(f, "primary_container_ids[{}]", i),
            Locator::Pattern(i) => write!(f, "primary_patterns[{}]", i),
            Locator::JsonLd => f.write_str("json_ld_article"),
            Locator::MetaDescription => f.write_str("meta_description"),
        }
    }
}

/// Outcome of a successful selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Inner HTML of the chosen container, or a synthetic fragment.
    pub fragment: String,
    pub matched: Locator,
    /// Every locator tried, in order, including the winning one.
    pub tried: Vec<Locator>,
}

impl Selection {
    pub fn attempted(&self) -> usize {
        self.tried.len()
    }
}

/// Content selector bound to the page-wide settings of a [`RuleIndex`].
#[derive(Debug, Clone, Copy)]
pub struct ContentSelector<'a> {
    blocked_scripts: &'a [Regex],
    default_rule: &'a Rule,
}

const GENERIC_FALLBACKS: [(Locator, PrePrimaryAction); 2] = [
    (Locator::JsonLd, PrePrimaryAction::JsonLdArticle),
    (Locator::MetaDescription, PrePrimaryAction::MetaDescription),
];

impl<'a> ContentSelector<'a> {
    pub fn new(index: &'a RuleIndex) -> Self {
        Self { blocked_scripts: index.blocked_scripts(), default_rule: index.default_rule() }
    }

    /// Whether `rule` locates content only through the default patterns.
    pub fn is_generic(&self, rule: &Rule) -> bool {
        std::ptr::eq(rule, self.default_rule)
            || (rule.pre_primary_actions.is_empty()
                && rule.primary_container_ids.is_empty()
                && rule.primary_patterns.is_empty())
    }

    /// Every container worth converting, in preference order.
    ///
    /// A site rule yields exactly its [`select`](Self::select) result. A
    /// generic rule yields the default-pattern container (when one matched)
    /// followed by the JSON-LD article and the meta description (when the
    /// page has them); the caller keeps whichever converts best. Fails with
    /// `SelectionError` only when there is no candidate at all.
    pub fn candidates(&self, html: &str, rule: &Rule, url: Option<&str>) -> Result<Vec<Selection>> {
        if !self.is_generic(rule) {
            return self.select(html, rule, url).map(|selection| vec![selection]);
        }

        let mut candidates = Vec::new();
        let mut tried = match self.select(html, rule, url) {
            Ok(selection) => {
                let tried = selection.tried.clone();
                candidates.push(selection);
                tried
            }
            Err(ExtractionError::Selection { .. }) => (0..self.fallback_patterns().len()).map(Locator::Pattern).collect(),
            Err(other) => return Err(other),
        };

        let html = self.strip_blocked_scripts(html);
        for (locator, action) in &GENERIC_FALLBACKS {
            tried.push(*locator);
            match action.extract(&html) {
                Some(fragment) => {
                    debug!(%locator, len = fragment.len(), "generic candidate");
                    candidates.push(Selection { fragment, matched: *locator, tried: tried.clone() });
                }
                None => debug!(%locator, "no match"),
            }
        }

        if candidates.is_empty() {
            return Err(ExtractionError::Selection {
                rule: rule.name.clone(),
                url: url.unwrap_or("<input>").to_string(),
                attempted: tried.len(),
            });
        }
        Ok(candidates)
    }

    fn fallback_patterns(&self) -> &'a [Pattern] {
        &self.default_rule.primary_patterns
    }

    /// Selects the content container of `html` according to `rule`. `url` is
    /// only used in the error report.
    pub fn select(&self, html: &str, rule: &Rule, url: Option<&str>) -> Result<Selection> {
        let html = self.strip_blocked_scripts(html);
        let mut tried = Vec::new();

        for (i, action) in rule.pre_primary_actions.iter().enumerate() {
            let locator = Locator::Action(i);
            tried.push(locator);
            match action.extract(&html) {
                Some(fragment) => {
                    debug!(%locator, action = action.name(), len = fragment.len(), "synthetic fragment");
                    return Ok(Selection { fragment, matched: locator, tried });
                }
                None => debug!(%locator, action = action.name(), "no match"),
            }
        }

        for (i, id) in rule.primary_container_ids.iter().enumerate() {
            let locator = Locator::ContainerId(i);
            tried.push(locator);
            match container_by_id(&html, id).filter(|inner| !inner.trim().is_empty()) {
                Some(inner) => {
                    debug!(%locator, id = %id, len = inner.len(), "container matched");
                    return Ok(Selection { fragment: inner.to_string(), matched: locator, tried });
                }
                None => debug!(%locator, id = %id, "no match"),
            }
        }

        let patterns = if rule.primary_container_ids.is_empty() && rule.primary_patterns.is_empty() {
            self.fallback_patterns()
        } else {
            rule.primary_patterns.as_slice()
        };

        for (i, pattern) in patterns.iter().enumerate() {
            let locator = Locator::Pattern(i);
            tried.push(locator);
            match container_by_pattern(&html, pattern).filter(|inner| !inner.trim().is_empty()) {
                Some(inner) => {
                    debug!(%locator, pattern = pattern.as_str(), len = inner.len(), "container matched");
                    return Ok(Selection { fragment: inner.to_string(), matched: locator, tried });
                }
                None => debug!(%locator, pattern = pattern.as_str(), "no match"),
            }
        }

        Err(ExtractionError::Selection {
            rule: rule.name.clone(),
            url: url.unwrap_or("<input>").to_string(),
            attempted: tried.len(),
        })
    }

    fn strip_blocked_scripts<'h>(&self, html: &'h str) -> Cow<'h, str> {
        let mut html = Cow::Borrowed(html);
        for script in self.blocked_scripts {
            if script.is_match(&html) {
                html = Cow::Owned(script.replace_all(&html, "").into_owned());
            }
        }
        html
    }
}

/// Inner HTML of the first element whose `id` attribute equals `id`.
fn container_by_id<'h>(html: &'h str, id: &str) -> Option<&'h str> {
    let escaped = regex::escape(id);
    let source = format!(
        r#"<[a-z][a-z0-9:-]*\s(?:[^>]*\s)?id\s*=\s*(?:"{0}"|'{0}'|(?P<bare>{0}))(?P<rest>[^>]*)>"#,
        escaped
    );
    let opening = RegexBuilder::new(&source).case_insensitive(true).build().ok()?;
    opening
        .captures_iter(html)
        .find(|caps| {
            // An unquoted value must end where the attribute ends.
            let rest = caps.name("rest").map_or("", |m| m.as_str());
            caps.name("bare").is_none()
                || rest.is_empty()
                || rest.starts_with(char::is_whitespace)
                || rest.starts_with('/')
        })
        .and_then(|caps| {
            let m = caps.get(0)?;
            balanced_inner(html, m.start(), m.end())
        })
}

/// Container for one primary pattern: capture group 1 when it participates,
/// otherwise the balanced inner HTML of the matched opening tag.
fn container_by_pattern<'h>(html: &'h str, pattern: &Pattern) -> Option<&'h str> {
    let captures = pattern.captures(html)?;
    if let Some(group) = captures.get(1) {
        return Some(group.as_str());
    }
    let whole = captures.get(0)?;
    let text = whole.as_str();
    if text.starts_with('<') && !text.starts_with("</") && text.ends_with('>') {
        balanced_inner(html, whole.start(), whole.end())
    } else {
        None
    }
}
