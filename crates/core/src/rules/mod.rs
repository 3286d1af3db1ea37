//! Declarative site rules.
//!
//! A rule file is a JSON array of [`Rule`] objects (or an object with a
//! `rules` array and `blocked_script_sources`). Rules are matched against the
//! request host in file order; the first match wins and the built-in default
//! rule covers everything else.
//!
//! ```json
//! [
//!   {
//!     "name": "example-news",
//!     "domains": ["news.example.com"],
//!     "primary_patterns": ["<div class=\"story-body\"[^>]*>"],
//!     "stop_patterns": ["<h2>Related"],
//!     "post_parse_actions": ["dedupe_blocks", {"action": "limit_blocks", "max": 60}],
//!     "min_blocks": 3
//!   }
//! ]
//! ```

mod index;
mod pattern;
mod rule;

pub use index::{RULES_ENV_VAR, RuleIndex, default_rules_path};
pub use pattern::{ElementSelector, Pattern, QuerySelector};
pub use rule::{HeaderValueSource, Rule, TextReplacement};
