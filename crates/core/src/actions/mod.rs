//! Rule-selected actions and the context they operate on.
//!
//! Each pipeline stage has its own closed set of actions:
//! [`PrePrimaryAction`] runs against raw page HTML before container
//! selection, [`PostCleanAction`] rewrites the cleaned fragment, and
//! [`PostParseAction`] edits the converted Markdown blocks. In the rule file
//! an action is either a bare name (`"dedupe_blocks"`) or an object tagged by
//! `action` carrying its parameters.

mod post_clean;
mod post_parse;
mod pre_primary;

pub use post_clean::PostCleanAction;
pub use post_parse::PostParseAction;
pub use pre_primary::PrePrimaryAction;

use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use url::Url;

use crate::markdown::Block;
use crate::rules::Rule;

/// Working state of one extraction, threaded through the stages after the
/// content container has been selected.
#[derive(Debug)]
pub struct ActionContext<'r> {
    /// Rule driving this extraction.
    pub rule: &'r Rule,
    /// URL the HTML was actually served from, used to resolve relative links.
    pub final_url: Option<Url>,
    /// Current HTML fragment.
    pub html: String,
    /// Converted blocks, empty until the Markdown stage runs.
    pub blocks: Vec<Block>,
    /// Absolute image URLs collected from the fragment.
    pub images: Vec<String>,
}

impl<'r> ActionContext<'r> {
    pub fn new(rule: &'r Rule, final_url: Option<Url>) -> Self {
        Self { rule, final_url, html: String::new(), blocks: Vec::new(), images: Vec::new() }
    }

    pub fn with_html(mut self, html: impl Into<String>) -> Self {
        self.html = html.into();
        self
    }

    pub fn with_blocks(mut self, blocks: Vec<Block>) -> Self {
        self.blocks = blocks;
        self
    }
}

/// Deserializes a list of actions, expanding bare names into `{"action": name}`.
pub(crate) fn deserialize_actions<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let entries = Vec::<Value>::deserialize(deserializer)?;
    entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            let entry = match entry {
                Value::String(name) => serde_json::json!({ "action": name }),
                other => other,
            };
            serde_json::from_value(entry).map_err(|e| de::Error::custom(format!("action #{}: {}", index, e)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Chain {
        #[serde(deserialize_with = "deserialize_actions")]
        steps: Vec<PostParseAction>,
    }

    #[test]
    fn test_bare_names_and_objects_mix() {
        let chain: Chain = serde_json::from_str(
            r#"{"steps": ["dedupe_blocks", {"action": "limit_blocks", "max": 3}, "semantic_filter"]}"#,
        )
        .unwrap();
        assert_eq!(chain.steps.len(), 3);
        assert!(matches!(chain.steps[0], PostParseAction::DedupeBlocks));
        assert!(matches!(chain.steps[1], PostParseAction::LimitBlocks { max: 3 }));
    }

    #[test]
    fn test_unknown_action_is_rejected_with_position() {
        let err = serde_json::from_str::<Chain>(r#"{"steps": ["dedupe_blocks", "make_coffee"]}"#).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("action #1"));
        assert!(msg.contains("make_coffee"));
    }

    #[test]
    fn test_missing_required_parameter_is_rejected() {
        assert!(serde_json::from_str::<Chain>(r#"{"steps": ["limit_blocks"]}"#).is_err());
    }
}
