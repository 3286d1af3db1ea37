//! Final text surgery and the minimum-content gate.

use tracing::debug;

use crate::actions::ActionContext;
use crate::markdown::{MarkdownConfig, count_markdown_blocks, render_blocks};
use crate::{ExtractionError, Result};

/// Applies text replacements and post-parse actions to `ctx.blocks`, renders
/// them, and checks the result against the rule's `min_blocks`.
pub fn finalize(ctx: &mut ActionContext<'_>, config: &MarkdownConfig) -> Result<String> {
    let rule = ctx.rule;
    apply_text_replacements(ctx);

    for action in &rule.post_parse_actions {
        let before = ctx.blocks.len();
        action.apply(ctx);
        debug!(action = action.name(), before, after = ctx.blocks.len(), "post-parse action applied");
    }

    let markdown = render_blocks(&ctx.blocks, config);
    validate(&markdown, ctx)?;
    Ok(markdown)
}

/// Rewrites the text of every non-code block, dropping blocks left empty.
fn apply_text_replacements(ctx: &mut ActionContext<'_>) {
    let rule = ctx.rule;
    let replacements = &rule.text_replacements;
    if replacements.is_empty() {
        return;
    }

    ctx.blocks.retain_mut(|block| {
        if block.is_code() {
            return true;
        }
        for replacement in replacements {
            if replacement.pattern.is_match(&block.text) {
                block.text = replacement.pattern.replace_all(&block.text, replacement.to.as_str()).into_owned();
            }
        }
        block.text = block.text.trim().to_string();
        !block.text.is_empty()
    });
}

fn validate(markdown: &str, ctx: &ActionContext<'_>) -> Result<()> {
    let rule = ctx.rule;
    let count = count_markdown_blocks(markdown);
    debug!(count, min = rule.min_blocks, "validating block count");

    if count == 0 {
        return Err(ExtractionError::Validation(
            rule.min_blocks_error.clone().unwrap_or_else(|| "no extractable content blocks".to_string()),
        ));
    }
    if count < rule.min_blocks {
        return Err(ExtractionError::Validation(rule.min_blocks_error.clone().unwrap_or_else(|| {
            format!("content too short ({} of {} required blocks)", count, rule.min_blocks)
        })));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use crate::markdown::Block;
    use crate::rules::Rule;
    use serde_json::json;

    fn rule(value: serde_json::Value) -> Rule {
        Rule::from_value(value, 0).unwrap()
    }

    fn finalize_blocks(rule: &Rule, blocks: Vec<Block>) -> Result<String> {
        let mut ctx = ActionContext::new(rule, None).with_blocks(blocks);
        finalize(&mut ctx, &MarkdownConfig::default())
    }

    #[test]
    fn test_text_replacements_use_templates_and_drop_empty() {
        let rule = rule(json!({
            "text_replacements": [
                {"pattern": "^Photo: .*$"},
                {"pattern": "(\\d+) yuan", "to": "¥$1"}
            ]
        }));
        let blocks = vec![
            Block::paragraph("Photo: Reuters"),
            Block::paragraph("It costs 30 YUAN today."),
            Block::code("java", "Photo: keep"),
        ];
        let md = finalize_blocks(&rule, blocks).unwrap();
        assert_eq!(md, "It costs ¥30 today.\n\n```java\nPhoto: keep\n```");
    }

    #[test]
    fn test_post_parse_actions_run_in_order() {
        let rule = rule(json!({"post_parse_actions": ["dedupe_blocks", {"action": "limit_blocks", "max": 2}]}));
        let blocks = vec![Block::paragraph("a"), Block::paragraph("a"), Block::paragraph("b"), Block::paragraph("c")];
        assert_eq!(finalize_blocks(&rule, blocks).unwrap(), "a\n\nb");
    }

    #[test]
    fn test_min_blocks_violation_uses_custom_message() {
        let rule = rule(json!({"min_blocks": 3, "min_blocks_error": "login wall: body not available"}));
        let err = finalize_blocks(&rule, vec![Block::paragraph("one"), Block::paragraph("two")]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.to_string(), "login wall: body not available");
    }

    #[test]
    fn test_min_blocks_violation_default_message() {
        let rule = rule(json!({"min_blocks": 2}));
        let err = finalize_blocks(&rule, vec![Block::paragraph("only")]).unwrap_err();
        assert!(err.to_string().contains("content too short"));
    }

    #[test]
    fn test_empty_body_always_fails() {
        let err = finalize_blocks(&Rule::default(), Vec::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_code_fence_counts_as_one_block() {
        let rule = rule(json!({"min_blocks": 2}));
        let blocks = vec![Block::code("java", "int a;\n\nint b;")];
        assert!(finalize_blocks(&rule, blocks).is_err());
    }
}
