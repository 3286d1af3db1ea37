use tracing::debug;

use crate::actions::ActionContext;

/// Cleans the selected fragment in `ctx.html`.
///
/// Order: `drop_exact` (literal), `drop_patterns`, truncation at the earliest
/// `stop_patterns` hit, then the rule's post-clean actions.
pub fn clean(ctx: &mut ActionContext<'_>) {
    let rule = ctx.rule;
    let before = ctx.html.len();

    for literal in rule.drop_exact.iter().filter(|l| !l.is_empty()) {
        if ctx.html.contains(literal.as_str()) {
            ctx.html = ctx.html.replace(literal.as_str(), "");
        }
    }

    for pattern in &rule.drop_patterns {
        if pattern.is_match(&ctx.html) {
            ctx.html = pattern.replace_all(&ctx.html, "").into_owned();
        }
    }

    let stop = rule.stop_patterns.iter().filter_map(|p| p.find(&ctx.html).map(|m| m.start())).min();
    if let Some(position) = stop {
        debug!(position, "truncating at stop pattern");
        ctx.html.truncate(position);
    }

    for action in &rule.post_clean_actions {
        action.apply(ctx);
        debug!(action = action.name(), len = ctx.html.len(), "post-clean action applied");
    }

    debug!(before, after = ctx.html.len(), "fragment cleaned");
}
