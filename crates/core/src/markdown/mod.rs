//! Cleaned fragment to Markdown.
//!
//! Conversion keeps output structured as [`Block`]s so the post-parse stage
//! can filter by role; [`render_blocks`] produces the final text.

mod block;
mod code;
mod convert;
mod images;

pub use block::{Block, BlockKind, BlockQuality};
pub use code::detect_language;
pub use convert::convert;
pub use images::collect_images;

/// Appended when the rendered body hits [`MarkdownConfig::max_total_chars`].
pub const TRUNCATION_NOTICE: &str = "_[Content truncated]_";

/// Configuration for Markdown conversion
#[derive(Debug, Clone)]
pub struct MarkdownConfig {
    /// Fence tag for code blocks with no recognisable language marker
    pub default_code_language: String,
    /// Character cap for a single prose block
    pub max_block_chars: usize,
    /// Character cap for a single code block
    pub max_code_chars: usize,
    /// Character cap for the whole rendered body
    pub max_total_chars: usize,
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self {
            default_code_language: "java".to_string(),
            max_block_chars: 1400,
            max_code_chars: 8000,
            max_total_chars: 45000,
        }
    }
}

/// Renders blocks separated by blank lines, stopping with a notice once the
/// total character budget would be exceeded.
pub fn render_blocks(blocks: &[Block], config: &MarkdownConfig) -> String {
    let mut rendered = Vec::with_capacity(blocks.len());
    let mut total = 0;

    for block in blocks {
        let text = block.render();
        let len = text.chars().count();
        if total + len > config.max_total_chars {
            rendered.push(TRUNCATION_NOTICE.to_string());
            break;
        }
        total += len;
        rendered.push(text);
    }

    rendered.join("\n\n")
}

/// Counts blank-line separated blocks; a fenced code block counts once no
/// matter how many blank lines it contains.
///
/// A fence closes only on a line made of at least as many backticks as the
/// line that opened it.
pub fn count_markdown_blocks(markdown: &str) -> usize {
    let mut count = 0;
    let mut in_block = false;
    let mut fence: Option<usize> = None;

    for line in markdown.lines() {
        let trimmed = line.trim();
        let ticks = trimmed.len() - trimmed.trim_start_matches('`').len();
        if let Some(open) = fence {
            if ticks >= open && ticks == trimmed.len() {
                fence = None;
            }
            continue;
        }
        if ticks >= 3 {
            count += 1;
            fence = Some(ticks);
            in_block = false;
        } else if trimmed.is_empty() {
            in_block = false;
        } else if !in_block {
            count += 1;
            in_block = true;
        }
    }

    count
}
