use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use super::ActionContext;
use crate::markdown::Block;
use crate::rules::Pattern;

static RELATIVE_LINK_BLOCK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\[[^\]]*\]\(/[^)]*\)$").unwrap());
static MARKUP_CHARS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[*`_\[\]()#>-]").unwrap());

const SENTENCE_PUNCTUATION: &[char] = &['。', '！', '？', '；', '：', '，', ',', '.', '!', '?', ';', ':'];
const CJK_TERMINATORS: &[char] = &['。', '！', '？'];
const LATIN_TERMINATORS: &[char] = &['.', '!', '?', ':'];

/// Edits over the converted block list, run after text replacements.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PostParseAction {
    /// Keeps sentence-like blocks, short headings, and code.
    SemanticFilter {
        #[serde(default)]
        noise_phrases: Vec<String>,
    },
    /// Once enough body text has been seen, cuts everything from the first
    /// run of consecutive headline-like blocks onward (teaser lists, rankings).
    HeadlineTailCut {
        #[serde(default = "default_min_body_blocks")]
        min_body_blocks: usize,
        #[serde(default = "default_min_headline_run")]
        min_headline_run: usize,
    },
    /// Drops prose blocks (paragraphs, list items, quotes) whose text,
    /// markup aside, is shorter than `min_chars`, or `min_cjk_chars` when it
    /// contains CJK.
    DropShortBlocks {
        #[serde(default = "default_min_chars")]
        min_chars: usize,
        #[serde(default = "default_min_cjk_chars")]
        min_cjk_chars: usize,
    },
    DropBlocksMatching { patterns: Vec<Pattern> },
    /// Drops blocks that are nothing but one site-relative link.
    DropRelativeLinkBlocks,
    DedupeBlocks,
    LimitBlocks { max: usize },
}

fn default_min_body_blocks() -> usize {
    3
}

fn default_min_headline_run() -> usize {
    2
}

fn default_min_chars() -> usize {
    25
}

fn default_min_cjk_chars() -> usize {
    10
}

impl PostParseAction {
    pub fn name(&self) -> &'static str {
        match self {
            PostParseAction::SemanticFilter { .. } => "semantic_filter",
            PostParseAction::HeadlineTailCut { .. } => "headline_tail_cut",
            PostParseAction::DropShortBlocks { .. } => "drop_short_blocks",
            PostParseAction::DropBlocksMatching { .. } => "drop_blocks_matching",
            PostParseAction::DropRelativeLinkBlocks => "drop_relative_link_blocks",
            PostParseAction::DedupeBlocks => "dedupe_blocks",
            PostParseAction::LimitBlocks { .. } => "limit_blocks",
        }
    }

    pub fn apply(&self, ctx: &mut ActionContext<'_>) {
        let blocks = &mut ctx.blocks;
        match self {
            PostParseAction::SemanticFilter { noise_phrases } => {
                let phrases: Vec<String> = noise_phrases.iter().map(|p| p.to_lowercase()).collect();
                blocks.retain(|block| keep_semantic(block, &phrases));
            }
            PostParseAction::HeadlineTailCut { min_body_blocks, min_headline_run } => {
                if let Some(cut) = headline_tail_start(blocks, *min_body_blocks, (*min_headline_run).max(1)) {
                    blocks.truncate(cut);
                }
            }
            PostParseAction::DropShortBlocks { min_chars, min_cjk_chars } => {
                blocks.retain(|block| !block.is_prose() || !is_too_short(&block.text, *min_chars, *min_cjk_chars));
            }
            PostParseAction::DropBlocksMatching { patterns } => {
                blocks.retain(|block| !patterns.iter().any(|p| p.is_match(&block.text)));
            }
            PostParseAction::DropRelativeLinkBlocks => {
                blocks.retain(|block| block.is_code() || !RELATIVE_LINK_BLOCK.is_match(block.text.trim()));
            }
            PostParseAction::DedupeBlocks => {
                let mut seen = HashSet::new();
                blocks.retain(|block| seen.insert(block.render()));
            }
            PostParseAction::LimitBlocks { max } => blocks.truncate(*max),
        }
    }
}

fn keep_semantic(block: &Block, noise_phrases: &[String]) -> bool {
    if block.is_code() {
        return true;
    }
    let lowered = block.text.to_lowercase();
    if noise_phrases.iter().any(|p| !p.is_empty() && lowered.contains(p.as_str())) {
        return false;
    }
    if block.is_heading() {
        let len = block.text.chars().count();
        return (6..=80).contains(&len);
    }
    looks_like_sentence(&block.text)
}

/// At least 20 characters and either punctuated or dense CJK prose.
pub(crate) fn looks_like_sentence(text: &str) -> bool {
    let text = text.trim();
    let len = text.chars().count();
    if len < 20 {
        return false;
    }
    if text.contains(SENTENCE_PUNCTUATION) {
        return true;
    }
    let cjk = text.chars().filter(|c| is_cjk(*c)).count();
    cjk >= 8 && len >= 28
}

fn is_too_short(text: &str, min_chars: usize, min_cjk_chars: usize) -> bool {
    let bare = MARKUP_CHARS.replace_all(text, "");
    let bare = bare.trim();
    let min = if bare.chars().any(is_cjk) { min_cjk_chars } else { min_chars };
    bare.chars().count() < min
}

fn is_cjk(c: char) -> bool {
    matches!(c, '\u{4e00}'..='\u{9fff}' | '\u{3040}'..='\u{30ff}' | '\u{ac00}'..='\u{d7af}')
}

fn is_headline_like(block: &Block) -> bool {
    if block.is_code() {
        return false;
    }
    let text = block.text.trim();
    let len = text.chars().count();
    (18..=120).contains(&len) && !text.contains(CJK_TERMINATORS) && !text.ends_with(LATIN_TERMINATORS)
}

fn headline_tail_start(blocks: &[Block], min_body: usize, min_run: usize) -> Option<usize> {
    let mut body_like = 0;
    let mut run = 0;
    for (index, block) in blocks.iter().enumerate() {
        if is_headline_like(block) {
            run += 1;
            if body_like >= min_body && run >= min_run {
                return Some(index + 1 - run);
            }
        } else {
            run = 0;
            if looks_like_sentence(&block.text) {
                body_like += 1;
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::BlockKind;
    use crate::rules::Rule;
    use rstest::rstest;

    fn run(action: &str, blocks: Vec<Block>) -> Vec<Block> {
        let action: PostParseAction = serde_json::from_str(action).unwrap();
        let rule = Rule::default();
        let mut ctx = ActionContext::new(&rule, None).with_blocks(blocks);
        action.apply(&mut ctx);
        ctx.blocks
    }

    #[rstest]
    #[case("Too short.", false)]
    #[case("This one is long enough and ends properly.", true)]
    #[case("no punctuation but it keeps going on and on", false)]
    #[case("这是一个没有标点符号但是足够长的中文句子用于测试语义过滤功能是否正常工作", true)]
    fn test_looks_like_sentence(#[case] text: &str, #[case] expected: bool) {
        assert_eq!(looks_like_sentence(text), expected);
    }

    #[test]
    fn test_semantic_filter() {
        let blocks = vec![
            Block::heading(2, "Background"),
            Block::paragraph("Home"),
            Block::paragraph("The committee met on Tuesday to review the proposal."),
            Block::paragraph("Subscribe to our newsletter, it is great."),
            Block::code("java", "x"),
        ];
        let kept = run(r#"{"action": "semantic_filter", "noise_phrases": ["Newsletter"]}"#, blocks);
        let texts: Vec<&str> = kept.iter().map(|b| b.text.as_str()).collect();
        assert_eq!(texts, vec!["Background", "The committee met on Tuesday to review the proposal.", "x"]);
    }

    #[test]
    fn test_headline_tail_cut() {
        let body = "A long paragraph of body text that reads like prose.";
        let blocks = vec![
            Block::paragraph(body),
            Block::paragraph(body),
            Block::paragraph(body),
            Block::paragraph("Also worth a look this week"),
            Block::paragraph(body),
            Block::paragraph("Ranking: top stories today"),
            Block::paragraph("Shares slide after earnings miss"),
            Block::paragraph("Rates hold steady into summer"),
        ];
        let kept = run(r#"{"action": "headline_tail_cut"}"#, blocks);
        assert_eq!(kept.len(), 5);
        assert_eq!(kept[4].text, body);
    }

    #[test]
    fn test_headline_tail_cut_needs_body_first() {
        let blocks = vec![
            Block::paragraph("Shares slide after earnings miss"),
            Block::paragraph("Rates hold steady into summer"),
            Block::paragraph("A long paragraph of body text that reads like prose."),
        ];
        assert_eq!(run(r#"{"action": "headline_tail_cut"}"#, blocks).len(), 3);
    }

    #[test]
    fn test_drop_short_blocks() {
        let blocks = vec![
            Block::heading(2, "Intro"),
            Block::paragraph("Read more"),
            Block::new(BlockKind::ListItem, "**[Share](/share)**"),
            Block::paragraph("The council approved the harbour budget."),
            Block::paragraph("市议会批准了港口预算"),
            Block::new(BlockKind::Quote, "Short."),
            Block::code("java", "x();"),
        ];
        let kept = run(r#"{"action": "drop_short_blocks"}"#, blocks);
        let texts: Vec<&str> = kept.iter().map(|b| b.text.as_str()).collect();
        assert_eq!(texts, vec!["Intro", "The council approved the harbour budget.", "市议会批准了港口预算", "x();"]);
    }

    #[test]
    fn test_drop_short_blocks_custom_threshold() {
        let blocks = vec![Block::paragraph("Read more"), Block::paragraph("Hi")];
        let kept = run(r#"{"action": "drop_short_blocks", "min_chars": 5}"#, blocks);
        assert_eq!(kept, vec![Block::paragraph("Read more")]);
    }

    #[test]
    fn test_drop_blocks_matching() {
        let blocks = vec![Block::paragraph("Advertisement"), Block::paragraph("Real content here.")];
        let kept = run(r#"{"action": "drop_blocks_matching", "patterns": ["^advert"]}"#, blocks);
        assert_eq!(kept, vec![Block::paragraph("Real content here.")]);
    }

    #[test]
    fn test_drop_relative_link_blocks() {
        let blocks = vec![
            Block::new(BlockKind::ListItem, "[Next post](/2024/next)"),
            Block::paragraph("[External](https://other.org/x)"),
            Block::paragraph("Read [more](/more) here."),
        ];
        let kept = run(r#"{"action": "drop_relative_link_blocks"}"#, blocks);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_dedupe_and_limit() {
        let blocks = vec![
            Block::paragraph("one"),
            Block::paragraph("two"),
            Block::paragraph("one"),
            Block::heading(2, "one"),
            Block::paragraph("three"),
        ];
        let deduped = run(r#"{"action": "dedupe_blocks"}"#, blocks);
        assert_eq!(deduped.len(), 4);
        let limited = run(r#"{"action": "limit_blocks", "max": 2}"#, deduped);
        assert_eq!(limited, vec![Block::paragraph("one"), Block::paragraph("two")]);
    }
}
