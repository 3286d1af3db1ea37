/// Structural role of a Markdown block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockKind {
    /// Source heading level, 1 through 6.
    Heading(u8),
    Paragraph,
    ListItem,
    Quote,
    Code { language: String },
}

/// One unit of converted output, kept structured until rendering so the
/// post-parse actions can reason about block roles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub kind: BlockKind,
    pub text: String,
}

impl Block {
    pub fn new(kind: BlockKind, text: impl Into<String>) -> Self {
        Self { kind, text: text.into() }
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        Self::new(BlockKind::Paragraph, text)
    }

    pub fn heading(level: u8, text: impl Into<String>) -> Self {
        Self::new(BlockKind::Heading(level.clamp(1, 6)), text)
    }

    pub fn code(language: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(BlockKind::Code { language: language.into() }, text)
    }

    pub fn is_code(&self) -> bool {
        matches!(self.kind, BlockKind::Code { .. })
    }

    pub fn is_heading(&self) -> bool {
        matches!(self.kind, BlockKind::Heading(_))
    }

    /// Paragraphs, list items, and quotes.
    pub fn is_prose(&self) -> bool {
        matches!(self.kind, BlockKind::Paragraph | BlockKind::ListItem | BlockKind::Quote)
    }

    /// Renders the block as Markdown.
    ///
    /// Headings are shifted down one level because the archived document
    /// reserves `#` for the article title.
    pub fn render(&self) -> String {
        match &self.kind {
            BlockKind::Heading(level) => {
                let depth = (*level as usize + 1).min(6);
                format!("{} {}", "#".repeat(depth), self.text)
            }
            BlockKind::Paragraph => self.text.clone(),
            BlockKind::ListItem => format!("- {}", self.text),
            BlockKind::Quote => self
                .text
                .lines()
                .map(|line| if line.is_empty() { ">".to_string() } else { format!("> {}", line) })
                .collect::<Vec<_>>()
                .join("\n"),
            BlockKind::Code { language } => {
                let fence = code_fence(&self.text);
                format!("{fence}{language}\n{}\n{fence}", self.text)
            }
        }
    }
}

/// How article-like a block list is, compared field by field: prose block
/// count, then blocks of at least [`BlockQuality::LONG_BLOCK_CHARS`], then
/// total characters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct BlockQuality {
    pub prose_blocks: usize,
    pub long_blocks: usize,
    pub total_chars: usize,
}

impl BlockQuality {
    pub const LONG_BLOCK_CHARS: usize = 120;

    pub fn of(blocks: &[Block]) -> Self {
        blocks.iter().fold(Self::default(), |mut quality, block| {
            let chars = block.text.chars().count();
            quality.total_chars += chars;
            if block.is_prose() {
                quality.prose_blocks += 1;
            }
            if chars >= Self::LONG_BLOCK_CHARS {
                quality.long_blocks += 1;
            }
            quality
        })
    }
}

/// Backtick fence one longer than the longest backtick run in `code`, never
/// shorter than three.
pub(crate) fn code_fence(code: &str) -> String {
    let longest = code.split(|c: char| c != '`').map(str::len).max().unwrap_or(0);
    "`".repeat((longest + 1).max(3))
}
