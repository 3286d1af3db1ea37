use html_escape::encode_text;
use scraper::{ElementRef, Html, Node};
use tracing::debug;

use super::code::detect_language;
use super::images::collect_images;
use super::{Block, BlockKind, MarkdownConfig};
use crate::actions::ActionContext;
use crate::html::{normalize_whitespace, strip_images, truncate_chars};

/// Dropped with everything inside them.
const SKIPPED_TAGS: &[&str] = &[
    "script", "style", "noscript", "template", "nav", "footer", "aside", "form", "button", "svg", "iframe", "select",
    "textarea", "input", "head", "title", "meta", "link",
];

/// Tokens in `id`, `class`, or `role` marking page chrome rather than content.
const NOISE_TOKENS: &[&str] = &[
    "menu", "nav", "footer", "sidebar", "comment", "comments", "related", "share", "social", "cookie", "newsletter",
    "promo", "advert", "ads",
];

/// Elements whose children are walked for blocks rather than rendered inline.
const CONTAINER_TAGS: &[&str] = &[
    "html", "body", "div", "section", "article", "main", "header", "hgroup", "ul", "ol", "dl", "table", "thead",
    "tbody", "tfoot", "tr", "td", "th", "figure", "details", "summary", "center", "address",
];

const BLOCK_TAGS: &[&str] = &[
    "p", "h1", "h2", "h3", "h4", "h5", "h6", "li", "blockquote", "pre", "dt", "dd", "figcaption", "hr",
];

/// Converts the context's HTML fragment into blocks and collects its images.
pub fn convert(ctx: &mut ActionContext<'_>, config: &MarkdownConfig) {
    ctx.images = collect_images(&ctx.html, ctx.final_url.as_ref(), ctx.rule);

    let fragment = Html::parse_fragment(&strip_images(&ctx.html));
    let mut walker = BlockWalker::new(config);
    walker.walk_children(fragment.root_element());
    walker.flush();

    debug!(blocks = walker.blocks.len(), images = ctx.images.len(), "converted fragment");
    ctx.blocks = walker.blocks;
}

struct BlockWalker<'c> {
    config: &'c MarkdownConfig,
    blocks: Vec<Block>,
    /// Inline HTML seen directly inside a container, emitted as a paragraph
    /// at the next block boundary.
    pending: String,
}

impl<'c> BlockWalker<'c> {
    fn new(config: &'c MarkdownConfig) -> Self {
        Self { config, blocks: Vec::new(), pending: String::new() }
    }

    fn walk_children(&mut self, element: ElementRef<'_>) {
        for child in element.children() {
            match child.value() {
                Node::Text(text) => self.pending.push_str(&encode_text(&*text.text)),
                Node::Element(_) => {
                    if let Some(el) = ElementRef::wrap(child) {
                        self.visit_element(el);
                    }
                }
                _ => {}
            }
        }
    }

    fn visit_element(&mut self, element: ElementRef<'_>) {
        if is_skipped(element) {
            return;
        }

        let name = element.value().name();
        match name {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                self.flush();
                let level = name[1..].parse().unwrap_or(2);
                let text = normalize_whitespace(&element.text().collect::<String>());
                self.push(Block::heading(level, text));
            }
            "p" | "dt" | "dd" | "figcaption" => {
                self.flush();
                self.push_inline(BlockKind::Paragraph, &element.inner_html());
            }
            "blockquote" => {
                self.flush();
                self.push_inline(BlockKind::Quote, &element.inner_html());
            }
            "li" => {
                self.flush();
                self.visit_list_item(element);
            }
            "pre" => {
                self.flush();
                self.visit_code(element);
            }
            "br" | "hr" => self.flush(),
            _ if CONTAINER_TAGS.contains(&name) || has_block_descendant(element) => {
                self.flush();
                self.walk_children(element);
                self.flush();
            }
            _ => self.pending.push_str(&element.html()),
        }
    }

    fn visit_list_item(&mut self, item: ElementRef<'_>) {
        let mut inline = String::new();
        let mut nested = Vec::new();

        for child in item.children() {
            match child.value() {
                Node::Text(text) => inline.push_str(&encode_text(&*text.text)),
                Node::Element(el) if matches!(el.name(), "ul" | "ol") => nested.push(child),
                Node::Element(_) => {
                    if let Some(el) = ElementRef::wrap(child)
                        && !is_skipped(el)
                    {
                        inline.push_str(&el.html());
                    }
                }
                _ => {}
            }
        }

        self.push_inline(BlockKind::ListItem, &inline);
        for list in nested.into_iter().filter_map(ElementRef::wrap) {
            self.walk_children(list);
        }
    }

    fn visit_code(&mut self, pre: ElementRef<'_>) {
        let language = detect_language(pre).unwrap_or_else(|| self.config.default_code_language.clone());
        let raw = pre.text().collect::<String>().replace("\r\n", "\n");
        let code = raw.trim_matches('\n').trim_end();
        if code.trim().is_empty() {
            return;
        }
        let code = truncate_chars(code, self.config.max_code_chars);
        self.push(Block::code(language, code));
    }

    fn push_inline(&mut self, kind: BlockKind, html: &str) {
        let markdown = htmd::convert(html).unwrap_or_default();
        let text = normalize_whitespace(&markdown);
        let text = truncate_chars(&text, self.config.max_block_chars);
        self.push(Block::new(kind, text));
    }

    fn push(&mut self, block: Block) {
        if !block.text.trim().is_empty() {
            self.blocks.push(block);
        }
    }

    fn flush(&mut self) {
        if self.pending.trim().is_empty() {
            self.pending.clear();
            return;
        }
        let html = std::mem::take(&mut self.pending);
        self.push_inline(BlockKind::Paragraph, &html);
    }
}

fn is_skipped(element: ElementRef<'_>) -> bool {
    let value = element.value();
    if SKIPPED_TAGS.contains(&value.name()) {
        return true;
    }
    ["id", "class", "role"]
        .iter()
        .filter_map(|attr| value.attr(attr))
        .flat_map(|v| v.split(|c: char| !c.is_ascii_alphanumeric()))
        .any(|token| NOISE_TOKENS.iter().any(|noise| token.eq_ignore_ascii_case(noise)))
}

fn has_block_descendant(element: ElementRef<'_>) -> bool {
    element
        .descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .any(|el| BLOCK_TAGS.contains(&el.value().name()) || CONTAINER_TAGS.contains(&el.value().name()))
}
