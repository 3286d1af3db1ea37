//! Parsed view of a full page, used for page-level metadata.
//!
//! # Example
//!
//! ```rust
//! use snipnote_core::Document;
//!
//! let doc = Document::parse("<html><head><title>Test</title></head><body><p>Hello</p></body></html>");
//! assert_eq!(doc.title(), Some("Test".to_string()));
//! ```

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use crate::html::normalize_whitespace;

static TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("title").unwrap());

/// A parsed HTML document.
pub struct Document {
    html: Html,
}

impl Document {
    pub fn parse(html: &str) -> Self {
        Self { html: Html::parse_document(html) }
    }

    /// All elements matching `selector`, in document order.
    pub fn select<'a>(&'a self, selector: &'a Selector) -> impl Iterator<Item = ElementRef<'a>> + 'a {
        self.html.select(selector)
    }

    /// Whitespace-normalized text of the first element matching `selector`,
    /// if non-empty.
    pub fn first_text(&self, selector: &Selector) -> Option<String> {
        self.html
            .select(selector)
            .map(|el| normalize_whitespace(&el.text().collect::<String>()))
            .find(|text| !text.is_empty())
    }

    /// Content of the `<title>` element.
    pub fn title(&self) -> Option<String> {
        self.first_text(&TITLE)
    }
}
