//! Rule-driven article extraction: fetch a page, locate its content, and
//! render it as clean Markdown.
//!
//! # Example
//!
//! ```rust
//! use snipnote_core::{ArticleExtractor, RuleIndex};
//!
//! let rules = RuleIndex::from_json_str(r#"[{"name": "blog", "domains": ["blog.example.com"]}]"#).unwrap();
//! let extractor = ArticleExtractor::builder().rules(rules).build().unwrap();
//!
//! let html = "<html><head><title>Hello</title></head><body><article><p>Body text.</p></article></body></html>";
//! let result = extractor.extract_html(html, Some("https://blog.example.com/hello")).unwrap();
//! assert_eq!(result.title, "Hello");
//! assert_eq!(result.markdown, "Body text.");
//! ```

pub mod actions;
pub mod article;
pub mod clean;
pub mod credentials;
pub mod error;
pub mod extractor;
pub mod fetch;
mod html;
pub mod markdown;
pub mod metadata;
pub mod parse;
pub mod postprocess;
pub mod rules;
pub mod select;

pub use actions::{ActionContext, PostCleanAction, PostParseAction, PrePrimaryAction};
pub use article::{ExtractionResult, OutputFormat};
pub use clean::clean;
pub use credentials::{CookieStore, CredentialSource, EnvCredentials, StaticCredentials};
pub use error::{ErrorKind, ExtractionError, Result};
pub use extractor::{ArticleExtractor, ExtractorBuilder};
pub use fetch::{FetchConfig, FetchError, FetchResult, Fetcher, fetch_file, fetch_stdin};
pub use markdown::{Block, BlockKind, BlockQuality, MarkdownConfig};
pub use parse::Document;
pub use postprocess::finalize;
pub use rules::{Rule, RuleIndex};
pub use select::{ContentSelector, Locator, Selection};
