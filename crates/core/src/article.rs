//! Extraction output and its renderings.

use serde::Serialize;

/// Output format options for an [`ExtractionResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Archival Markdown document (see [`ExtractionResult::to_document`]).
    #[default]
    Markdown,
    /// The result as a JSON object.
    Json,
}

/// The complete result of extracting one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractionResult {
    /// Page title; empty when none could be found.
    pub title: String,
    /// Cleaned Markdown body.
    pub markdown: String,
    /// Absolute image URLs, at most the rule's `max_images`.
    pub images: Vec<String>,
    /// URL the extraction was requested for.
    pub source_url: String,
    /// URL the content was served from (after redirects, or the archive
    /// snapshot).
    pub final_url: String,
}

impl ExtractionResult {
    /// Renders the stored-excerpt form: title heading, source line, image
    /// list, then the body.
    pub fn to_document(&self) -> String {
        let mut sections = Vec::with_capacity(4);

        if !self.title.is_empty() {
            sections.push(format!("# {}", self.title));
        }
        if !self.source_url.is_empty() {
            sections.push(format!("Source: <{}>", self.source_url));
        }
        if !self.images.is_empty() {
            sections.push(self.images.iter().map(|url| format!("![]({})", url)).collect::<Vec<_>>().join("\n"));
        }
        sections.push(self.markdown.clone());

        let mut document = sections.join("\n\n");
        document.push('\n');
        document
    }

    /// Pretty-printed JSON object with every field.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_format(&self, format: OutputFormat) -> serde_json::Result<String> {
        match format {
            OutputFormat::Markdown => Ok(self.to_document()),
            OutputFormat::Json => self.to_json(),
        }
    }
}
