//! The extraction pipeline entry point.
//!
//! [`ArticleExtractor`] ties the stages together: rule resolution, fetch,
//! container selection, cleaning, Markdown conversion, and post-processing.
//! Stages run strictly in that order and each only narrows or rewrites its
//! input.
//!
//! Pages handled by the default rule may offer several candidate containers
//! (see [`ContentSelector::candidates`]). Each is cleaned and converted, and
//! the one with the best [`BlockQuality`] goes on to post-processing; ties
//! keep the earlier candidate.
//!
//! # Example
//!
//! ```rust,no_run
//! use snipnote_core::{ArticleExtractor, RuleIndex};
//!
//! # #[tokio::main]
//! # async fn main() -> snipnote_core::Result<()> {
//! let extractor = ArticleExtractor::builder().rules(RuleIndex::load_default()?).build()?;
//! let result = extractor.extract("https://example.com/article").await?;
//! println!("{}", result.to_document());
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use tracing::{debug, info, instrument};
use url::Url;

use crate::actions::ActionContext;
use crate::article::ExtractionResult;
use crate::clean::clean;
use crate::credentials::{CookieStore, CredentialSource, EnvCredentials};
use crate::fetch::{FetchConfig, FetchError, Fetcher};
use crate::markdown::{BlockQuality, MarkdownConfig, convert};
use crate::parse::Document;
use crate::postprocess::finalize;
use crate::rules::{Rule, RuleIndex};
use crate::select::ContentSelector;
use crate::{ExtractionError, Result};

/// Runs the full pipeline. Cheap to clone and safe to share across tasks;
/// every call owns its own working state.
#[derive(Debug, Clone)]
pub struct ArticleExtractor {
    rules: Arc<RuleIndex>,
    fetcher: Fetcher,
    markdown: MarkdownConfig,
}

impl ArticleExtractor {
    pub fn builder() -> ExtractorBuilder {
        ExtractorBuilder::new()
    }

    /// Extractor with the default rule only, default configs, and
    /// environment credentials.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    pub fn rules(&self) -> &RuleIndex {
        &self.rules
    }

    pub fn markdown_config(&self) -> &MarkdownConfig {
        &self.markdown
    }

    /// Fetches `url` and extracts its article.
    #[instrument(skip(self), fields(rule = tracing::field::Empty))]
    pub async fn extract(&self, url: &str) -> Result<ExtractionResult> {
        let rule = self.rules.resolve(url);
        tracing::Span::current().record("rule", rule.name.as_str());
        debug!(rule = %rule.name, "resolved rule");

        let page = self.fetcher.fetch(url, rule).await?;
        if page.from_archive {
            info!(archive = %page.final_url, "extracting from archive snapshot");
        }
        self.run_stages(&page.body, rule, url, Some(page.final_url))
    }

    /// Runs every stage after the fetch on already-retrieved HTML.
    ///
    /// `source_url` picks the rule and resolves relative links; without it
    /// the default rule applies and links stay as written.
    pub fn extract_html(&self, html: &str, source_url: Option<&str>) -> Result<ExtractionResult> {
        let (rule, base) = match source_url {
            Some(url) => {
                let base = Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{}: {}", url, e)))?;
                (self.rules.resolve(url), Some(base))
            }
            None => (self.rules.default_rule(), None),
        };
        debug!(rule = %rule.name, "resolved rule");
        self.run_stages(html, rule, source_url.unwrap_or_default(), base)
    }

    fn run_stages(
        &self, html: &str, rule: &Rule, source_url: &str, final_url: Option<Url>,
    ) -> Result<ExtractionResult> {
        let title = Document::parse(html).extract_title().unwrap_or_default();

        let reported_url = Some(source_url).filter(|u| !u.is_empty());
        let candidates = ContentSelector::new(&self.rules).candidates(html, rule, reported_url)?;
        let final_url_text = final_url.as_ref().map(Url::to_string).unwrap_or_else(|| source_url.to_string());

        let mut best: Option<(BlockQuality, ActionContext<'_>)> = None;
        for selection in candidates {
            let mut ctx = ActionContext::new(rule, final_url.clone()).with_html(selection.fragment.clone());
            clean(&mut ctx);
            convert(&mut ctx, &self.markdown);

            let quality = BlockQuality::of(&ctx.blocks);
            debug!(
                locator = %selection.matched,
                attempted = selection.attempted(),
                blocks = ctx.blocks.len(),
                ?quality,
                "converted candidate"
            );
            if best.as_ref().is_none_or(|(top, _)| quality > *top) {
                best = Some((quality, ctx));
            }
        }

        let Some((_, mut ctx)) = best else {
            return Err(ExtractionError::Selection {
                rule: rule.name.clone(),
                url: reported_url.unwrap_or("<input>").to_string(),
                attempted: 0,
            });
        };
        let markdown = finalize(&mut ctx, &self.markdown)?;

        debug!(chars = markdown.len(), images = ctx.images.len(), "extraction complete");
        Ok(ExtractionResult {
            title,
            markdown,
            images: ctx.images,
            source_url: source_url.to_string(),
            final_url: final_url_text,
        })
    }
}

/// Builder for [`ArticleExtractor`].
///
/// ```rust
/// use snipnote_core::{ArticleExtractor, FetchConfig, MarkdownConfig};
///
/// let extractor = ArticleExtractor::builder()
///     .fetch_config(FetchConfig { timeout: 20, ..Default::default() })
///     .markdown_config(MarkdownConfig { default_code_language: "text".into(), ..Default::default() })
///     .build()
///     .unwrap();
/// assert_eq!(extractor.markdown_config().default_code_language, "text");
/// ```
#[derive(Debug, Default)]
pub struct ExtractorBuilder {
    rules: Option<Arc<RuleIndex>>,
    fetch: FetchConfig,
    markdown: MarkdownConfig,
    credentials: Option<Arc<dyn CredentialSource>>,
    cookies: Option<Arc<CookieStore>>,
}

impl ExtractorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rules(mut self, rules: RuleIndex) -> Self {
        self.rules = Some(Arc::new(rules));
        self
    }

    pub fn fetch_config(mut self, config: FetchConfig) -> Self {
        self.fetch = config;
        self
    }

    pub fn markdown_config(mut self, config: MarkdownConfig) -> Self {
        self.markdown = config;
        self
    }

    pub fn credentials(mut self, credentials: impl CredentialSource + 'static) -> Self {
        self.credentials = Some(Arc::new(credentials));
        self
    }

    pub fn cookies(mut self, cookies: CookieStore) -> Self {
        self.cookies = Some(Arc::new(cookies));
        self
    }

    pub fn build(self) -> Result<ArticleExtractor> {
        let credentials = self.credentials.unwrap_or_else(|| Arc::new(EnvCredentials));
        let cookies = self.cookies.unwrap_or_default();
        let fetcher = Fetcher::new(self.fetch, credentials, cookies)?;

        Ok(ArticleExtractor { rules: self.rules.unwrap_or_default(), fetcher, markdown: self.markdown })
    }
}
