use serde::Deserialize;
use url::Url;

use super::ActionContext;
use crate::html::rewrite_html;
use crate::rules::ElementSelector;

const LAZY_SRC_ATTRS: &[&str] = &["data-src", "data-original", "data-lazy-src"];

/// Rewrites applied to the cleaned fragment. All of them only remove or
/// rewrite markup; none add content.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PostCleanAction {
    /// Copies lazy-loading attributes into `src` on `<img>`.
    PromoteLazyImages,
    /// Resolves relative `img[src]` and `a[href]` against the final URL.
    AbsolutizeUrls,
    /// Removes matching elements and everything inside them.
    RemoveElements { selector: ElementSelector },
    /// Removes matching tags but keeps their content.
    UnwrapElements { selector: ElementSelector },
}

impl PostCleanAction {
    pub fn name(&self) -> &'static str {
        match self {
            PostCleanAction::PromoteLazyImages => "promote_lazy_images",
            PostCleanAction::AbsolutizeUrls => "absolutize_urls",
            PostCleanAction::RemoveElements { .. } => "remove_elements",
            PostCleanAction::UnwrapElements { .. } => "unwrap_elements",
        }
    }

    pub fn apply(&self, ctx: &mut ActionContext<'_>) {
        let rewritten = match self {
            PostCleanAction::PromoteLazyImages => promote_lazy_images(&ctx.html),
            PostCleanAction::AbsolutizeUrls => match &ctx.final_url {
                Some(base) => absolutize_urls(&ctx.html, base),
                None => return,
            },
            PostCleanAction::RemoveElements { selector } => remove_elements(&ctx.html, selector),
            PostCleanAction::UnwrapElements { selector } => unwrap_elements(&ctx.html, selector),
        };
        ctx.html = rewritten;
    }
}

fn promote_lazy_images(html: &str) -> String {
    rewrite_html!(html, [lol_html::element!("img", |el| {
        let lazy = LAZY_SRC_ATTRS
            .iter()
            .find_map(|attr| el.get_attribute(attr).filter(|v| !v.trim().is_empty() && !v.starts_with("data:")));
        if let Some(src) = lazy {
            el.set_attribute("src", src.trim())?;
        }
        Ok(())
    })])
}

fn absolutize_urls(html: &str, base: &Url) -> String {
    rewrite_html!(html, [
        lol_html::element!("a[href]", |el| {
            if let Some(href) = el.get_attribute("href")
                && let Some(absolute) = resolve(base, &href)
            {
                el.set_attribute("href", &absolute)?;
            }
            Ok(())
        }),
        lol_html::element!("img[src]", |el| {
            if let Some(src) = el.get_attribute("src")
                && let Some(absolute) = resolve(base, &src)
            {
                el.set_attribute("src", &absolute)?;
            }
            Ok(())
        }),
    ])
}

fn resolve(base: &Url, reference: &str) -> Option<String> {
    let reference = reference.trim();
    if reference.is_empty() || reference.starts_with('#') || reference.starts_with("data:") {
        return None;
    }
    base.join(reference).ok().map(String::from)
}

fn remove_elements(html: &str, selector: &ElementSelector) -> String {
    rewrite_html!(html, [lol_html::element!(selector.as_str(), |el| {
        el.remove();
        Ok(())
    })])
}

fn unwrap_elements(html: &str, selector: &ElementSelector) -> String {
    rewrite_html!(html, [lol_html::element!(selector.as_str(), |el| {
        el.remove_and_keep_content();
        Ok(())
    })])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::Rule;

    fn run(action: &str, html: &str, base: Option<&str>) -> String {
        let action: PostCleanAction = serde_json::from_str(action).unwrap();
        let rule = Rule::default();
        let mut ctx = ActionContext::new(&rule, base.map(|b| Url::parse(b).unwrap())).with_html(html);
        action.apply(&mut ctx);
        ctx.html
    }

    #[test]
    fn test_promote_lazy_images() {
        let out = run(
            r#"{"action": "promote_lazy_images"}"#,
            r#"<p><img src="spacer.gif" data-original="/real.jpg"></p>"#,
            None,
        );
        assert!(out.contains(r#"src="/real.jpg""#));
    }

    #[test]
    fn test_absolutize_urls() {
        let out = run(
            r#"{"action": "absolutize_urls"}"#,
            r##"<a href="/about">About</a><a href="#top">Top</a><img src="img/a.png">"##,
            Some("https://example.com/blog/post.html"),
        );
        assert!(out.contains(r#"href="https://example.com/about""#));
        assert!(out.contains(r##"href="#top""##));
        assert!(out.contains(r#"src="https://example.com/blog/img/a.png""#));
    }

    #[test]
    fn test_absolutize_without_base_is_noop() {
        let html = r#"<a href="/about">About</a>"#;
        assert_eq!(run(r#"{"action": "absolutize_urls"}"#, html, None), html);
    }

    #[test]
    fn test_remove_and_unwrap_elements() {
        let html = r#"<div class="share">Share this</div><span class="x">kept <b>text</b></span>"#;
        let removed = run(r#"{"action": "remove_elements", "selector": "div.share"}"#, html, None);
        assert!(!removed.contains("Share this"));
        let unwrapped = run(r#"{"action": "unwrap_elements", "selector": "span.x"}"#, html, None);
        assert!(unwrapped.contains("kept <b>text</b>"));
        assert!(!unwrapped.contains("<span"));
    }

    #[test]
    fn test_invalid_selector_fails_to_load() {
        assert!(serde_json::from_str::<PostCleanAction>(r#"{"action": "remove_elements", "selector": "div["}"#).is_err());
    }
}
