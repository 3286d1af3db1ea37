use std::collections::HashSet;
use std::sync::LazyLock;

use scraper::{Html, Selector};
use url::Url;

use crate::rules::Rule;

static IMG_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img").unwrap());

const SOURCE_ATTRS: &[&str] = &["src", "data-src", "data-original", "data-lazy-src"];

/// Absolute image URLs from `html` in document order, filtered by the rule's
/// drop keywords and capped at its `max_images`.
pub fn collect_images(html: &str, base: Option<&Url>, rule: &Rule) -> Vec<String> {
    if rule.max_images == 0 {
        return Vec::new();
    }

    let fragment = Html::parse_fragment(html);
    let mut seen = HashSet::new();

    fragment
        .select(&IMG_SELECTOR)
        .filter_map(|img| {
            SOURCE_ATTRS
                .iter()
                .filter_map(|attr| img.value().attr(attr))
                .map(str::trim)
                .find(|src| !src.is_empty() && !src.starts_with("data:"))
        })
        .filter_map(|src| absolute_http_url(src, base))
        .filter(|url| seen.insert(url.clone()))
        .filter(|url| {
            let lowered = url.to_lowercase();
            !rule.image_drop_keywords.iter().any(|k| lowered.contains(k.as_str()))
        })
        .take(rule.max_images)
        .collect()
}

fn absolute_http_url(src: &str, base: Option<&Url>) -> Option<String> {
    let url = match base {
        Some(base) => base.join(src).ok()?,
        None => Url::parse(src).ok()?,
    };
    matches!(url.scheme(), "http" | "https").then(|| url.to_string())
}
