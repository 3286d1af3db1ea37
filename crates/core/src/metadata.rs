use std::sync::LazyLock;

use scraper::Selector;
use serde_json::Value;

use crate::Document;
use crate::html::normalize_whitespace;

static JSON_LD: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"script[type="application/ld+json"]"#).unwrap());
static H1: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1").unwrap());

impl Document {
    /// Extract title with priority fallback:
    /// 1. JSON-LD `headline` (also inside `@graph` and top-level arrays)
    /// 2. Open Graph `og:title`
    /// 3. Twitter `twitter:title`
    /// 4. `<title>` element
    /// 5. First non-empty `<h1>`
    pub fn extract_title(&self) -> Option<String> {
        if let Some(headline) = self.json_ld_headline() {
            return Some(headline);
        }

        if let Some(title) = self.meta_content("og:title") {
            return Some(title);
        }

        if let Some(title) = self.meta_content("twitter:title") {
            return Some(title);
        }

        if let Some(title) = self.title() {
            return Some(title);
        }

        self.first_text(&H1)
    }

    /// Get meta tag content by name or property attribute
    pub(crate) fn meta_content(&self, key: &str) -> Option<String> {
        let selector = Selector::parse(&format!(r#"meta[name="{0}"], meta[property="{0}"]"#, key)).ok()?;
        self.select(&selector)
            .filter_map(|el| el.value().attr("content"))
            .map(normalize_whitespace)
            .find(|content| !content.is_empty())
    }

    fn json_ld_headline(&self) -> Option<String> {
        self.select(&JSON_LD)
            .filter_map(|el| serde_json::from_str::<Value>(el.text().collect::<String>().trim()).ok())
            .find_map(|value| headline_in(&value))
    }
}

fn headline_in(value: &Value) -> Option<String> {
    match value {
        Value::Array(items) => items.iter().find_map(headline_in),
        Value::Object(map) => {
            if let Some(headline) = map.get("headline").and_then(Value::as_str) {
                let headline = normalize_whitespace(headline);
                if !headline.is_empty() {
                    return Some(headline);
                }
            }
            map.get("@graph").and_then(headline_in)
        }
        _ => None,
    }
}
