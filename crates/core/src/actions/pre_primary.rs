use std::collections::HashSet;
use std::sync::LazyLock;

use html_escape::encode_text;
use scraper::{Html, Selector};
use serde::Deserialize;
use serde_json::Value;

use crate::parse::Document;
use crate::rules::QuerySelector;

static JSON_LD_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"script[type="application/ld+json"]"#).unwrap());

const ARTICLE_TYPES: &[&str] = &["Article", "NewsArticle", "BlogPosting", "Report", "TechArticle"];

/// Shorter descriptions are usually slogans, not summaries.
const MIN_DESCRIPTION_CHARS: usize = 40;

/// Actions that build a synthetic content fragment straight from the raw
/// page, bypassing container matching when they succeed.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PrePrimaryAction {
    /// Reads a JavaScript object literal embedded after `marker`
    /// (e.g. `window.__PRELOADED_STATE__ =`) and renders its text nodes.
    EmbeddedJson {
        marker: String,
        #[serde(default)]
        title_pointer: Option<String>,
        #[serde(default)]
        body_pointer: Option<String>,
        #[serde(default = "default_text_key")]
        text_key: String,
    },
    /// Renders `headline` and `articleBody` from schema.org JSON-LD.
    JsonLdArticle,
    /// Renders the `og:description` (else `description`) meta tag as a
    /// single paragraph.
    MetaDescription,
    /// Renders each post of a forum thread, optionally under its author.
    RepeatedPosts {
        post_selector: QuerySelector,
        #[serde(default)]
        author_selector: Option<QuerySelector>,
        #[serde(default = "default_post_limit")]
        limit: usize,
    },
}

fn default_text_key() -> String {
    "text".to_string()
}

fn default_post_limit() -> usize {
    220
}

impl PrePrimaryAction {
    pub fn name(&self) -> &'static str {
        match self {
            PrePrimaryAction::EmbeddedJson { .. } => "embedded_json",
            PrePrimaryAction::JsonLdArticle => "json_ld_article",
            PrePrimaryAction::MetaDescription => "meta_description",
            PrePrimaryAction::RepeatedPosts { .. } => "repeated_posts",
        }
    }

    /// Returns a synthetic HTML fragment, or `None` when the page doesn't
    /// carry what this action looks for.
    pub fn extract(&self, html: &str) -> Option<String> {
        let fragment = match self {
            PrePrimaryAction::EmbeddedJson { marker, title_pointer, body_pointer, text_key } => {
                embedded_json(html, marker, title_pointer.as_deref(), body_pointer.as_deref(), text_key)
            }
            PrePrimaryAction::JsonLdArticle => json_ld_article(html),
            PrePrimaryAction::MetaDescription => meta_description(html),
            PrePrimaryAction::RepeatedPosts { post_selector, author_selector, limit } => {
                repeated_posts(html, post_selector, author_selector.as_ref(), *limit)
            }
        }?;
        if fragment.trim().is_empty() { None } else { Some(fragment) }
    }
}

fn embedded_json(
    html: &str, marker: &str, title_pointer: Option<&str>, body_pointer: Option<&str>, text_key: &str,
) -> Option<String> {
    let literal = object_after_marker(html, marker)?;
    let state: Value = serde_json::from_str(literal).ok()?;

    let body = match body_pointer {
        Some(pointer) => state.pointer(pointer)?,
        None => &state,
    };
    let mut texts = Vec::new();
    collect_strings(body, text_key, &mut texts);

    let paragraphs = paragraphs_from(texts.iter().map(String::as_str));
    if paragraphs.is_empty() {
        return None;
    }

    let mut fragment = String::new();
    if let Some(title) = title_pointer.and_then(|p| state.pointer(p)).and_then(Value::as_str)
        && !title.trim().is_empty()
    {
        fragment.push_str(&format!("<h2>{}</h2>\n", encode_text(title.trim())));
    }
    fragment.push_str(&paragraphs);
    Some(fragment)
}

/// Slices the balanced `{...}` literal that follows `marker`, honouring
/// string literals and escapes.
fn object_after_marker<'a>(html: &'a str, marker: &str) -> Option<&'a str> {
    let after = html.find(marker)? + marker.len();
    let start = after + html[after..].find('{')?;

    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (offset, ch) in html[start..].char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' => quote = Some(ch),
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&html[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

fn collect_strings(value: &Value, key: &str, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                match v {
                    Value::String(s) if k == key => out.push(s.clone()),
                    _ => collect_strings(v, key, out),
                }
            }
        }
        Value::Array(items) => items.iter().for_each(|item| collect_strings(item, key, out)),
        _ => {}
    }
}

/// One `<p>` per distinct non-empty line.
fn paragraphs_from<'a>(texts: impl Iterator<Item = &'a str>) -> String {
    let mut seen = HashSet::new();
    let mut out = String::new();
    for line in texts.flat_map(str::lines) {
        let line = line.trim();
        if line.is_empty() || !seen.insert(line.to_string()) {
            continue;
        }
        out.push_str(&format!("<p>{}</p>\n", encode_text(line)));
    }
    out
}

fn json_ld_article(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    document
        .select(&JSON_LD_SELECTOR)
        .filter_map(|script| serde_json::from_str::<Value>(&script.text().collect::<String>()).ok())
        .find_map(|value| find_article(&value).and_then(render_json_ld))
}

fn find_article(value: &Value) -> Option<&Value> {
    match value {
        Value::Array(items) => items.iter().find_map(find_article),
        Value::Object(map) => {
            if is_article_type(map.get("@type")) {
                return Some(value);
            }
            map.get("@graph").and_then(find_article)
        }
        _ => None,
    }
}

fn is_article_type(kind: Option<&Value>) -> bool {
    match kind {
        Some(Value::String(s)) => ARTICLE_TYPES.contains(&s.as_str()),
        Some(Value::Array(kinds)) => kinds.iter().any(|k| is_article_type(Some(k))),
        _ => false,
    }
}

fn render_json_ld(article: &Value) -> Option<String> {
    let body = article.get("articleBody").and_then(Value::as_str)?;
    let paragraphs = paragraphs_from(std::iter::once(body));
    if paragraphs.is_empty() {
        return None;
    }

    let mut fragment = String::new();
    if let Some(headline) = article.get("headline").and_then(Value::as_str)
        && !headline.trim().is_empty()
    {
        fragment.push_str(&format!("<h2>{}</h2>\n", encode_text(headline.trim())));
    }
    fragment.push_str(&paragraphs);
    Some(fragment)
}

fn meta_description(html: &str) -> Option<String> {
    let document = Document::parse(html);
    ["og:description", "description"]
        .iter()
        .filter_map(|key| document.meta_content(key))
        .find(|text| text.chars().count() >= MIN_DESCRIPTION_CHARS)
        .map(|text| format!("<p>{}</p>\n", encode_text(&text)))
}

fn repeated_posts(html: &str, post: &QuerySelector, author: Option<&QuerySelector>, limit: usize) -> Option<String> {
    let document = Html::parse_document(html);
    let mut fragment = String::new();

    for element in document.select(post).take(limit) {
        let body = element.inner_html();
        if element.text().all(|t| t.trim().is_empty()) {
            continue;
        }
        if let Some(author_selector) = author
            && let Some(name) = element.select(author_selector).next()
        {
            let name = name.text().collect::<String>();
            let name = name.trim();
            if !name.is_empty() {
                fragment.push_str(&format!("<h3>{}</h3>\n", encode_text(name)));
            }
        }
        fragment.push_str(&format!("<div>{}</div>\n", body));
    }

    if fragment.is_empty() { None } else { Some(fragment) }
}
