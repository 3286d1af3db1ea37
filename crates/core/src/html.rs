//! Small HTML text utilities shared by the pipeline stages.

use std::sync::LazyLock;

use regex::Regex;

static OPENING_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^<([A-Za-z][A-Za-z0-9:-]*)").unwrap());

/// Runs one lol_html pass over `$html` with the given element handlers,
/// returning the input unchanged if the rewriter rejects it.
macro_rules! rewrite_html {
    ($html:expr, [$($handler:expr),+ $(,)?]) => {{
        let html: &str = $html;
        let mut output = Vec::with_capacity(html.len());
        let mut rewriter = lol_html::HtmlRewriter::new(
            lol_html::Settings { element_content_handlers: vec![$($handler),+], ..Default::default() },
            |c: &[u8]| output.extend_from_slice(c),
        );
        let finished = match rewriter.write(html.as_bytes()) {
            Ok(()) => rewriter.end(),
            Err(e) => Err(e),
        };
        match finished {
            Ok(()) => String::from_utf8(output).unwrap_or_else(|_| html.to_string()),
            Err(_) => html.to_string(),
        }
    }};
}

pub(crate) use rewrite_html;

/// Removes every `<img>` element.
pub fn strip_images(html: &str) -> String {
    rewrite_html!(html, [lol_html::element!("img", |el| {
        el.remove();
        Ok(())
    })])
}

/// Collapses runs of whitespace into single spaces and trims the ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncates to at most `max` characters.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}

/// Given the byte span of an opening tag inside `html`, returns the inner
/// HTML of that element by counting nested open/close tags of the same name.
///
/// Self-closing tags are not counted. An element that is never closed runs
/// to the end of the document.
pub fn balanced_inner(html: &str, open_start: usize, open_end: usize) -> Option<&str> {
    let opening = html.get(open_start..open_end)?;
    if opening.trim_end().ends_with("/>") {
        return None;
    }
    let tag = OPENING_TAG.captures(opening)?.get(1)?.as_str();
    let tokens = Regex::new(&format!(r"(?i)</?{}(?:\s[^>]*)?/?>", regex::escape(tag))).ok()?;

    let mut depth = 1usize;
    for token in tokens.find_iter(&html[open_end..]) {
        let text = token.as_str();
        if text.starts_with("</") {
            depth -= 1;
            if depth == 0 {
                return Some(&html[open_end..open_end + token.start()]);
            }
        } else if !text.ends_with("/>") {
            depth += 1;
        }
    }
    Some(&html[open_end..])
}
