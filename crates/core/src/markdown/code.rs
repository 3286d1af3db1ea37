use std::sync::LazyLock;

use regex::Regex;
use scraper::ElementRef;

static EXPLICIT_LANGUAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:language|lang|brush)[:\s-]+([a-z0-9+#]+)").unwrap());
static TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[a-z0-9+#]+").unwrap());
static SINGLE_TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-z0-9+#]+$").unwrap());

const LANGUAGE_ATTRIBUTES: &[&str] = &["data-lang", "data-language", "lang"];

/// Class tokens recognised as a language when no explicit marker exists,
/// checked in this order.
const TOKEN_ALIASES: &[(&str, &str)] = &[
    ("java", "java"),
    ("kotlin", "kotlin"),
    ("python", "python"),
    ("py", "python"),
    ("javascript", "javascript"),
    ("js", "javascript"),
    ("typescript", "typescript"),
    ("ts", "typescript"),
    ("bash", "bash"),
    ("shell", "bash"),
    ("sh", "bash"),
    ("json", "json"),
    ("xml", "xml"),
    ("html", "html"),
    ("sql", "sql"),
    ("go", "go"),
    ("golang", "go"),
    ("rust", "rust"),
    ("csharp", "csharp"),
    ("cpp", "cpp"),
    ("yaml", "yaml"),
];

/// Best-effort language for a `<pre>` block from the attributes of the block
/// and its first `<code>` child. Returns `None` for unmarked blocks.
pub fn detect_language(pre: ElementRef<'_>) -> Option<String> {
    let code = pre.children().filter_map(ElementRef::wrap).find(|c| c.value().name() == "code");
    let elements: Vec<ElementRef<'_>> = std::iter::once(pre).chain(code).collect();

    if let Some(language) = elements.iter().find_map(|element| language_attribute(*element)) {
        return Some(language);
    }

    let classes = elements
        .iter()
        .filter_map(|element| element.value().attr("class"))
        .collect::<Vec<_>>()
        .join(" ");
    language_from_classes(&classes)
}

/// A single-token `data-lang`/`data-language`/`lang` value is taken as given.
fn language_attribute(element: ElementRef<'_>) -> Option<String> {
    LANGUAGE_ATTRIBUTES
        .iter()
        .filter_map(|attr| element.value().attr(attr))
        .map(|value| value.trim().to_lowercase())
        .find(|value| SINGLE_TOKEN.is_match(value))
        .map(|value| normalize(&value))
}

pub(crate) fn language_from_classes(classes: &str) -> Option<String> {
    let classes = classes.to_lowercase();
    if classes.trim().is_empty() {
        return None;
    }
    if let Some(caps) = EXPLICIT_LANGUAGE.captures(&classes) {
        return Some(normalize(&caps[1]));
    }
    let tokens: Vec<&str> = TOKEN.find_iter(&classes).map(|m| m.as_str()).collect();
    TOKEN_ALIASES
        .iter()
        .find(|(alias, _)| tokens.contains(alias))
        .map(|(_, language)| language.to_string())
}

fn normalize(language: &str) -> String {
    match language {
        "js" => "javascript",
        "ts" => "typescript",
        "shell" | "sh" => "bash",
        "c#" | "cs" => "csharp",
        "c++" => "cpp",
        "py" => "python",
        "golang" => "go",
        other => other,
    }
    .to_string()
}
