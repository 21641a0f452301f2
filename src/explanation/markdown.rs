//! Minimal markdown-to-HTML for explanations.
//!
//! Only `**bold**`, `*italic*` and line breaks become markup; every other tag
//! is escaped by [`sanitize_html`].

use once_cell::sync::Lazy;
use regex::Regex;

/// Tags that survive sanitizing, without attributes.
pub const ALLOWED_TAGS: [&str; 3] = ["strong", "em", "br"];

static BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.+?)\*\*").expect("valid bold pattern"));
static ITALIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*(.+?)\*").expect("valid italic pattern"));
static NEWLINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\r\n|\r|\n").expect("valid newline pattern"));
static ESCAPED_ALLOWED_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)&lt;(/?)({})&gt;",
        ALLOWED_TAGS.join("|")
    ))
    .expect("valid allowed-tag pattern")
});

/// Escape every `<` and `>`, then restore bare allow-listed tags.
///
/// `<strong>` comes back; `<strong class="x">` and `<script>` stay escaped.
pub fn sanitize_html(html: &str) -> String {
    let escaped = html.replace('<', "&lt;").replace('>', "&gt;");
    ESCAPED_ALLOWED_TAG
        .replace_all(&escaped, |caps: &regex::Captures<'_>| {
            format!("<{}{}>", &caps[1], caps[2].to_ascii_lowercase())
        })
        .into_owned()
}

/// Render bold, italic and line breaks, then sanitize the result.
pub fn render_inline(markdown: &str) -> String {
    let html = BOLD.replace_all(markdown, "<strong>$1</strong>");
    let html = ITALIC.replace_all(&html, "<em>$1</em>");
    let html = NEWLINE.replace_all(&html, "<br>");
    sanitize_html(&html)
}

/// Wrap whole-word, case-insensitive occurrences of `word` in `<strong>`.
///
/// The sentence is sanitized first, so the result is safe to embed.
pub fn highlight_word(sentence: &str, word: &str) -> String {
    let sanitized = sanitize_html(sentence);
    let word = word.trim();
    if word.is_empty() {
        return sanitized;
    }

    let pattern = format!(r"(?i)\b{}\b", regex::escape(&sanitize_html(word)));
    match Regex::new(&pattern) {
        Ok(re) => re
            .replace_all(&sanitized, |caps: &regex::Captures<'_>| {
                format!("<strong>{}</strong>", &caps[0])
            })
            .into_owned(),
        Err(_) => sanitized,
    }
}
