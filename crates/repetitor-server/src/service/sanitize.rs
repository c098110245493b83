//! Text sanitization for user input and third-party search content.

use std::sync::LazyLock;

use regex::Regex;

static SCRIPT_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").expect("script block pattern is valid")
});

static STYLE_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<style\b[^>]*>.*?</style\s*>").expect("style block pattern is valid")
});

static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag pattern is valid"));

static UNSAFE_SCHEME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:javascript|vbscript|data)\s*:").expect("scheme pattern is valid")
});

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Returns `true` for ASCII control characters, including DEL.
#[inline]
fn is_control(c: char) -> bool {
    matches!(c, '\u{0}'..='\u{1f}' | '\u{7f}')
}

/// Keeps at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

/// Trims, removes ASCII control characters and bounds the length of a
/// caller-supplied string.
pub fn sanitize_input(text: &str, max_chars: usize) -> String {
    let stripped: String = text.trim().chars().filter(|c| !is_control(*c)).collect();
    truncate_chars(&stripped, max_chars).to_owned()
}

/// Removes markup, script and style blocks and executable URL schemes,
/// then collapses whitespace.
///
/// Passes repeat until the text stops changing, so nested or split
/// constructs such as `<scr<script></script>ipt>` cannot reassemble.
pub fn strip_markup(text: &str) -> String {
    let mut current: String = text
        .chars()
        .filter(|c| !is_control(*c) || c.is_whitespace())
        .collect();

    loop {
        let next = strip_pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn strip_pass(text: &str) -> String {
    let text = SCRIPT_BLOCK.replace_all(text, "");
    let text = STYLE_BLOCK.replace_all(&text, "");
    let text = HTML_TAG.replace_all(&text, "");
    let text = UNSAFE_SCHEME.replace_all(&text, "");
    let text = WHITESPACE_RUN.replace_all(&text, " ");
    text.trim().to_owned()
}

/// Strips markup from third-party text and bounds its length.
pub fn sanitize_snippet(text: &str, max_chars: usize) -> String {
    let clean = strip_markup(text);
    truncate_chars(&clean, max_chars).trim_end().to_owned()
}
