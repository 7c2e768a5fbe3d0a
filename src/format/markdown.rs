//! Markdown stripping for generated narrative text.
//!
//! Each pass is a `&str -> String` function. The passes run in sequence and the
//! whole pipeline repeats until the text stops changing. Every pass either
//! leaves its input alone or makes it strictly shorter, so the loop terminates.
//! Its output is a fixed point, which makes [`strip_markdown`] idempotent.

use regex::Regex;
use std::sync::LazyLock;

/// Remove markdown formatting from narrative text.
///
/// Strips `[GENERATED]` prefixes and heading markers. Emphasis markers
/// (`**bold**`, `*italic*`, `__bold__`, `_italic_`) are removed, keeping
/// their text. Escaped characters (`\#`, `\*`, `\_`) are unescaped. Runs of
/// three or more newlines collapse to two, and the result is trimmed.
///
/// ```
/// use memofill::format::strip_markdown;
///
/// let text = "## Overview\n\n\n\nThe **subject** is a _retail_ center.";
/// assert_eq!(strip_markdown(text), "Overview\n\nThe subject is a retail center.");
/// assert_eq!(strip_markdown(&strip_markdown(text)), strip_markdown(text));
/// ```
pub fn strip_markdown(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let next = run_passes(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn run_passes(text: &str) -> String {
    let mut result = strip_generated_prefix(text);
    result = unescape_markers(&result);
    result = strip_headings(&result);
    result = strip_emphasis(&result);
    result = collapse_blank_lines(&result);
    result.trim().to_string()
}

fn strip_generated_prefix(text: &str) -> String {
    static GENERATED_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^\s*\[GENERATED\]\s*").expect("valid regex"));

    GENERATED_RE.replace(text, "").into_owned()
}

fn unescape_markers(text: &str) -> String {
    text.replace("\\#", "#").replace("\\*", "*").replace("\\_", "_")
}

/// Remove leading `#` runs at the start of each line, including stacked ones like `## #`.
fn strip_headings(text: &str) -> String {
    static HEADING_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?m)^[ \t]*(?:#+[ \t]*)+").expect("valid regex"));

    HEADING_RE.replace_all(text, "").into_owned()
}

fn strip_emphasis(text: &str) -> String {
    static STAR_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\*{1,2}([^*\n]+)\*{1,2}").expect("valid regex"));
    // Underscores inside identifiers like deal_id_value are left alone
    static UNDERSCORE_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(^|[^\w])_{1,2}([^_\n]+?)_{1,2}($|[^\w])").expect("valid regex")
    });

    let result = STAR_RE.replace_all(text, "$1");
    UNDERSCORE_RE.replace_all(&result, "$1$2$3").into_owned()
}

fn collapse_blank_lines(text: &str) -> String {
    static MULTI_BLANK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

    MULTI_BLANK_RE.replace_all(text, "\n\n").into_owned()
}
