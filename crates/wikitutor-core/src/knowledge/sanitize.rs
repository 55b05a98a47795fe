//! Cleanup of encyclopedia intro text and link targets

use std::sync::LazyLock;

use regex::Regex;

static FOOTNOTE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\d+\]").expect("valid footnote regex"));
static CITATION_ANCHOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\]\(#cite_note-[^)]+\)").expect("valid citation regex"));
static MARKDOWN_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\([^)]+\)").expect("valid link regex"));
static WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\w+").expect("valid word regex"));
static BOLD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.*?)\*\*").expect("valid bold regex"));
static ITALIC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*(.*?)\*").expect("valid italic regex"));
static CASE_JOIN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([a-z])([A-Z])").expect("valid case-join regex"));
static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));
static DOUBLE_PAREN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\)\)+").expect("valid paren regex"));

/// Turn extracted intro text into plain prose.
pub fn sanitize_intro(text: &str) -> String {
    if text.trim().is_empty() {
        return String::new();
    }

    let text = FOOTNOTE_RE.replace_all(text, "");
    let text = CITATION_ANCHOR_RE.replace_all(&text, "");
    let text = MARKDOWN_LINK_RE.replace_all(&text, "$1");
    let text = collapse_repeated_words(&text);
    let text = BOLD_RE.replace_all(&text, "$1");
    let text = ITALIC_RE.replace_all(&text, "$1");
    let text = text.replace(['"', '\''], "");
    let text = CASE_JOIN_RE.replace_all(&text, "$1 $2");
    let text = WHITESPACE_RE.replace_all(&text, " ");
    let text = DOUBLE_PAREN_RE.replace_all(text.trim(), ")");

    percent_decode(&text)
}

/// Drop the second of two identical adjacent words ("Title Title" becomes
/// "Title"). Pairs do not overlap, so a triple keeps two copies.
fn collapse_repeated_words(text: &str) -> String {
    let words: Vec<_> = WORD_RE.find_iter(text).collect();
    let mut out = String::with_capacity(text.len());
    let mut copied = 0;
    let mut i = 0;

    while i + 1 < words.len() {
        let (first, second) = (words[i], words[i + 1]);
        let gap = &text[first.end()..second.start()];
        if first.as_str() == second.as_str()
            && !gap.is_empty()
            && gap.chars().all(char::is_whitespace)
        {
            out.push_str(&text[copied..first.end()]);
            copied = second.end();
            i += 2;
        } else {
            i += 1;
        }
    }

    out.push_str(&text[copied..]);
    out
}

/// Percent-decode link targets, keeping the first occurrence of each.
pub fn sanitize_links<I>(links: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = std::collections::HashSet::new();
    links
        .into_iter()
        .map(|link| percent_decode(&link))
        .filter(|link| !link.is_empty() && seen.insert(link.clone()))
        .collect()
}

/// Undecodable sequences are left as they are.
fn percent_decode(value: &str) -> String {
    urlencoding::decode(value)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| value.to_string())
}
