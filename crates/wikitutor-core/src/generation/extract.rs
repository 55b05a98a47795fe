//! Lenient recovery of JSON embedded in generated text
//!
//! The generation prompts ask for bare JSON but models wrap it in prose,
//! code fences, or leave trailing commas. Recovery is an outer-bracket scan
//! plus a few textual fixes; it is not a general repair parser and it
//! misreads values containing unescaped literal brackets.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

static TRAILING_COMMA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*([}\]])").expect("valid trailing comma regex"));
static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Recover a JSON object or array from free-form text.
///
/// Scans for the first `{` and last `}`, falling back to the first `[` and
/// last `]` only when either brace is missing. A brace pair in the wrong
/// order still counts as found and yields nothing. Within the slice, commas
/// before a closing bracket are removed and whitespace runs collapse to one
/// space. Escape sequences are left for the JSON parser.
pub fn extract_structured(text: &str) -> Option<Value> {
    let Some(slice) = outer_slice(text) else {
        warn!("No JSON object or array found in generated text");
        return None;
    };

    let cleaned = TRAILING_COMMA_RE.replace_all(slice, "$1");
    let cleaned = WHITESPACE_RE.replace_all(&cleaned, " ");
    let cleaned = cleaned.trim();

    match serde_json::from_str(cleaned) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(error = %e, "Failed to parse JSON recovered from generated text");
            debug!(json = %cleaned, "Recovered text");
            None
        }
    }
}

fn outer_slice(text: &str) -> Option<&str> {
    let (start, end) = bracket_span(text, '{', '}').or_else(|| bracket_span(text, '[', ']'))?;
    Some(if start <= end { &text[start..=end] } else { "" })
}

/// Byte positions of the first `open` and the last `close`. An inverted
/// pair (close before open) is still a pair.
fn bracket_span(text: &str, open: char, close: char) -> Option<(usize, usize)> {
    Some((text.find(open)?, text.rfind(close)?))
}
