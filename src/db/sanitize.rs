//! Statement text normalization.
//!
//! Used by the batch runner to decide whether a submitted statement is
//! effectively empty.

use regex::Regex;
use std::sync::LazyLock;

/// Runs of newlines and tabs, collapsed to a single space.
static CONTROL_RUNS: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new("[\n\t]+").ok());

/// Collapses every run of newline/tab characters into one space and trims
/// leading and trailing spaces.
///
/// If the pattern cannot be compiled the statement is reported as empty
/// (an empty string is returned) rather than surfacing an error. Only the
/// space character is trimmed; other whitespace such as `\r` is kept.
pub fn clean(text: &str) -> String {
    match CONTROL_RUNS.as_ref() {
        Some(pattern) => pattern.replace_all(text, " ").trim_matches(' ').to_string(),
        None => String::new(),
    }
}

/// Returns true if the statement has nothing left after [`clean`].
pub fn is_blank(text: &str) -> bool {
    clean(text).is_empty()
}
