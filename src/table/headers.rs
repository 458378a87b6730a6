use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_]+").unwrap());
static UNDERSCORES: Lazy<Regex> = Lazy::new(|| Regex::new(r"_+").unwrap());

/// Normalize a header to `snake_case`: whitespace and non-ASCII-word runs
/// become `_`, repeated `_` collapse, edges are stripped, all lowercase.
pub fn snake(name: &str) -> String {
    let s = WHITESPACE.replace_all(name.trim(), "_");
    let s = NON_WORD.replace_all(&s, "_");
    let s = UNDERSCORES.replace_all(&s, "_");
    s.trim_matches('_').to_lowercase()
}
