//! Cache-key normalization.
//!
//! Keys are only ever used for lookups; the link the user actually supplied
//! is recorded untouched.

use crate::consts::HTTP_SCHEME_REGEX;
use crate::models::{Identifier, collapse};

/// Canonicalize a link into its cache key.
///
/// Strips the `http://`/`https://` scheme and a leading `www.`, truncates at
/// the first `?` or `#`, strips a trailing `/` and lowercases. The steps are
/// repeated until nothing changes, which keeps the function idempotent for
/// inputs such as `a//` or `www.www.example.com`.
///
/// ```
/// use crosstune_music::normalize;
///
/// assert_eq!(normalize("https://Example.com/a/?q=1#f"), "example.com/a");
/// assert_eq!(normalize("http://www.example.com/a"), "example.com/a");
/// ```
pub fn normalize(link: &str) -> String {
    let mut current = link.trim().to_string();
    loop {
        let next = normalize_once(&current);
        if next == current {
            return next;
        }
        current = next;
    }
}

fn normalize_once(link: &str) -> String {
    let link = HTTP_SCHEME_REGEX.replace(link, "");
    let link = strip_prefix_ignore_case(&link, "www.");
    let link = match link.find(['?', '#']) {
        Some(index) => &link[..index],
        None => link,
    };
    let link = link.strip_suffix('/').unwrap_or(link);
    link.to_lowercase()
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> &'a str {
    match s.get(..prefix.len()) {
        Some(head) if head.eq_ignore_ascii_case(prefix) => &s[prefix.len()..],
        _ => s,
    }
}

/// Cache key for a bare identifier input, e.g. `isrc:usrc17607839`.
pub fn identifier_key(identifier: &Identifier) -> String {
    format!("{}:{}", identifier.kind(), identifier.value()).to_lowercase()
}

/// Cache key for a title/artist search, e.g. `search:rick astley|never gonna give you up`.
pub fn search_key(artist: &str, title: &str) -> String {
    format!("search:{}|{}", collapse(artist), collapse(title))
}

/// Cache key for links whose identifying segment lives in the query string,
/// which [`normalize`] strips.
pub(crate) fn query_param_key(link: &str, param: &str, id: &str) -> String {
    format!("{}/{}={}", normalize(link), param, id).to_lowercase()
}
