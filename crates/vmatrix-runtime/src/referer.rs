//! Finding the view being configured from a request referer.
//!
//! Name validation requests arrive without the view in the query, so
//! the view is recovered from the configure page URL:
//!
//! ```text
//! http://host/view/ops/view/nightly%20builds/configure  →  ops/nightly builds
//! ```

use regex::Regex;
use std::sync::OnceLock;

const REFERER_PATTERN: &str = r"^.+?((/view/[^/]+)+)/configure$";

fn referer_regex() -> Option<&'static Regex> {
    static REFERER: OnceLock<Option<Regex>> = OnceLock::new();
    REFERER
        .get_or_init(|| Regex::new(REFERER_PATTERN).ok())
        .as_ref()
}

/// Extracts the (possibly nested) view path from a configure URL.
///
/// Returns `None` if the URL is not a view configure page or its path
/// does not decode to UTF-8.
///
/// # Example
///
/// ```
/// use vmatrix_runtime::view_from_referer;
///
/// assert_eq!(
///     view_from_referer("http://ci/view/ops/view/nightly/configure").as_deref(),
///     Some("ops/nightly")
/// );
/// assert_eq!(view_from_referer("http://ci/job/build/configure"), None);
/// ```
#[must_use]
pub fn view_from_referer(referer: &str) -> Option<String> {
    let captures = referer_regex()?.captures(referer)?;
    let path = captures.get(1)?.as_str().replace("/view/", "/");
    let decoded = percent_decode(&path)?;
    decoded.strip_prefix('/').map(str::to_string)
}

// `%XX` escapes only; `+` is kept as is.
fn percent_decode(input: &str) -> Option<String> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes.get(i + 1..i + 3).filter(|h| h.iter().all(u8::is_ascii_hexdigit))?;
            let hex = std::str::from_utf8(hex).ok()?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}
