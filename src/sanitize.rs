//! Credential stripping for URLs that are logged or persisted.
//!
//! Query parameters named `apikey` or `api_key` (any case) are removed; every
//! other part of the URL, including the encoding of the remaining parameters
//! and the fragment, is kept byte-for-byte.

use url::form_urlencoded;

use crate::config::SENSITIVE_QUERY_KEYS;

/// Returns `url` with credential-bearing query parameters removed.
///
/// Works on absolute and relative URLs alike; input without a query string is
/// returned unchanged.
///
/// # Examples
///
/// ```
/// use source_fetch::sanitize;
///
/// assert_eq!(
///     sanitize("https://financialmodelingprep.com/stable/quote?symbol=XOM&apikey=SECRET"),
///     "https://financialmodelingprep.com/stable/quote?symbol=XOM"
/// );
/// assert_eq!(sanitize("https://example.com/a?API_KEY=x#top"), "https://example.com/a#top");
/// ```
pub fn sanitize(url: &str) -> String {
    let (without_fragment, fragment) = match url.split_once('#') {
        Some((head, fragment)) => (head, Some(fragment)),
        None => (url, None),
    };

    let Some((base, query)) = without_fragment.split_once('?') else {
        return url.to_string();
    };

    let kept: Vec<&str> = query
        .split('&')
        .filter(|pair| !pair.is_empty() && !is_sensitive_pair(pair))
        .collect();

    let mut out = String::with_capacity(url.len());
    out.push_str(base);
    if !kept.is_empty() {
        out.push('?');
        out.push_str(&kept.join("&"));
    }
    if let Some(fragment) = fragment {
        out.push('#');
        out.push_str(fragment);
    }
    out
}

/// Whether a query parameter name carries credentials.
pub fn is_sensitive_key(key: &str) -> bool {
    SENSITIVE_QUERY_KEYS
        .iter()
        .any(|sensitive| key.eq_ignore_ascii_case(sensitive))
}

fn is_sensitive_pair(pair: &str) -> bool {
    form_urlencoded::parse(pair.as_bytes())
        .next()
        .map(|(key, _)| is_sensitive_key(&key))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removes_apikey_query_param() {
        let url = "https://financialmodelingprep.com/stable/income-statement?symbol=XOM&period=annual&apikey=SECRET";
        let sanitized = sanitize(url);
        assert!(!sanitized.contains("apikey="));
        assert!(sanitized.contains("symbol=XOM"));
        assert!(sanitized.contains("period=annual"));
    }

    #[test]
    fn test_removes_api_key_snake_case_param() {
        let sanitized = sanitize("https://api.eia.gov/v2/seriesid/PET.WCRSTUS1.W?api_key=SECRET&foo=bar");
        assert_eq!(sanitized, "https://api.eia.gov/v2/seriesid/PET.WCRSTUS1.W?foo=bar");
    }

    #[test]
    fn test_key_match_is_case_insensitive() {
        assert_eq!(
            sanitize("https://example.com/x?ApiKey=1&API_KEY=2&q=3"),
            "https://example.com/x?q=3"
        );
    }

    #[test]
    fn test_percent_encoded_key_is_recognized() {
        assert_eq!(
            sanitize("https://example.com/x?api%5Fkey=1&q=3"),
            "https://example.com/x?q=3"
        );
    }

    #[test]
    fn test_preserves_structure() {
        let url = "http://user@example.com:8080/a/b?x=1%202&y=&z#frag";
        assert_eq!(sanitize(url), url);
    }

    #[test]
    fn test_drops_question_mark_when_only_credentials() {
        assert_eq!(
            sanitize("https://example.com/path?apikey=SECRET#anchor"),
            "https://example.com/path#anchor"
        );
    }

    #[test]
    fn test_similar_names_are_kept() {
        assert_eq!(
            sanitize("https://example.com/?apikeys=1&my_api_key=2"),
            "https://example.com/?apikeys=1&my_api_key=2"
        );
    }

    #[test]
    fn test_relative_and_unparseable_input() {
        assert_eq!(sanitize("/v2/data?apikey=x&a=1"), "/v2/data?a=1");
        assert_eq!(sanitize("not a url"), "not a url");
    }

    #[test]
    fn test_idempotent() {
        let once = sanitize("https://example.com/?apikey=1&a=2");
        assert_eq!(sanitize(&once), once);
    }
}
