//! The value returned by a successful fetch.

use std::borrow::Cow;

use chrono::{DateTime, Utc};

/// Response body and metadata of a completed fetch.
///
/// `url` and `final_url` are sanitized so the result can be persisted as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResult {
    /// Raw response body
    pub content: Vec<u8>,
    /// `Content-Type` header (defaults to `text/html` when the origin omits it)
    pub content_type: String,
    /// HTTP status of the final response
    pub status_code: u16,
    /// Requested URL
    pub url: String,
    /// URL after redirects
    pub final_url: String,
    /// When the response was received
    pub retrieved_at: DateTime<Utc>,
    /// Response headers in arrival order, values grouped per lower-cased name
    pub headers: Vec<(String, Vec<String>)>,
}

impl FetchResult {
    pub fn is_html(&self) -> bool {
        self.content_type.to_ascii_lowercase().contains("text/html")
    }

    pub fn is_json(&self) -> bool {
        self.content_type
            .to_ascii_lowercase()
            .contains("application/json")
    }

    pub fn was_redirected(&self) -> bool {
        self.url != self.final_url
    }

    /// Body decoded as UTF-8 (invalid sequences replaced).
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.content)
    }

    /// First value of the named header (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.header_values(name).first().map(String::as_str)
    }

    /// All values of the named header (case-insensitive).
    pub fn header_values(&self, name: &str) -> &[String] {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, values)| values.as_slice())
            .unwrap_or(&[])
    }
}
