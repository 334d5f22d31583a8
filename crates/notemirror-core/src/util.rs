//! Small text helpers shared by the HTTP adapter and the CLI.

/// Longest remote error body kept in an [`Error::Remote`](crate::Error::Remote) message.
pub const ERROR_BODY_LIMIT: usize = 180;

/// Trimmed text, or `None` for a missing or blank value.
pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Whether a configured store URL names an HTTP(S) endpoint.
pub fn is_http_url(value: &str) -> bool {
    ["http://", "https://"]
        .iter()
        .any(|scheme| value.starts_with(scheme))
}

/// Flatten a response body onto one line and cap it at [`ERROR_BODY_LIMIT`] chars.
///
/// Store errors often come back as HTML pages, so runs of whitespace
/// (newlines included) collapse to a single space.
pub fn compact_text(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(ERROR_BODY_LIMIT)
        .collect()
}
