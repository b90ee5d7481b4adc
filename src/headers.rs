//! Pagination metadata reported in backing-service response headers
//!
//! Offset paginated REST services return one page in the body and the size of
//! the whole collection in a header.

use axum::http::HeaderMap;

/// Header carrying the total number of items in the collection
pub const TOTAL_COUNT_HEADER: &str = "x-total-count";

/// Extract the total item count from the x-total-count header
pub fn extract_total_count(headers: &HeaderMap) -> Option<usize> {
    extract_count(headers, TOTAL_COUNT_HEADER)
}

/// Extract a non-negative count from an arbitrary header
///
/// # Example
///
/// ```rust
/// use axum::http::HeaderMap;
/// use pleme_graphql_relay::headers::extract_count;
///
/// let mut headers = HeaderMap::new();
/// headers.insert("x-artwork-count", "17".parse().unwrap());
/// assert_eq!(extract_count(&headers, "x-artwork-count"), Some(17));
/// ```
pub fn extract_count(headers: &HeaderMap, name: &str) -> Option<usize> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<usize>().ok())
}
