//! Page loaders for connection resolvers
//!
//! Resolvers receive their loader explicitly (as a struct field, schema data
//! or function argument) instead of reaching for a module-level client, so
//! tests can hand in an in-memory implementation.

use async_graphql::ErrorExtensions;
use async_trait::async_trait;
use axum::http::HeaderMap;
use thiserror::Error;

use crate::headers::extract_total_count;
use crate::page_cursors::PageWindowPolicy;
use crate::pagination::{Connection, ConnectionArgs, PaginationPolicy};

/// A failed call to a backing service
///
/// Converted with [`ErrorExtensions::extend`] it keeps itself as the error
/// source and adds a `statusCode` extension, which is what directive error
/// attribution reads back.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct UpstreamError {
    pub status_code: u16,
    pub message: String,
}

impl UpstreamError {
    pub fn new(status_code: u16, message: impl Into<String>) -> Self {
        Self {
            status_code,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(404, message)
    }
}

impl ErrorExtensions for UpstreamError {
    fn extend(&self) -> async_graphql::Error {
        let status_code = self.status_code;
        async_graphql::Error::new_with_source(self.clone())
            .extend_with(|_, e| e.set("statusCode", status_code))
    }
}

/// One page of domain objects and the size of the whole sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: usize,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total_count: usize) -> Self {
        Self { items, total_count }
    }

    /// Page whose total count comes from the response headers
    ///
    /// Falls back to the number of items when the service did not report one.
    pub fn from_headers(items: Vec<T>, headers: &HeaderMap) -> Self {
        let total_count = extract_total_count(headers).unwrap_or(items.len());
        Self { items, total_count }
    }
}

/// Page loader trait for offset paginated backing services
#[async_trait]
pub trait PageLoader<T>: Send + Sync
where
    T: Send,
{
    /// Load `size` items starting at the zero-based `offset`
    async fn load_page(&self, offset: usize, size: usize) -> async_graphql::Result<Page<T>>;

    /// Size of the whole sequence
    ///
    /// Only needed for `last` without `before`. The default asks for a
    /// single-item page and keeps its total count.
    async fn total_count(&self) -> async_graphql::Result<usize> {
        Ok(self.load_page(0, 1).await?.total_count)
    }
}

/// Normalize `args`, load the page and build the connection
pub async fn load_connection<T, L>(
    loader: &L,
    args: &ConnectionArgs,
    policy: &PaginationPolicy,
    window: &PageWindowPolicy,
) -> async_graphql::Result<Connection<T>>
where
    T: Send,
    L: PageLoader<T> + ?Sized,
{
    let known_total = if args.needs_total_count() {
        Some(loader.total_count().await?)
    } else {
        None
    };

    let pagination = args.resolve(policy, known_total).map_err(|e| e.extend())?;

    tracing::debug!(
        offset = pagination.offset,
        size = pagination.size,
        "loading connection page"
    );
    let page = loader.load_page(pagination.offset, pagination.size).await?;

    Ok(Connection::from_page(&pagination, page.items, page.total_count, window))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::PageCursorCodec;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct VecLoader {
        items: Vec<String>,
        calls: AtomicUsize,
    }

    impl VecLoader {
        fn new(count: usize) -> Self {
            Self {
                items: (0..count).map(|i| format!("item-{i}")).collect(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl PageLoader<String> for VecLoader {
        async fn load_page(&self, offset: usize, size: usize) -> async_graphql::Result<Page<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let items = self.items.iter().skip(offset).take(size).cloned().collect();
            Ok(Page::new(items, self.items.len()))
        }
    }

    struct FailingLoader;

    #[async_trait]
    impl PageLoader<String> for FailingLoader {
        async fn load_page(&self, _offset: usize, _size: usize) -> async_graphql::Result<Page<String>> {
            Err(UpstreamError::new(502, "gravity unavailable").extend())
        }
    }

    async fn load(loader: &VecLoader, args: ConnectionArgs) -> async_graphql::Result<Connection<String>> {
        load_connection(loader, &args, &PaginationPolicy::default(), &PageWindowPolicy::default()).await
    }

    #[tokio::test]
    async fn test_numbered_page() {
        let loader = VecLoader::new(25);
        let conn = load(&loader, ConnectionArgs::numbered(5, 5)).await.unwrap();
        assert_eq!(conn.nodes().cloned().collect::<Vec<_>>(), ["item-20", "item-21", "item-22", "item-23", "item-24"]);
        assert!(!conn.page_info.has_next_page);
        assert_eq!(loader.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_forward_pages_chain_through_end_cursor() {
        let loader = VecLoader::new(7);
        let first = load(&loader, ConnectionArgs::forward(3, None)).await.unwrap();
        let second = load(&loader, ConnectionArgs::forward(3, first.page_info.end_cursor.clone()))
            .await
            .unwrap();
        assert_eq!(second.nodes().next().map(String::as_str), Some("item-3"));
        assert!(second.page_info.has_previous_page);
        assert!(second.page_info.has_next_page);
    }

    #[tokio::test]
    async fn test_last_without_before_asks_for_total() {
        let loader = VecLoader::new(12);
        let conn = load(&loader, ConnectionArgs::backward(5, None)).await.unwrap();
        assert_eq!(conn.nodes().next().map(String::as_str), Some("item-7"));
        assert!(!conn.page_info.has_next_page);
        assert_eq!(loader.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalid_arguments_do_not_hit_the_loader() {
        let loader = VecLoader::new(3);
        let err = load(&loader, ConnectionArgs::default()).await.unwrap_err();
        let code = err.extensions.as_ref().and_then(|e| e.get("code")).cloned();
        assert_eq!(code, Some(async_graphql::Value::from("INVALID_PAGINATION_ARGS")));
        assert_eq!(loader.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_bad_cursor_surfaces_as_error() {
        let loader = VecLoader::new(3);
        let args = ConnectionArgs::forward(1, Some(format!("{}!", PageCursorCodec::encode(1))));
        assert!(load(&loader, args).await.is_err());
    }

    #[tokio::test]
    async fn test_upstream_error_is_propagated() {
        let err = load_connection(
            &FailingLoader,
            &ConnectionArgs::forward(2, None),
            &PaginationPolicy::default(),
            &PageWindowPolicy::default(),
        )
        .await
        .unwrap_err();
        assert_eq!(err.message, "gravity unavailable");
        let status = err.extensions.as_ref().and_then(|e| e.get("statusCode")).cloned();
        assert_eq!(status, Some(async_graphql::Value::from(502u16)));
    }

    #[test]
    fn test_page_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-total-count", "42".parse().unwrap());
        assert_eq!(Page::from_headers(vec![1, 2], &headers).total_count, 42);
        assert_eq!(Page::from_headers(vec![1, 2], &HeaderMap::new()).total_count, 2);
    }
}
