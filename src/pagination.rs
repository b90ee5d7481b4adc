//! Relay-style cursor pagination over offset/page backed sources
//!
//! Backing services page by number or offset, clients page with Relay
//! cursors. [`ConnectionArgs::resolve`] normalizes either form into one
//! [`Pagination`] and [`paginate`] builds the [`Connection`] from the page
//! of items the caller loaded.

use async_graphql::{InputObject, Object, OutputType, SimpleObject, TypeName};
use serde::Deserialize;
use std::borrow::Cow;

use crate::config::ConfigError;
use crate::cursor::PageCursorCodec;
use crate::page_cursors::{PageCursors, PageWindowPolicy};
use crate::GraphQLError;

/// Page size limits
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PaginationPolicy {
    /// Page size used when a request names a direction but no count
    pub default_size: usize,

    /// Largest page size a request may ask for
    pub max_size: usize,
}

impl Default for PaginationPolicy {
    fn default() -> Self {
        Self {
            default_size: 20,
            max_size: 100,
        }
    }
}

impl PaginationPolicy {
    /// Check the limits are usable: both positive and the default within the maximum
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_size == 0 {
            return Err(ConfigError::InvalidPolicy("`max_size` must be at least 1".to_string()));
        }
        if self.default_size == 0 {
            return Err(ConfigError::InvalidPolicy("`default_size` must be at least 1".to_string()));
        }
        if self.default_size > self.max_size {
            return Err(ConfigError::InvalidPolicy(format!(
                "`default_size` {} exceeds `max_size` {}",
                self.default_size, self.max_size
            )));
        }
        Ok(())
    }
}

/// Page information
#[derive(SimpleObject, Debug, Clone, PartialEq, Eq)]
pub struct PageInfo {
    pub has_next_page: bool,
    pub has_previous_page: bool,
    pub start_cursor: Option<String>,
    pub end_cursor: Option<String>,
}

/// Edge in a connection
#[derive(Debug, Clone)]
pub struct Edge<T> {
    pub cursor: String,
    pub node: T,
}

#[Object(name_type)]
impl<T: OutputType> Edge<T> {
    async fn cursor(&self) -> &str {
        &self.cursor
    }

    async fn node(&self) -> &T {
        &self.node
    }
}

impl<T: OutputType> TypeName for Edge<T> {
    fn type_name() -> Cow<'static, str> {
        format!("{}Edge", <T as OutputType>::type_name()).into()
    }
}

/// Connection (paginated result)
///
/// Registered as `{Node}Connection`, so one schema can expose connections
/// over several node types.
#[derive(Debug, Clone)]
pub struct Connection<T> {
    pub edges: Vec<Edge<T>>,
    pub page_info: PageInfo,
    pub page_cursors: PageCursors,
    pub total_count: usize,
}

#[Object(name_type)]
impl<T: OutputType> Connection<T> {
    async fn edges(&self) -> &[Edge<T>] {
        &self.edges
    }

    async fn page_info(&self) -> &PageInfo {
        &self.page_info
    }

    async fn page_cursors(&self) -> &PageCursors {
        &self.page_cursors
    }

    async fn total_count(&self) -> usize {
        self.total_count
    }
}

impl<T: OutputType> TypeName for Connection<T> {
    fn type_name() -> Cow<'static, str> {
        format!("{}Connection", <T as OutputType>::type_name()).into()
    }
}

impl<T> Connection<T> {
    /// Build a connection from an already loaded page
    ///
    /// `items` is the slice the backing service returned for
    /// `pagination.offset`; anything past `pagination.size` is dropped. The
    /// sequence is exhausted once the page's window reaches `total_count`,
    /// even when the page came back short.
    pub fn from_page(
        pagination: &Pagination,
        items: Vec<T>,
        total_count: usize,
        window: &PageWindowPolicy,
    ) -> Self {
        let edges: Vec<Edge<T>> = items
            .into_iter()
            .take(pagination.size)
            .enumerate()
            .map(|(idx, node)| Edge {
                cursor: PageCursorCodec::encode(pagination.offset.saturating_add(idx)),
                node,
            })
            .collect();

        let start_cursor = edges.first().map(|e| e.cursor.clone());
        let end_cursor = edges.last().map(|e| e.cursor.clone());

        Self {
            page_info: PageInfo {
                has_next_page: pagination.offset.saturating_add(pagination.size) < total_count,
                has_previous_page: pagination.offset > 0,
                start_cursor,
                end_cursor,
            },
            page_cursors: PageCursors::compute(pagination, total_count, window),
            edges,
            total_count,
        }
    }

    /// Nodes in edge order
    pub fn nodes(&self) -> impl Iterator<Item = &T> {
        self.edges.iter().map(|e| &e.node)
    }
}

/// Normalized position of a requested page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// One-based page number
    pub page: usize,

    /// Page size, always positive
    pub size: usize,

    /// Zero-based index of the first item on the page
    pub offset: usize,
}

impl Pagination {
    /// Page `page` (one-based) of `size` items
    pub fn from_page(page: usize, size: usize) -> Self {
        Self {
            page,
            size,
            offset: page.saturating_sub(1).saturating_mul(size),
        }
    }

    /// The page holding `offset`, `size` must be positive
    pub fn from_offset(offset: usize, size: usize) -> Self {
        Self {
            page: (offset / size).saturating_add(1),
            size,
            offset,
        }
    }
}

/// Connection arguments
///
/// Follows the Relay Cursor Connections Specification:
/// https://relay.dev/graphql/connections.htm
///
/// Legacy callers may send `page`/`size` instead of cursors. The two forms are
/// mutually exclusive.
#[derive(InputObject, Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionArgs {
    /// Number of items to return (forward pagination)
    pub first: Option<i32>,

    /// Cursor to start after (forward pagination)
    pub after: Option<String>,

    /// Number of items to return (backward pagination)
    pub last: Option<i32>,

    /// Cursor to end before (backward pagination)
    pub before: Option<String>,

    /// One-based page number (numbered pagination)
    pub page: Option<i32>,

    /// Page size (numbered pagination)
    pub size: Option<i32>,
}

enum Style {
    Forward,
    Backward,
    Numbered,
}

impl ConnectionArgs {
    /// Forward pagination: `first` items after `after`
    pub fn forward(first: i32, after: Option<String>) -> Self {
        Self {
            first: Some(first),
            after,
            ..Default::default()
        }
    }

    /// Backward pagination: `last` items before `before`
    pub fn backward(last: i32, before: Option<String>) -> Self {
        Self {
            last: Some(last),
            before,
            ..Default::default()
        }
    }

    /// Numbered pagination
    pub fn numbered(page: i32, size: i32) -> Self {
        Self {
            page: Some(page),
            size: Some(size),
            ..Default::default()
        }
    }

    /// True when the offset can only be computed once the total count is known
    pub fn needs_total_count(&self) -> bool {
        self.last.is_some() && self.before.is_none()
    }

    fn style(&self) -> crate::Result<Style> {
        let forward = self.first.is_some() || self.after.is_some();
        let backward = self.last.is_some() || self.before.is_some();
        let numbered = self.page.is_some() || self.size.is_some();

        match (forward, backward, numbered) {
            (true, false, false) => Ok(Style::Forward),
            (false, true, false) => Ok(Style::Backward),
            (false, false, true) => Ok(Style::Numbered),
            (false, false, false) => Err(invalid(
                "one of `first`/`after`, `last`/`before` or `page`/`size` is required",
            )),
            (_, _, true) => Err(invalid(
                "cursor arguments cannot be combined with `page`/`size`",
            )),
            (true, true, false) => Err(invalid(
                "`first`/`after` cannot be combined with `last`/`before`",
            )),
        }
    }

    /// Normalize into a [`Pagination`]
    ///
    /// `total_count` is only consulted for `last` without `before`, where the
    /// page ends at the end of the sequence.
    pub fn resolve(
        &self,
        policy: &PaginationPolicy,
        total_count: Option<usize>,
    ) -> crate::Result<Pagination> {
        let pagination = match self.style()? {
            Style::Numbered => {
                let size = page_size(self.size, "size", policy)?;
                let page = match self.page {
                    None => 1,
                    Some(page) if page >= 1 => page as usize,
                    Some(page) => return Err(invalid(format!("`page` must be at least 1, got {page}"))),
                };
                let offset = (page - 1)
                    .checked_mul(size)
                    .filter(|offset| offset.checked_add(size).is_some())
                    .ok_or_else(|| invalid(format!("`page` {page} is out of range")))?;
                Pagination { page, size, offset }
            }
            Style::Forward => {
                let size = page_size(self.first, "first", policy)?;
                let offset = match PageCursorCodec::decode_opt(self.after.as_deref())? {
                    None => 0,
                    Some(position) => position
                        .checked_add(1)
                        .filter(|offset| offset.checked_add(size).is_some())
                        .ok_or_else(|| {
                            GraphQLError::InvalidCursor(format!("position {position} is out of range"))
                        })?,
                };
                Pagination::from_offset(offset, size)
            }
            Style::Backward => {
                let size = page_size(self.last, "last", policy)?;
                let end = match PageCursorCodec::decode_opt(self.before.as_deref())? {
                    Some(position) => position,
                    None => total_count.ok_or_else(|| {
                        invalid("`last` without `before` requires the total count")
                    })?,
                };
                Pagination::from_offset(end.saturating_sub(size), size)
            }
        };

        tracing::debug!(
            page = pagination.page,
            size = pagination.size,
            offset = pagination.offset,
            "resolved connection arguments"
        );

        Ok(pagination)
    }
}

fn page_size(value: Option<i32>, argument: &str, policy: &PaginationPolicy) -> crate::Result<usize> {
    let size = match value {
        None => policy.default_size,
        Some(value) if value <= 0 => {
            return Err(invalid(format!("`{argument}` must be positive, got {value}")))
        }
        Some(value) => value as usize,
    };
    if size == 0 {
        return Err(invalid(format!("no `{argument}` given and the default page size is 0")));
    }
    if size > policy.max_size {
        return Err(invalid(format!(
            "`{argument}` cannot exceed {}, got {size}",
            policy.max_size
        )));
    }
    Ok(size)
}

fn invalid(reason: impl Into<String>) -> GraphQLError {
    GraphQLError::InvalidPaginationArgs(reason.into())
}

/// Build a connection from the requester's arguments and a loaded page
pub fn paginate<T>(
    args: &ConnectionArgs,
    items: Vec<T>,
    total_count: usize,
    policy: &PaginationPolicy,
    window: &PageWindowPolicy,
) -> crate::Result<Connection<T>> {
    let pagination = args.resolve(policy, Some(total_count))?;
    Ok(Connection::from_page(&pagination, items, total_count, window))
}
