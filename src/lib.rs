//! # pleme-graphql-relay
//!
//! Request-time Relay layer for the Pleme GraphQL gateway.
//!
//! ## Features
//!
//! - **Connections** - Relay connections over page/offset backed REST sources,
//!   with a jump-to-page cursor window
//! - **Global IDs** - opaque `(type, local id)` node identifiers and `node(id:)` dispatch
//! - **Error Attribution** - `@principalField` style directives that surface the
//!   failure of one critical field in the response extensions
//! - **Loaders** - injectable page loaders and header-reported total counts
//!
//! ## Usage
//!
//! ```rust
//! use pleme_graphql_relay::{paginate, ConnectionArgs, PageWindowPolicy, PaginationPolicy};
//!
//! let args = ConnectionArgs::numbered(5, 5);
//! let connection = paginate(
//!     &args,
//!     vec!["a", "b", "c"],
//!     25,
//!     &PaginationPolicy::default(),
//!     &PageWindowPolicy::default(),
//! )
//! .unwrap();
//!
//! assert_eq!(connection.edges.len(), 3);
//! assert!(!connection.page_info.has_next_page);
//! ```

pub mod ast;
pub mod config;
pub mod cursor;
pub mod directives;
pub mod extension;
pub mod global_id;
pub mod headers;
pub mod loaders;
pub mod node;
pub mod page_cursors;
pub mod pagination;

pub use config::{install, ConfigError, GatewayConfig};
pub use cursor::PageCursorCodec;
pub use directives::{attribute_error, extract_attributed_error, validate_single_use, DirectiveUsageError};
pub use extension::DirectiveErrorAttribution;
pub use global_id::{from_global_id, to_global_id, GlobalId};
pub use headers::extract_total_count;
pub use loaders::{load_connection, Page, PageLoader, UpstreamError};
pub use node::{NodeRegistry, NodeResolver};
pub use page_cursors::{PageCursor, PageCursors, PageWindowPolicy};
pub use pagination::{paginate, Connection, ConnectionArgs, Edge, PageInfo, Pagination, PaginationPolicy};

use async_graphql::ErrorExtensions;
use thiserror::Error;

/// GraphQL errors
#[derive(Error, Debug)]
pub enum GraphQLError {
    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),

    #[error("Invalid global id: {0}")]
    InvalidGlobalId(String),

    #[error("Invalid pagination arguments: {0}")]
    InvalidPaginationArgs(String),

    #[error(transparent)]
    DirectiveUsage(#[from] DirectiveUsageError),
}

impl GraphQLError {
    /// Cursor or global id that failed to decode
    pub fn is_decode_error(&self) -> bool {
        matches!(self, Self::InvalidCursor(_) | Self::InvalidGlobalId(_))
    }

    /// Stable machine-readable code, exposed as the `code` error extension
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidCursor(_) => "INVALID_CURSOR",
            Self::InvalidGlobalId(_) => "INVALID_GLOBAL_ID",
            Self::InvalidPaginationArgs(_) => "INVALID_PAGINATION_ARGS",
            Self::DirectiveUsage(_) => "DIRECTIVE_USAGE",
        }
    }
}

impl ErrorExtensions for GraphQLError {
    fn extend(&self) -> async_graphql::Error {
        async_graphql::Error::new(self.to_string()).extend_with(|_, e| e.set("code", self.code()))
    }
}

/// Result type for GraphQL operations
pub type Result<T> = std::result::Result<T, GraphQLError>;
