//! Generic `node(id:)` dispatch

use async_graphql::ErrorExtensions;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::global_id::GlobalId;

/// Node resolver trait for one GraphQL type
///
/// Implemented by each type-specific loader; `N` is usually the schema's
/// `Node` interface enum.
#[async_trait]
pub trait NodeResolver<N>: Send + Sync {
    /// Resolve a node by the id local to its backing service
    async fn resolve_node(&self, local_id: &str) -> async_graphql::Result<Option<N>>;
}

/// Routes decoded global ids to the resolver registered for their type
pub struct NodeRegistry<N> {
    resolvers: HashMap<String, Arc<dyn NodeResolver<N>>>,
}

impl<N> NodeRegistry<N> {
    pub fn new() -> Self {
        Self {
            resolvers: HashMap::new(),
        }
    }

    /// Register the resolver for `type_name`, replacing any earlier one
    pub fn register(mut self, type_name: impl Into<String>, resolver: impl NodeResolver<N> + 'static) -> Self {
        self.resolvers.insert(type_name.into(), Arc::new(resolver));
        self
    }

    pub fn handles(&self, type_name: &str) -> bool {
        self.resolvers.contains_key(type_name)
    }

    /// Decode `id` and dispatch it
    ///
    /// A malformed id is an error; an id for a type nobody registered resolves
    /// to `None`, the same as a missing node.
    pub async fn resolve(&self, id: &str) -> async_graphql::Result<Option<N>> {
        let global_id = GlobalId::decode(id).map_err(|e| e.extend())?;

        let Some(resolver) = self.resolvers.get(global_id.type_name()) else {
            tracing::debug!(type_name = global_id.type_name(), "no node resolver registered");
            return Ok(None);
        };

        resolver.resolve_node(global_id.local_id()).await
    }
}

impl<N> Default for NodeRegistry<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N> Clone for NodeRegistry<N> {
    fn clone(&self) -> Self {
        Self {
            resolvers: self.resolvers.clone(),
        }
    }
}
