//! Gateway configuration and schema wiring
//!
//! Provides helpers for:
//! - Loading pagination and attribution settings from JSON
//! - Installing the marker directives, attribution extension and policies on a schema
//! - Reading the policies back inside resolvers

use async_graphql::{Context, ObjectType, SchemaBuilder, SubscriptionType};
use serde::Deserialize;
use thiserror::Error;

use crate::directives::{CANONICAL_RESOURCE, PRINCIPAL_FIELD};
use crate::extension::{canonical_resource, principal_field, DirectiveErrorAttribution};
use crate::page_cursors::PageWindowPolicy;
use crate::pagination::PaginationPolicy;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid pagination policy: {0}")]
    InvalidPolicy(String),
}

/// Relay layer settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub pagination: PaginationPolicy,
    pub page_window: PageWindowPolicy,

    /// Marker directives checked for single use and attributed in responses
    pub attributed_directives: Vec<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            pagination: PaginationPolicy::default(),
            page_window: PageWindowPolicy::default(),
            attributed_directives: vec![PRINCIPAL_FIELD.to_string(), CANONICAL_RESOURCE.to_string()],
        }
    }
}

impl GatewayConfig {
    /// Parse from JSON, missing keys take their defaults
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.pagination.validate()
    }
}

/// Install the Relay layer on a schema builder
///
/// # Example
///
/// ```rust,no_run
/// use async_graphql::{EmptyMutation, EmptySubscription, Object, Schema};
/// use pleme_graphql_relay::config::{install, GatewayConfig};
///
/// struct Query;
///
/// #[Object]
/// impl Query {
///     async fn ping(&self) -> bool {
///         true
///     }
/// }
///
/// let schema = install(
///     Schema::build(Query, EmptyMutation, EmptySubscription),
///     &GatewayConfig::default(),
/// )
/// .finish();
/// ```
pub fn install<Query, Mutation, Subscription>(
    builder: SchemaBuilder<Query, Mutation, Subscription>,
    config: &GatewayConfig,
) -> SchemaBuilder<Query, Mutation, Subscription>
where
    Query: ObjectType + 'static,
    Mutation: ObjectType + 'static,
    Subscription: SubscriptionType + 'static,
{
    tracing::debug!(directives = ?config.attributed_directives, "installing relay layer");

    builder
        .directive(principal_field)
        .directive(canonical_resource)
        .extension(DirectiveErrorAttribution::new(config.attributed_directives.iter().cloned()))
        .data(config.pagination.clone())
        .data(config.page_window.clone())
}

/// Get the PaginationPolicy from GraphQL context
pub fn pagination_policy(ctx: &Context<'_>) -> PaginationPolicy {
    ctx.data_opt::<PaginationPolicy>().cloned().unwrap_or_default()
}

/// Get the PageWindowPolicy from GraphQL context
pub fn page_window_policy(ctx: &Context<'_>) -> PageWindowPolicy {
    ctx.data_opt::<PageWindowPolicy>().cloned().unwrap_or_default()
}
