//! Schema extension wiring directive error attribution into request handling
//!
//! - `parse_query`: each configured marker directive may appear at most once,
//!   a repeat rejects the request before any resolver runs. The response path
//!   of every tagged field is recorded per operation.
//! - `execute`: an error on the tagged field adds an entry keyed by the
//!   directive name to the response extensions.

use async_graphql::extensions::{
    Extension, ExtensionContext, ExtensionFactory, NextExecute, NextParseQuery,
};
use async_graphql::parser::types::ExecutableDocument;
use async_graphql::{
    CustomDirective, Directive, Response, ServerError, ServerResult, Variables,
};
use std::sync::{Arc, OnceLock};

use crate::directives::{
    attribute_error, attributed_field_path, validate_single_use, CANONICAL_RESOURCE,
    PRINCIPAL_FIELD,
};

struct MarkerDirective;

#[async_trait::async_trait]
impl CustomDirective for MarkerDirective {}

/// `@principalField`: the field whose failure decides the page's status
#[Directive(name = "principalField", location = "Field")]
pub fn principal_field() -> impl CustomDirective {
    MarkerDirective
}

/// `@canonicalResource`: the field that resolves the page's canonical resource
#[Directive(name = "canonicalResource", location = "Field")]
pub fn canonical_resource() -> impl CustomDirective {
    MarkerDirective
}

/// Directive error attribution extension
///
/// ```rust,no_run
/// use async_graphql::{EmptyMutation, EmptySubscription, Object, Schema};
/// use pleme_graphql_relay::extension::{principal_field, DirectiveErrorAttribution};
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
/// let schema = Schema::build(Query, EmptyMutation, EmptySubscription)
///     .directive(principal_field)
///     .extension(DirectiveErrorAttribution::new(["principalField"]))
///     .finish();
/// ```
pub struct DirectiveErrorAttribution {
    directives: Arc<[String]>,
}

impl DirectiveErrorAttribution {
    pub fn new<I, S>(directives: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            directives: directives.into_iter().map(Into::into).collect(),
        }
    }

    pub fn directives(&self) -> &[String] {
        &self.directives
    }
}

impl Default for DirectiveErrorAttribution {
    fn default() -> Self {
        Self::new([PRINCIPAL_FIELD, CANONICAL_RESOURCE])
    }
}

impl ExtensionFactory for DirectiveErrorAttribution {
    fn create(&self) -> Arc<dyn Extension> {
        Arc::new(DirectiveErrorAttributionInner {
            directives: self.directives.clone(),
            operations: OnceLock::new(),
        })
    }
}

/// Tagged field paths of one operation, captured while parsing
#[derive(Debug)]
struct OperationPaths {
    name: Option<String>,
    paths: Vec<(String, Vec<String>)>,
}

struct DirectiveErrorAttributionInner {
    directives: Arc<[String]>,
    operations: OnceLock<Vec<OperationPaths>>,
}

impl DirectiveErrorAttributionInner {
    fn capture(&self, doc: &ExecutableDocument) -> Vec<OperationPaths> {
        doc.operations
            .iter()
            .map(|(name, _)| {
                let name = name.map(|name| name.as_str());
                let paths = self
                    .directives
                    .iter()
                    .filter_map(|directive| {
                        attributed_field_path(doc, name, directive).map(|path| (directive.clone(), path))
                    })
                    .collect();
                OperationPaths {
                    name: name.map(str::to_string),
                    paths,
                }
            })
            .collect()
    }

    fn selected(&self, operation_name: Option<&str>) -> Option<&OperationPaths> {
        let operations = self.operations.get()?;
        match operation_name {
            Some(wanted) => operations.iter().find(|op| op.name.as_deref() == Some(wanted)),
            None => match operations.as_slice() {
                [only] => Some(only),
                _ => None,
            },
        }
    }
}

#[async_trait::async_trait]
impl Extension for DirectiveErrorAttributionInner {
    async fn parse_query(
        &self,
        ctx: &ExtensionContext<'_>,
        query: &str,
        variables: &Variables,
        next: NextParseQuery<'_>,
    ) -> ServerResult<ExecutableDocument> {
        let doc = next.run(ctx, query, variables).await?;

        for directive in self.directives.iter() {
            if let Some(err) = validate_single_use(&doc, directive).into_iter().next() {
                tracing::warn!(directive = %directive, "rejecting query: {}", err);
                return Err(ServerError::from(err));
            }
        }

        let _ = self.operations.set(self.capture(&doc));
        Ok(doc)
    }

    async fn execute(
        &self,
        ctx: &ExtensionContext<'_>,
        operation_name: Option<&str>,
        next: NextExecute<'_>,
    ) -> Response {
        let mut response = next.run(ctx, operation_name).await;

        if let Some(operation) = self.selected(operation_name) {
            for (directive, path) in &operation.paths {
                if let Some(payload) = attribute_error(directive, path, &response.errors) {
                    response.extensions.insert(directive.clone(), payload);
                }
            }
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loaders::UpstreamError;
    use async_graphql::{
        EmptyMutation, EmptySubscription, ErrorExtensions, Object, Schema, SimpleObject, Value,
    };

    #[derive(SimpleObject)]
    struct Artwork {
        id: String,
        title: String,
    }

    #[derive(SimpleObject)]
    struct Article {
        title: String,
    }

    struct Query;

    #[Object]
    impl Query {
        async fn artwork(&self, id: String) -> async_graphql::Result<Option<Artwork>> {
            if id == "missing" {
                return Err(UpstreamError::not_found("Artwork Not Found").extend());
            }
            Ok(Some(Artwork {
                title: format!("Title of {id}"),
                id,
            }))
        }

        async fn articles(&self, fail: bool) -> async_graphql::Result<Vec<Article>> {
            if fail {
                return Err(UpstreamError::new(500, "positron unavailable").extend());
            }
            Ok(vec![Article {
                title: "Market report".to_string(),
            }])
        }
    }

    fn schema() -> Schema<Query, EmptyMutation, EmptySubscription> {
        Schema::build(Query, EmptyMutation, EmptySubscription)
            .directive(principal_field)
            .directive(canonical_resource)
            .extension(DirectiveErrorAttribution::default())
            .finish()
    }

    #[tokio::test]
    async fn test_principal_field_failure_is_attributed() {
        let response = schema()
            .execute(r#"{ artwork(id: "missing") @principalField { title } articles(fail: false) { title } }"#)
            .await;
        assert_eq!(response.errors.len(), 1);
        assert_eq!(
            response.extensions.get("principalField"),
            Some(&Value::from_json(serde_json::json!({ "httpStatusCode": 404 })).unwrap())
        );
    }

    #[tokio::test]
    async fn test_unrelated_failure_is_not_attributed() {
        let response = schema()
            .execute(r#"{ artwork(id: "soup") @principalField { title } articles(fail: true) { title } }"#)
            .await;
        assert_eq!(response.errors.len(), 1);
        assert!(!response.extensions.contains_key("principalField"));
        assert!(response.extensions.is_empty());
    }

    #[tokio::test]
    async fn test_success_adds_nothing() {
        let response = schema()
            .execute(r#"{ artwork(id: "soup") @principalField { id title } }"#)
            .await;
        assert!(response.errors.is_empty());
        assert!(response.extensions.is_empty());
    }

    #[tokio::test]
    async fn test_repeated_directive_rejects_the_query() {
        let response = schema()
            .execute(r#"{ artwork(id: "missing") @principalField { id @principalField } }"#)
            .await;
        assert_eq!(response.errors.len(), 1);
        assert!(response.errors[0]
            .message
            .contains("Can only use `@principalField` once."));
        assert!(response.errors[0].path.is_empty());
        assert_eq!(response.data, Value::Null);
        assert!(response.extensions.is_empty());
    }

    #[tokio::test]
    async fn test_directives_are_checked_independently() {
        let response = schema()
            .execute(r#"{ a: artwork(id: "1") @principalField { id } b: artwork(id: "missing") @canonicalResource { id } }"#)
            .await;
        assert!(response.extensions.get("principalField").is_none());
        assert_eq!(
            response.extensions.get("canonicalResource"),
            Some(&Value::from_json(serde_json::json!({ "httpStatusCode": 404 })).unwrap())
        );
    }

    #[tokio::test]
    async fn test_directives_pass_validation_without_the_extension() {
        let schema = Schema::build(Query, EmptyMutation, EmptySubscription)
            .directive(principal_field)
            .directive(canonical_resource)
            .finish();
        let response = schema
            .execute(r#"{ artwork(id: "soup") @principalField { id @canonicalResource } }"#)
            .await;
        assert!(response.errors.is_empty(), "{:?}", response.errors);
        assert!(response.extensions.is_empty());
    }

    #[test]
    fn test_paths_are_captured_per_operation() {
        let doc = async_graphql::parser::parse_query(
            r#"query Other { artwork(id: "1") { id } }
               query Page { work: artwork(id: "2") @principalField { id } }"#,
        )
        .unwrap();
        let inner = DirectiveErrorAttributionInner {
            directives: Arc::from(vec![PRINCIPAL_FIELD.to_string()]),
            operations: OnceLock::new(),
        };
        let _ = inner.operations.set(inner.capture(&doc));

        let page = inner.selected(Some("Page")).unwrap();
        assert_eq!(page.paths, vec![(PRINCIPAL_FIELD.to_string(), vec!["work".to_string()])]);
        assert!(inner.selected(Some("Other")).unwrap().paths.is_empty());
        assert!(inner.selected(None).is_none());
        assert!(inner.selected(Some("Missing")).is_none());
    }

    #[tokio::test]
    async fn test_named_operation_is_used_for_the_path() {
        let request = async_graphql::Request::new(
            r#"query Other { artwork(id: "missing") { id } }
               query Page { work: artwork(id: "missing") @principalField { id } }"#,
        )
        .operation_name("Page");
        let response = schema().execute(request).await;
        assert_eq!(response.errors[0].path, vec![async_graphql::PathSegment::Field("work".into())]);
        assert!(response.extensions.contains_key("principalField"));
    }
}
