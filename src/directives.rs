//! Marker directives that attribute a failure to one field
//!
//! A client tags the single field whose failure matters most (the artwork on
//! an artwork page, say) with `@principalField`. Two behaviors build on that:
//!
//! - [`validate_single_use`] rejects documents that use the directive more
//!   than once;
//! - [`extract_attributed_error`] looks for an execution error on exactly the
//!   tagged field and turns it into a response extension such as
//!   `{"principalField": {"httpStatusCode": 404}}`.

use async_graphql::parser::types::ExecutableDocument;
use async_graphql::{Name, PathSegment, Pos, ServerError, Value};
use indexmap::IndexMap;
use std::collections::BTreeMap;
use std::ops::ControlFlow;
use thiserror::Error;

use crate::ast::{walk_document, walk_operation, AstNode, Visitor};
use crate::loaders::UpstreamError;

pub const PRINCIPAL_FIELD: &str = "principalField";
pub const CANONICAL_RESOURCE: &str = "canonicalResource";

/// Status code extension keys, in lookup order
const STATUS_CODE_KEYS: [&str; 2] = ["statusCode", "httpStatusCode"];

/// A marker directive used more than once
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Can only use `@{directive}` once.")]
pub struct DirectiveUsageError {
    pub directive: String,

    /// Position of the second occurrence
    pub pos: Pos,
}

impl From<DirectiveUsageError> for ServerError {
    fn from(err: DirectiveUsageError) -> Self {
        ServerError::new(err.to_string(), Some(err.pos))
    }
}

/// Counts occurrences of one directive and breaks at the second
#[derive(Debug)]
pub struct DirectiveOccurrences<'n> {
    directive: &'n str,
    count: usize,
    repeated_at: Option<Pos>,
}

impl<'n> DirectiveOccurrences<'n> {
    pub fn new(directive: &'n str) -> Self {
        Self {
            directive,
            count: 0,
            repeated_at: None,
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Record one occurrence; `Break` once the directive has been seen twice
    pub fn record(&mut self, pos: Pos) -> ControlFlow<()> {
        self.count += 1;
        if self.count > 1 {
            self.repeated_at.get_or_insert(pos);
            return ControlFlow::Break(());
        }
        ControlFlow::Continue(())
    }

    pub fn into_error(self) -> Option<DirectiveUsageError> {
        self.repeated_at.map(|pos| DirectiveUsageError {
            directive: self.directive.to_string(),
            pos,
        })
    }
}

impl<'a> Visitor<'a> for DirectiveOccurrences<'_> {
    fn enter(&mut self, node: AstNode<'a>) -> ControlFlow<()> {
        match node {
            AstNode::Directive(directive) if directive.node.name.node.as_str() == self.directive => {
                self.record(directive.pos)
            }
            _ => ControlFlow::Continue(()),
        }
    }
}

/// Reject documents using `directive` more than once
///
/// Returns at most one error: the walk stops at the second occurrence, later
/// ones are not reported separately.
pub fn validate_single_use(doc: &ExecutableDocument, directive: &str) -> Vec<DirectiveUsageError> {
    let mut occurrences = DirectiveOccurrences::new(directive);
    let _ = walk_document(doc, &mut occurrences);

    let error = occurrences.into_error();
    if let Some(err) = &error {
        tracing::debug!(directive, line = err.pos.line, column = err.pos.column, "marker directive repeated");
    }
    error.into_iter().collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TrackerState {
    Descending,
    Captured,
}

/// Tracks the response path of the walk and captures it at the tagged field
///
/// Entering a field pushes its response key, leaving pops it. The first field
/// carrying the directive freezes the path; nothing changes it afterwards.
#[derive(Debug)]
pub struct FieldPathTracker<'a, 'n> {
    directive: &'n str,
    stack: Vec<&'a Name>,
    state: TrackerState,
}

impl<'a, 'n> FieldPathTracker<'a, 'n> {
    pub fn new(directive: &'n str) -> Self {
        Self {
            directive,
            stack: Vec::new(),
            state: TrackerState::Descending,
        }
    }

    /// The captured path, if the tagged field was reached
    pub fn captured(&self) -> Option<Vec<String>> {
        (self.state == TrackerState::Captured)
            .then(|| self.stack.iter().map(|name| name.to_string()).collect())
    }
}

impl<'a> Visitor<'a> for FieldPathTracker<'a, '_> {
    fn enter(&mut self, node: AstNode<'a>) -> ControlFlow<()> {
        if self.state == TrackerState::Captured {
            return ControlFlow::Break(());
        }
        if let AstNode::Field(field) = node {
            self.stack.push(&field.node.response_key().node);
            let tagged = field
                .node
                .directives
                .iter()
                .any(|d| d.node.name.node.as_str() == self.directive);
            if tagged {
                self.state = TrackerState::Captured;
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    fn leave(&mut self, node: AstNode<'a>) -> ControlFlow<()> {
        if self.state == TrackerState::Captured {
            return ControlFlow::Break(());
        }
        if let AstNode::Field(_) = node {
            self.stack.pop();
        }
        ControlFlow::Continue(())
    }
}

/// Response path of the field tagged with `directive` in the executed operation
pub fn attributed_field_path(
    doc: &ExecutableDocument,
    operation_name: Option<&str>,
    directive: &str,
) -> Option<Vec<String>> {
    let mut tracker = FieldPathTracker::new(directive);
    let _ = walk_operation(doc, operation_name, &mut tracker);
    tracker.captured()
}

/// Extension entry for an error raised on the field tagged with `directive`
///
/// Returns `{directive: payload}` when one of `errors` sits exactly on the
/// tagged field, an empty map otherwise: no directive, no error on that field,
/// or only errors elsewhere in the response. List indices in error paths are
/// ignored, so a tagged field inside a list matches its first failing element.
pub fn extract_attributed_error(
    doc: &ExecutableDocument,
    operation_name: Option<&str>,
    directive: &str,
    errors: &[ServerError],
) -> BTreeMap<String, Value> {
    let mut extensions = BTreeMap::new();
    if errors.is_empty() {
        return extensions;
    }

    let Some(path) = attributed_field_path(doc, operation_name, directive) else {
        return extensions;
    };

    if let Some(payload) = attribute_error(directive, &path, errors) {
        extensions.insert(directive.to_string(), payload);
    }

    extensions
}

/// Payload for the first of `errors` raised on the field at `path`
///
/// `path` is a response path as captured by [`attributed_field_path`].
pub fn attribute_error(directive: &str, path: &[String], errors: &[ServerError]) -> Option<Value> {
    let error = errors.iter().find(|error| path_matches(&error.path, path))?;
    tracing::debug!(directive, path = ?path, message = %error.message, "attributed field failed");
    Some(attribution_payload(error))
}

fn path_matches(error_path: &[PathSegment], field_path: &[String]) -> bool {
    error_path
        .iter()
        .filter_map(|segment| match segment {
            PathSegment::Field(key) => Some(key.as_str()),
            PathSegment::Index(_) => None,
        })
        .eq(field_path.iter().map(String::as_str))
}

fn attribution_payload(error: &ServerError) -> Value {
    let mut payload = IndexMap::new();
    if let Some(status) = status_code(error) {
        payload.insert(Name::new("httpStatusCode"), Value::from(status));
    }
    Value::Object(payload)
}

/// HTTP status code the failing loader attached to the error, if any
pub fn status_code(error: &ServerError) -> Option<u16> {
    if let Some(upstream) = error.source::<UpstreamError>() {
        return Some(upstream.status_code);
    }

    let extensions = error.extensions.as_ref()?;
    STATUS_CODE_KEYS.iter().find_map(|key| match extensions.get(key) {
        Some(Value::Number(n)) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
        _ => None,
    })
}
