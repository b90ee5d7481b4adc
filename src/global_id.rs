//! Globally unique node identifiers
//!
//! A global id packs the GraphQL type name and the id local to that type's
//! backing service into one opaque string, so a generic `node(id:)` field can
//! route the lookup back to the right loader.

use async_graphql::ID;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use std::fmt;

const DELIMITER: char = ':';

/// A `(type name, local id)` pair addressable across every backing service
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GlobalId {
    type_name: String,
    local_id: String,
}

impl GlobalId {
    /// Create a global id
    ///
    /// The type name must be a valid GraphQL name and the local id must not be
    /// empty. GraphQL names cannot contain the delimiter, which keeps the
    /// encoding injective even when the local id does.
    pub fn new(type_name: impl Into<String>, local_id: impl Into<String>) -> crate::Result<Self> {
        let type_name = type_name.into();
        let local_id = local_id.into();

        if !is_graphql_name(&type_name) {
            return Err(crate::GraphQLError::InvalidGlobalId(format!(
                "`{type_name}` is not a valid type name"
            )));
        }
        if local_id.is_empty() {
            return Err(crate::GraphQLError::InvalidGlobalId(format!(
                "empty local id for type `{type_name}`"
            )));
        }

        Ok(Self { type_name, local_id })
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn local_id(&self) -> &str {
        &self.local_id
    }

    /// Encode to the opaque wire form
    pub fn encode(&self) -> String {
        BASE64.encode(format!("{}{DELIMITER}{}", self.type_name, self.local_id).as_bytes())
    }

    /// Decode the opaque wire form
    ///
    /// Anything that was not produced by [`GlobalId::encode`] fails instead of
    /// yielding a partial pair.
    pub fn decode(global_id: &str) -> crate::Result<Self> {
        let bytes = BASE64
            .decode(global_id.as_bytes())
            .map_err(|e| crate::GraphQLError::InvalidGlobalId(e.to_string()))?;
        let payload = String::from_utf8(bytes)
            .map_err(|e| crate::GraphQLError::InvalidGlobalId(e.to_string()))?;
        let (type_name, local_id) = payload.split_once(DELIMITER).ok_or_else(|| {
            crate::GraphQLError::InvalidGlobalId(format!("missing `{DELIMITER}` in payload"))
        })?;

        Self::new(type_name, local_id)
    }

    pub fn into_parts(self) -> (String, String) {
        (self.type_name, self.local_id)
    }
}

impl fmt::Display for GlobalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

// `ID: From<T: Display>` covers the other direction through `encode`.
impl TryFrom<&ID> for GlobalId {
    type Error = crate::GraphQLError;

    fn try_from(id: &ID) -> crate::Result<Self> {
        GlobalId::decode(id.as_str())
    }
}

/// Encode a `(type name, local id)` pair
pub fn to_global_id(type_name: &str, local_id: &str) -> crate::Result<String> {
    GlobalId::new(type_name, local_id).map(|id| id.encode())
}

/// Decode a global id into its pair
pub fn from_global_id(global_id: &str) -> crate::Result<GlobalId> {
    GlobalId::decode(global_id)
}

fn is_graphql_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}
