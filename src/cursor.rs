//! Opaque position cursors

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};

const CURSOR_PREFIX: &str = "arrayconnection:";

/// Cursor encoding/decoding
///
/// A cursor is the base64 form of `arrayconnection:<position>`, where the
/// position is a zero-based index into the ordered sequence behind a
/// connection. Clients must treat it as opaque and only hand it back through
/// `after`/`before`.
pub struct PageCursorCodec;

impl PageCursorCodec {
    /// Encode a zero-based position
    pub fn encode(position: usize) -> String {
        BASE64.encode(format!("{CURSOR_PREFIX}{position}").as_bytes())
    }

    /// Decode a cursor back into its position
    pub fn decode(cursor: &str) -> crate::Result<usize> {
        let bytes = BASE64
            .decode(cursor.as_bytes())
            .map_err(|e| crate::GraphQLError::InvalidCursor(e.to_string()))?;
        let raw = String::from_utf8(bytes)
            .map_err(|e| crate::GraphQLError::InvalidCursor(e.to_string()))?;
        let position = raw.strip_prefix(CURSOR_PREFIX).ok_or_else(|| {
            crate::GraphQLError::InvalidCursor(format!("unexpected cursor payload `{raw}`"))
        })?;

        // `usize::from_str` accepts a leading `+`, which would make two
        // different strings decode to the same position.
        if position.is_empty() || !position.bytes().all(|b| b.is_ascii_digit()) {
            return Err(crate::GraphQLError::InvalidCursor(format!(
                "position `{position}` is not a non-negative integer"
            )));
        }

        position
            .parse::<usize>()
            .map_err(|e| crate::GraphQLError::InvalidCursor(e.to_string()))
    }

    /// Decode an optional cursor argument
    pub fn decode_opt(cursor: Option<&str>) -> crate::Result<Option<usize>> {
        cursor.map(Self::decode).transpose()
    }
}
