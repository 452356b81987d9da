//! Opaque cursor tokens.
//!
//! The token payload is owned by the engine's codec; callers treat a
//! `Cursor` as an opaque resumption handle. Tokens embed the sort-spec
//! hash, so a cursor is only meaningful against requests sharing the same
//! `SortSpec` - the codec rejects mismatches at decode time.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An opaque pagination token wrapping a document's sort-key boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    /// Wrap a raw token string. No validation happens here; malformed
    /// tokens are rejected when decoded.
    pub fn from_token(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Cursor {
    fn from(token: String) -> Self {
        Self(token)
    }
}
