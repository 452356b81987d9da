//! Cursor codec and seek-predicate builder.
//!
//! A cursor wraps the *values* (not the identity) of the sort-spec fields
//! taken from one document - the boundary. The wire format is a versioned
//! serde struct carrying the sort-spec hash, hex-encoded into an opaque
//! string. Embedding the hash makes cursors comparable only against
//! requests sharing the same sort spec; mismatches fail at decode time
//! rather than silently misreading boundary values.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use waypoint_core::{
    value::doc_field, CmpOp, Cursor, CursorError, Direction, Document, FilterExpr, SeekDirection,
    SortSpec,
};

/// Current wire version. Bump on any incompatible payload change.
const CURSOR_VERSION: u8 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct CursorWire {
    version: u8,
    /// Hex SHA-256 of the sort spec the boundary was taken under.
    spec: String,
    /// Boundary values, one per sort field, in spec order.
    boundary: Vec<Value>,
}

/// Extract the sort-key boundary values of a document, in spec order.
///
/// Missing fields read as null - the store sorts absent fields as null,
/// and the seek predicate must resume from the same position.
pub(crate) fn boundary_values(doc: &Document, sort: &SortSpec) -> Vec<Value> {
    sort.fields()
        .iter()
        .map(|f| doc_field(doc, &f.field).clone())
        .collect()
}

/// Encode the sort-key boundary of `doc` into an opaque cursor.
pub fn encode_cursor(doc: &Document, sort: &SortSpec) -> Cursor {
    let boundary = boundary_values(doc, sort);
    let wire = CursorWire {
        version: CURSOR_VERSION,
        spec: hex::encode(sort.spec_hash()),
        boundary,
    };
    // Serializing an owned wire struct to JSON cannot fail.
    let bytes = serde_json::to_vec(&wire).unwrap_or_default();
    Cursor::from_token(hex::encode(bytes))
}

/// Decode a cursor back into its boundary values.
pub fn decode_cursor(cursor: &Cursor, sort: &SortSpec) -> Result<Vec<Value>, CursorError> {
    let bytes = hex::decode(cursor.as_str()).map_err(|e| CursorError::Malformed {
        reason: e.to_string(),
    })?;
    let wire: CursorWire =
        serde_json::from_slice(&bytes).map_err(|e| CursorError::Malformed {
            reason: e.to_string(),
        })?;
    if wire.version != CURSOR_VERSION {
        return Err(CursorError::UnsupportedVersion {
            found: wire.version,
        });
    }
    if wire.spec != hex::encode(sort.spec_hash()) {
        return Err(CursorError::SortSpecMismatch);
    }
    if wire.boundary.len() != sort.len() {
        return Err(CursorError::FieldCountMismatch {
            expected: sort.len(),
            found: wire.boundary.len(),
        });
    }
    Ok(wire.boundary)
}

/// Build the filter for "strictly after this boundary in sort order".
///
/// The standard keyset disjunction: for N sort fields, an OR of N clauses,
/// clause i requiring equality on fields `0..i` and a direction-aware
/// strict inequality on field i. `SeekDirection::Backward` flips every
/// inequality (the caller also flips the fetch ordering).
pub fn seek_predicate(
    boundary: &[Value],
    sort: &SortSpec,
    direction: SeekDirection,
) -> FilterExpr {
    debug_assert_eq!(boundary.len(), sort.len());
    let mut clauses = Vec::with_capacity(sort.len());
    for (i, field) in sort.fields().iter().enumerate() {
        let op = match field.direction {
            Direction::Ascending => CmpOp::Gt,
            Direction::Descending => CmpOp::Lt,
        };
        let op = match direction {
            SeekDirection::Forward => op,
            SeekDirection::Backward => op.flipped(),
        };
        let ineq = FilterExpr::cmp(field.field.clone(), op, boundary[i].clone());
        if i == 0 {
            clauses.push(ineq);
        } else {
            let mut parts: Vec<FilterExpr> = sort.fields()[..i]
                .iter()
                .zip(boundary)
                .map(|(f, v)| FilterExpr::eq(f.field.clone(), v.clone()))
                .collect();
            parts.push(ineq);
            clauses.push(FilterExpr::And(parts));
        }
    }
    if clauses.len() == 1 {
        clauses.pop().unwrap_or(FilterExpr::And(Vec::new()))
    } else {
        FilterExpr::Or(clauses)
    }
}
