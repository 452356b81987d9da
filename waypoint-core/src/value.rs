//! Total deterministic ordering over JSON values.
//!
//! Seek predicates, the canonical filter rendering and the in-memory
//! executor all need to agree on one total order for sort-key values.
//! Ordering here must be total and deterministic; it must never depend on
//! runtime state or schema knowledge.

use serde_json::Value;
use std::cmp::Ordering;

/// A document as returned by the store: a JSON object.
///
/// `serde_json::Map` keeps keys sorted (BTreeMap-backed by default), so
/// serializing a document is already key-order independent.
pub type Document = serde_json::Map<String, Value>;

/// Read a top-level field from a document, treating absence as null.
///
/// Document stores sort missing fields as null, and seek predicates must
/// agree with that.
pub fn doc_field<'a>(doc: &'a Document, field: &str) -> &'a Value {
    doc.get(field).unwrap_or(&Value::Null)
}

/// Rank of a value's type in the cross-type ordering.
///
/// Null < Bool < Number < String < Array < Object. Comparisons between
/// sort-key values of different types are rare but must still be total.
const fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Compare two JSON values with a total deterministic ordering.
pub fn value_cmp(left: &Value, right: &Value) -> Ordering {
    match (left, right) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Bool(l), Value::Bool(r)) => l.cmp(r),
        (Value::Number(l), Value::Number(r)) => number_cmp(l, r),
        (Value::String(l), Value::String(r)) => l.cmp(r),
        (Value::Array(l), Value::Array(r)) => {
            for (l, r) in l.iter().zip(r.iter()) {
                let cmp = value_cmp(l, r);
                if cmp != Ordering::Equal {
                    return cmp;
                }
            }
            l.len().cmp(&r.len())
        }
        (Value::Object(l), Value::Object(r)) => {
            // Keys are already sorted within each map.
            for ((lk, lv), (rk, rv)) in l.iter().zip(r.iter()) {
                let cmp = lk.cmp(rk).then_with(|| value_cmp(lv, rv));
                if cmp != Ordering::Equal {
                    return cmp;
                }
            }
            l.len().cmp(&r.len())
        }
        _ => type_rank(left).cmp(&type_rank(right)),
    }
}

fn number_cmp(left: &serde_json::Number, right: &serde_json::Number) -> Ordering {
    // Exact integer compare when both sides are integral; f64 otherwise.
    if let (Some(l), Some(r)) = (left.as_i64(), right.as_i64()) {
        return l.cmp(&r);
    }
    if let (Some(l), Some(r)) = (left.as_u64(), right.as_u64()) {
        return l.cmp(&r);
    }
    let l = left.as_f64().unwrap_or(0.0);
    let r = right.as_f64().unwrap_or(0.0);
    l.partial_cmp(&r).unwrap_or(Ordering::Equal)
}
