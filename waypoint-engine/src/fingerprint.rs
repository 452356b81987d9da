//! Query-shape fingerprint.
//!
//! Canonicalizes (collection, filter, sort, limit) into a stable key that
//! identifies "the same paged query" across different page numbers. The
//! rendering is deterministic under structural equality of the filter:
//! `And`/`Or` children are sorted by their canonical rendering, and object
//! keys inside values are already sorted by `serde_json`'s map.
//!
//! Collisions only cost performance, never correctness: a wrong bookmark
//! reused across unrelated shapes is detected as stale by the hop
//! executor's live re-verification and discarded.

use sha2::{Digest, Sha256};
use waypoint_core::{Direction, FilterExpr, SortSpec};

/// Fingerprint a paged query shape. Hex SHA-256.
pub fn fingerprint(
    collection: &str,
    filter: Option<&FilterExpr>,
    sort: &SortSpec,
    limit: u64,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(collection.as_bytes());
    hasher.update([0xFF]);
    match filter {
        Some(filter) => hasher.update(render_filter(filter).as_bytes()),
        None => hasher.update(b"*"),
    }
    hasher.update([0xFF]);
    for f in sort.fields() {
        hasher.update(f.field.as_bytes());
        hasher.update(match f.direction {
            Direction::Ascending => b":a,",
            Direction::Descending => b":d,",
        });
    }
    hasher.update([0xFF]);
    hasher.update(limit.to_be_bytes());
    hex::encode(hasher.finalize())
}

/// Render a filter to its canonical textual form.
fn render_filter(filter: &FilterExpr) -> String {
    match filter {
        FilterExpr::Eq { field, value } => format!("eq({field},{value})"),
        FilterExpr::Cmp { field, op, value } => format!("cmp({op:?},{field},{value})"),
        FilterExpr::And(clauses) => format!("and({})", render_sorted(clauses)),
        FilterExpr::Or(clauses) => format!("or({})", render_sorted(clauses)),
    }
}

fn render_sorted(clauses: &[FilterExpr]) -> String {
    let mut rendered: Vec<String> = clauses.iter().map(render_filter).collect();
    rendered.sort();
    rendered.join(";")
}
