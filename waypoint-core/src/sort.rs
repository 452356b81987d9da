//! Sort specifications.
//!
//! A `SortSpec` defines the total ordering a paged query iterates in. The
//! last field must be unique per document - without a unique tiebreaker
//! the ordering is not total and seek pagination can duplicate or skip
//! rows across pages. The page assembler appends the primary identifier
//! ascending when the caller omits one.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Sort direction for a single field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Ascending,
    Descending,
}

impl Direction {
    /// The opposite direction.
    pub fn reversed(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }
}

/// One `(field, direction)` pair of a sort specification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortField {
    pub field: String,
    pub direction: Direction,
}

impl SortField {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Ascending,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Descending,
        }
    }
}

/// An ordered sequence of sort fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortSpec {
    fields: Vec<SortField>,
}

impl SortSpec {
    /// Create a sort spec from fields. May be empty; the assembler
    /// appends the identifier tiebreaker before use.
    pub fn new(fields: Vec<SortField>) -> Self {
        Self { fields }
    }

    /// The fields in order.
    pub fn fields(&self) -> &[SortField] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Whether the spec ends with the given unique tiebreaker field.
    pub fn has_tiebreaker(&self, id_field: &str) -> bool {
        self.fields.last().is_some_and(|f| f.field == id_field)
    }

    /// This spec with `{id_field} ascending` appended if not already the
    /// final field.
    pub fn with_tiebreaker(&self, id_field: &str) -> Self {
        if self.has_tiebreaker(id_field) {
            return self.clone();
        }
        let mut fields = self.fields.clone();
        fields.push(SortField::asc(id_field));
        Self { fields }
    }

    /// The spec with every direction flipped (for backward seeks).
    pub fn reversed(&self) -> Self {
        Self {
            fields: self
                .fields
                .iter()
                .map(|f| SortField {
                    field: f.field.clone(),
                    direction: f.direction.reversed(),
                })
                .collect(),
        }
    }

    /// SHA-256 over the canonical rendering of this spec.
    ///
    /// Embedded into cursor tokens so a cursor minted under a different
    /// ordering is rejected at decode time rather than silently misread.
    pub fn spec_hash(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        for f in &self.fields {
            hasher.update(f.field.as_bytes());
            hasher.update([0xFF]);
            hasher.update([match f.direction {
                Direction::Ascending => 0u8,
                Direction::Descending => 1u8,
            }]);
        }
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&hasher.finalize());
        hash
    }
}
