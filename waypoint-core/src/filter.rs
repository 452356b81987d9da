//! Filter expressions for document queries.
//!
//! A closed, tagged-variant AST rather than an untyped JSON tree, so the
//! seek-predicate builder and the fingerprint canonicalizer can match
//! exhaustively. The same language is consumed by the document-store
//! executor, which must evaluate it identically to [`FilterExpr::matches`].

use crate::value::{doc_field, value_cmp, Document};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

/// Comparison operator for field predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CmpOp {
    /// Greater than
    Gt,
    /// Greater than or equal
    Gte,
    /// Less than
    Lt,
    /// Less than or equal
    Lte,
    /// Not equal
    Ne,
}

impl CmpOp {
    /// The operator with its direction flipped (for backward seeks).
    pub fn flipped(self) -> Self {
        match self {
            Self::Gt => Self::Lt,
            Self::Gte => Self::Lte,
            Self::Lt => Self::Gt,
            Self::Lte => Self::Gte,
            Self::Ne => Self::Ne,
        }
    }
}

/// Filter expression over documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterExpr {
    /// Field equals value.
    Eq { field: String, value: Value },
    /// Field compares against value.
    Cmp {
        field: String,
        op: CmpOp,
        value: Value,
    },
    /// All sub-filters match.
    And(Vec<FilterExpr>),
    /// Any sub-filter matches.
    Or(Vec<FilterExpr>),
}

impl FilterExpr {
    /// Create an equality filter.
    pub fn eq(field: impl Into<String>, value: Value) -> Self {
        Self::Eq {
            field: field.into(),
            value,
        }
    }

    /// Create a comparison filter.
    pub fn cmp(field: impl Into<String>, op: CmpOp, value: Value) -> Self {
        Self::Cmp {
            field: field.into(),
            op,
            value,
        }
    }

    /// Conjoin two optional filters, flattening nested `And`s.
    pub fn and_opt(base: Option<Self>, extra: Option<Self>) -> Option<Self> {
        match (base, extra) {
            (Some(base), Some(extra)) => {
                let mut clauses = match base {
                    Self::And(clauses) => clauses,
                    other => vec![other],
                };
                clauses.push(extra);
                Some(Self::And(clauses))
            }
            (Some(one), None) | (None, Some(one)) => Some(one),
            (None, None) => None,
        }
    }

    /// Evaluate this filter against a document.
    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Self::Eq { field, value } => value_cmp(doc_field(doc, field), value) == Ordering::Equal,
            Self::Cmp { field, op, value } => {
                let cmp = value_cmp(doc_field(doc, field), value);
                match op {
                    CmpOp::Gt => cmp == Ordering::Greater,
                    CmpOp::Gte => cmp != Ordering::Less,
                    CmpOp::Lt => cmp == Ordering::Less,
                    CmpOp::Lte => cmp != Ordering::Greater,
                    CmpOp::Ne => cmp != Ordering::Equal,
                }
            }
            Self::And(clauses) => clauses.iter().all(|c| c.matches(doc)),
            Self::Or(clauses) => clauses.iter().any(|c| c.matches(doc)),
        }
    }
}
