//! Page result envelope.

use crate::cursor::Cursor;
use crate::request::TotalsMode;
use crate::value::Document;
use crate::Timestamp;
use serde::{Deserialize, Serialize};

/// Which strategy served a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// Direct cursor seek.
    Seek,
    /// Bounded native skip.
    Skip,
    /// Bookmark-assisted hop sequence.
    Hop,
}

/// Cursor and adjacency information for a returned page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageInfo {
    /// Boundary of the first returned document, if any.
    pub start_cursor: Option<Cursor>,
    /// Boundary of the last returned document, if any.
    pub end_cursor: Option<Cursor>,
    pub has_next_page: bool,
    pub has_previous_page: bool,
    /// Set for page-number requests only.
    pub page_number: Option<u64>,
}

/// Total-matching-count outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    /// The count, when computed.
    pub value: Option<u64>,
    pub mode: TotalsMode,
    /// True while an async count is still in flight.
    pub pending: bool,
    pub computed_at: Option<Timestamp>,
}

impl Totals {
    /// Totals for `TotalsMode::None`: omitted.
    pub fn omitted() -> Self {
        Self {
            value: None,
            mode: TotalsMode::None,
            pending: false,
            computed_at: None,
        }
    }

    /// A completed exact count.
    pub fn exact(value: u64, mode: TotalsMode, computed_at: Timestamp) -> Self {
        Self {
            value: Some(value),
            mode,
            pending: false,
            computed_at: Some(computed_at),
        }
    }

    /// An async count that has not completed yet.
    pub fn pending() -> Self {
        Self {
            value: None,
            mode: TotalsMode::Async,
            pending: true,
            computed_at: None,
        }
    }
}

/// Execution metadata for a served page.
///
/// Carried on the success path so callers can see what a page cost:
/// the strategy chosen, hops spent, and whether the fallback policy
/// degraded to an over-budget skip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub strategy: StrategyKind,
    /// Seek fetches spent walking from the nearest bookmark.
    pub hops: u32,
    /// True when the fallback policy degraded to an over-budget skip.
    pub cost_warning: bool,
}

impl PageMeta {
    pub fn new(strategy: StrategyKind) -> Self {
        Self {
            strategy,
            hops: 0,
            cost_warning: false,
        }
    }
}

/// The result envelope for one page request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResult {
    pub items: Vec<Document>,
    pub page_info: PageInfo,
    pub totals: Totals,
    pub meta: PageMeta,
}
