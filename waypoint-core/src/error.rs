//! Error types for Waypoint operations.

use crate::result::StrategyKind;
use crate::DurationMs;
use thiserror::Error;

/// Invalid page request. Always local, never retried.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("Exactly one of page/after must be set; got neither")]
    MissingPageTarget,

    #[error("Exactly one of page/after must be set; got both")]
    ConflictingPageTarget,

    #[error("Page size must be positive")]
    ZeroLimit,

    #[error("Page numbers are 1-based; got 0")]
    ZeroPage,

    #[error("Backward direction requires an `after` cursor")]
    BackwardWithoutCursor,

    #[error("Hop step must be at least 1")]
    ZeroHopStep,
}

/// Malformed or incompatible cursor token. The caller should treat this
/// like an expired link and restart from page 1.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CursorError {
    #[error("Cursor token is malformed: {reason}")]
    Malformed { reason: String },

    #[error("Cursor token has unsupported version {found}")]
    UnsupportedVersion { found: u8 },

    #[error("Cursor was built for a different sort order")]
    SortSpecMismatch,

    #[error("Cursor carries {found} boundary values, sort spec has {expected}")]
    FieldCountMismatch { expected: usize, found: usize },
}

/// Document-store execution failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("Fetch exceeded time budget of {max_time_ms}ms (strategy {strategy:?}, {hops_attempted} hops attempted)")]
    FetchTimeout {
        max_time_ms: DurationMs,
        /// Filled in by the assembler; executors leave it `None`.
        strategy: Option<StrategyKind>,
        hops_attempted: u32,
    },

    #[error("Count exceeded time budget of {max_time_ms}ms")]
    CountTimeout { max_time_ms: DurationMs },

    #[error("Page {page} unreachable: needs {hops_needed} hops, budget is {max_hops} and skip is not allowed")]
    PageUnreachable {
        page: u64,
        hops_needed: u32,
        max_hops: u32,
    },

    #[error("Document store error: {reason}")]
    Backend { reason: String },
}

impl FetchError {
    /// A timeout with no strategy context yet; executors use this.
    pub fn timeout(max_time_ms: DurationMs) -> Self {
        Self::FetchTimeout {
            max_time_ms,
            strategy: None,
            hops_attempted: 0,
        }
    }
}

/// Cache backend failures.
///
/// Never surfaced past the bookmark store / page assembler boundary;
/// callers of the engine only ever observe the degraded performance.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cache unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Cache entry could not be decoded: {reason}")]
    Corrupt { reason: String },
}

/// Top-level error for page requests.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PagerError {
    #[error("Invalid page request: {0}")]
    Request(#[from] RequestError),

    #[error("Cursor error: {0}")]
    Cursor(#[from] CursorError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),
}

/// Result alias for page operations.
pub type PagerResult<T> = Result<T, PagerError>;
