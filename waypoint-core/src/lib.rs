//! Waypoint Core - Data Types
//!
//! Pure data structures for the Waypoint pagination engine. This crate
//! contains the filter AST, sort specification, request/result envelopes
//! and error families - no I/O and no business logic.

pub mod cursor;
pub mod error;
pub mod filter;
pub mod request;
pub mod result;
pub mod sort;
pub mod value;

pub use cursor::Cursor;
pub use error::{CacheError, CursorError, FetchError, PagerError, PagerResult, RequestError};
pub use filter::{CmpOp, FilterExpr};
pub use request::{
    HopPolicy, OffsetPolicy, PageRequest, SeekDirection, TotalsMode,
};
pub use result::{PageInfo, PageMeta, PageResult, StrategyKind, Totals};
pub use sort::{Direction, SortField, SortSpec};
pub use value::{value_cmp, Document};

use chrono::{DateTime, Utc};

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Duration in milliseconds for TTL and timeout values.
pub type DurationMs = i64;
