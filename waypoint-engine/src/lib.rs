//! Waypoint Engine - Deep Pagination
//!
//! Serves "page N of size L" against a document store without native
//! linear-skip cost: sequential iteration via opaque seek cursors in
//! O(limit), shallow random access via a bounded literal skip, and deep
//! random access via cached bookmark checkpoints plus a small number of
//! bounded seek-hops from the nearest checkpoint.
//!
//! The document store and the key-value cache are injected collaborators
//! ([`DocumentExecutor`], [`KvCache`]); the engine holds no global state.

pub mod bookmark;
pub mod cursor;
pub mod executor;
pub mod fingerprint;
mod hop;
pub mod pager;
pub mod strategy;
mod totals;

pub use bookmark::{Bookmark, BookmarkStore};
pub use cursor::{decode_cursor, encode_cursor, seek_predicate};
pub use executor::{DocumentExecutor, FetchSpec, KvCache};
pub use fingerprint::fingerprint;
pub use pager::{FallbackPolicy, Pager, PagerConfig};
pub use strategy::PageStrategy;

// Re-export core types for convenience
pub use waypoint_core::{
    CacheError, CmpOp, Cursor, CursorError, Direction, Document, FetchError, FilterExpr,
    HopPolicy, OffsetPolicy, PageInfo, PageMeta, PageRequest, PageResult, PagerError,
    PagerResult, RequestError, SeekDirection, SortField, SortSpec, StrategyKind, Totals,
    TotalsMode,
};
