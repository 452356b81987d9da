//! Collaborator traits: the document-store executor and the key-value cache.
//!
//! Both are implemented elsewhere and injected into the [`Pager`]. The
//! executor must return documents in the exact order implied by the sort
//! spec and must evaluate the same filter language the seek-predicate
//! builder emits. The cache is best-effort: it may silently drop entries,
//! and every failure is treated as a miss by the engine.
//!
//! [`Pager`]: crate::pager::Pager

use async_trait::async_trait;
use waypoint_core::{CacheError, Document, DurationMs, FetchError, FilterExpr, SortSpec};

/// One fetch against the document store.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchSpec {
    pub collection: String,
    pub filter: Option<FilterExpr>,
    pub sort: SortSpec,
    pub limit: u64,
    pub skip: u64,
    pub hint: Option<String>,
    pub max_time_ms: Option<DurationMs>,
}

impl FetchSpec {
    pub fn new(collection: impl Into<String>, sort: SortSpec, limit: u64) -> Self {
        Self {
            collection: collection.into(),
            filter: None,
            sort,
            limit,
            skip: 0,
            hint: None,
            max_time_ms: None,
        }
    }

    pub fn with_filter(mut self, filter: Option<FilterExpr>) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }

    pub fn with_hint(mut self, hint: Option<String>) -> Self {
        self.hint = hint;
        self
    }

    pub fn with_max_time_ms(mut self, max_time_ms: Option<DurationMs>) -> Self {
        self.max_time_ms = max_time_ms;
        self
    }
}

/// Async document-store executor.
#[async_trait]
pub trait DocumentExecutor: Send + Sync {
    /// Fetch documents in the exact order implied by `spec.sort`.
    async fn fetch(&self, spec: &FetchSpec) -> Result<Vec<Document>, FetchError>;

    /// Count documents matching `filter`.
    async fn count(
        &self,
        collection: &str,
        filter: Option<&FilterExpr>,
        max_time_ms: Option<DurationMs>,
    ) -> Result<u64, FetchError>;
}

/// Async best-effort key-value cache.
///
/// Used for bookmark storage and whole-page-result caching. Each get/put
/// is a single atomic remote operation; the engine never holds a lock on
/// it and tolerates entries disappearing between a get and a later put.
#[async_trait]
pub trait KvCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    async fn put(&self, key: &str, value: Vec<u8>, ttl_ms: DurationMs) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}
