//! Waypoint Test Utilities
//!
//! Centralized test infrastructure for the Waypoint workspace:
//! - an in-memory document executor (filter evaluation, sorting,
//!   skip/limit, injectable latency, fetch counters)
//! - an in-memory TTL cache
//! - dataset builders for pagination scenarios

// Re-export core types for convenience
pub use waypoint_core::{
    value_cmp, CmpOp, Cursor, CursorError, Direction, Document, FetchError, FilterExpr,
    HopPolicy, OffsetPolicy, PageInfo, PageMeta, PageRequest, PageResult, PagerError,
    PagerResult, RequestError, SeekDirection, SortField, SortSpec, StrategyKind, Totals,
    TotalsMode,
};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde_json::json;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::RwLock;
use std::time::{Duration, Instant};
use waypoint_core::{value::doc_field, CacheError, DurationMs};
use waypoint_engine::{DocumentExecutor, FetchSpec, KvCache};

// ============================================================================
// IN-MEMORY DOCUMENT EXECUTOR
// ============================================================================

/// In-memory document executor.
///
/// Evaluates the same filter language the engine emits, sorts with the
/// shared value ordering, and applies skip/limit - the reference behavior
/// a real driver must match. Latency is simulated, not slept: when the
/// injected latency exceeds a request's time budget the executor returns
/// the timeout a real driver would.
#[derive(Default)]
pub struct InMemoryExecutor {
    collections: RwLock<HashMap<String, Vec<Document>>>,
    latency_ms: RwLock<Option<DurationMs>>,
    latency_after: RwLock<Option<(u64, DurationMs)>>,
    count_latency_ms: RwLock<Option<DurationMs>>,
    fetches: AtomicU64,
    counts: AtomicU64,
}

impl InMemoryExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the documents of a collection.
    pub fn load(&self, collection: impl Into<String>, docs: Vec<Document>) {
        self.collections
            .write()
            .unwrap()
            .insert(collection.into(), docs);
    }

    /// Simulate this much latency on every fetch and count.
    pub fn set_latency_ms(&self, latency_ms: Option<DurationMs>) {
        *self.latency_ms.write().unwrap() = latency_ms;
    }

    /// Simulate latency on every fetch after the first `fetches`, so a
    /// scenario can let part of a multi-fetch walk succeed and then
    /// time out partway through.
    pub fn set_latency_after(&self, fetches: u64, latency_ms: DurationMs) {
        *self.latency_after.write().unwrap() = Some((fetches, latency_ms));
    }

    /// Simulate latency on counts only, leaving fetches within budget.
    pub fn set_count_latency_ms(&self, latency_ms: Option<DurationMs>) {
        *self.count_latency_ms.write().unwrap() = latency_ms;
    }

    /// Number of fetches served so far.
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(AtomicOrdering::Relaxed)
    }

    /// Number of counts served so far.
    pub fn count_count(&self) -> u64 {
        self.counts.load(AtomicOrdering::Relaxed)
    }

    pub fn reset_counters(&self) {
        self.fetches.store(0, AtomicOrdering::Relaxed);
        self.counts.store(0, AtomicOrdering::Relaxed);
    }

    fn fetch_latency(&self) -> DurationMs {
        let base = self.latency_ms.read().unwrap().unwrap_or(0);
        match *self.latency_after.read().unwrap() {
            Some((after, late)) if self.fetches.load(AtomicOrdering::Relaxed) > after => {
                base.max(late)
            }
            _ => base,
        }
    }

    fn count_latency(&self) -> DurationMs {
        let base = self.latency_ms.read().unwrap().unwrap_or(0);
        base.max(self.count_latency_ms.read().unwrap().unwrap_or(0))
    }

    fn check_budget(latency: DurationMs, max_time_ms: Option<DurationMs>) -> Result<(), DurationMs> {
        match max_time_ms {
            Some(budget) if latency > budget => Err(budget),
            _ => Ok(()),
        }
    }

    fn sorted_matches(&self, collection: &str, filter: Option<&FilterExpr>, sort: &SortSpec) -> Vec<Document> {
        let collections = self.collections.read().unwrap();
        let mut docs: Vec<Document> = collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|d| filter.map_or(true, |f| f.matches(d)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        docs.sort_by(|a, b| doc_cmp(a, b, sort));
        docs
    }
}

/// Compare two documents under a sort spec.
pub fn doc_cmp(a: &Document, b: &Document, sort: &SortSpec) -> Ordering {
    for field in sort.fields() {
        let cmp = value_cmp(doc_field(a, &field.field), doc_field(b, &field.field));
        let cmp = match field.direction {
            Direction::Ascending => cmp,
            Direction::Descending => cmp.reverse(),
        };
        if cmp != Ordering::Equal {
            return cmp;
        }
    }
    Ordering::Equal
}

#[async_trait]
impl DocumentExecutor for InMemoryExecutor {
    async fn fetch(&self, spec: &FetchSpec) -> Result<Vec<Document>, FetchError> {
        self.fetches.fetch_add(1, AtomicOrdering::Relaxed);
        Self::check_budget(self.fetch_latency(), spec.max_time_ms)
            .map_err(FetchError::timeout)?;
        let docs = self.sorted_matches(&spec.collection, spec.filter.as_ref(), &spec.sort);
        Ok(docs
            .into_iter()
            .skip(spec.skip as usize)
            .take(spec.limit as usize)
            .collect())
    }

    async fn count(
        &self,
        collection: &str,
        filter: Option<&FilterExpr>,
        max_time_ms: Option<DurationMs>,
    ) -> Result<u64, FetchError> {
        self.counts.fetch_add(1, AtomicOrdering::Relaxed);
        Self::check_budget(self.count_latency(), max_time_ms)
            .map_err(|budget| FetchError::CountTimeout {
                max_time_ms: budget,
            })?;
        let collections = self.collections.read().unwrap();
        let count = collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|d| filter.map_or(true, |f| f.matches(d)))
                    .count()
            })
            .unwrap_or(0);
        Ok(count as u64)
    }
}

// ============================================================================
// IN-MEMORY CACHE
// ============================================================================

/// In-memory TTL cache.
#[derive(Default)]
pub struct InMemoryCache {
    entries: RwLock<HashMap<String, (Vec<u8>, Option<Instant>)>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .unwrap()
            .values()
            .filter(|(_, expires)| expires.map_or(true, |at| at > now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry whose key starts with `prefix`. Returns how many
    /// were dropped. Tests use this to simulate bookmark eviction.
    pub fn evict_prefix(&self, prefix: &str) -> usize {
        let mut entries = self.entries.write().unwrap();
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        before - entries.len()
    }

    /// Keys currently stored, for assertions.
    pub fn keys(&self) -> Vec<String> {
        self.entries.read().unwrap().keys().cloned().collect()
    }
}

#[async_trait]
impl KvCache for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let entries = self.entries.read().unwrap();
        Ok(entries.get(key).and_then(|(bytes, expires)| {
            let live = expires.map_or(true, |at| at > Instant::now());
            live.then(|| bytes.clone())
        }))
    }

    async fn put(&self, key: &str, value: Vec<u8>, ttl_ms: DurationMs) -> Result<(), CacheError> {
        let expires = (ttl_ms > 0)
            .then(|| Instant::now() + Duration::from_millis(ttl_ms as u64));
        self.entries
            .write()
            .unwrap()
            .insert(key.to_string(), (value, expires));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.write().unwrap().remove(key);
        Ok(())
    }
}

// ============================================================================
// DATASET BUILDERS
// ============================================================================

/// Build `n` documents with distinct descending `createdAt` timestamps
/// and zero-padded ascending `_id`s, plus a `bucket` field (`i % 7`) for
/// filtered scenarios.
///
/// Sorted by `(createdAt desc, _id asc)` the documents come out in `_id`
/// order, which makes positional assertions trivial.
pub fn timeline_docs(n: usize) -> Vec<Document> {
    let epoch = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    (0..n)
        .map(|i| {
            let doc = json!({
                "_id": format!("doc-{i:06}"),
                "createdAt": (epoch - chrono::Duration::seconds(i as i64)).timestamp_millis(),
                "bucket": (i % 7) as i64,
            });
            serde_json::from_value(doc).unwrap()
        })
        .collect()
}

/// The sort spec the timeline dataset is built for.
pub fn timeline_sort() -> SortSpec {
    SortSpec::new(vec![SortField::desc("createdAt"), SortField::asc("_id")])
}
