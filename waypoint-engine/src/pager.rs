//! Page assembler: the engine's single entry point.
//!
//! Validates the request, selects a strategy, executes the base fetch
//! (always `limit + 1` documents to detect the next page without an
//! extra round trip), builds the result envelope, delegates totals, and
//! optionally caches the whole envelope.

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};
use waypoint_core::{
    Document, DurationMs, FetchError, FilterExpr, PageInfo, PageMeta, PageRequest, PageResult,
    PagerError, PagerResult, SeekDirection, SortSpec, StrategyKind, Totals, TotalsMode,
};

use crate::bookmark::BookmarkStore;
use crate::cursor::{decode_cursor, encode_cursor, seek_predicate};
use crate::executor::{DocumentExecutor, FetchSpec, KvCache};
use crate::fingerprint::fingerprint;
use crate::hop::{HopExecutor, HopOutcome};
use crate::strategy::{self, PageStrategy};
use crate::totals;

/// What to do when the hop budget is exhausted and skip is over budget
/// or disallowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FallbackPolicy {
    /// Serve the page with a literal skip anyway and set
    /// `meta.cost_warning`. Silently failing a read is worse than an
    /// occasional slow one.
    #[default]
    DegradeWithWarning,
    /// Reject with `PageUnreachable`.
    Reject,
}

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct PagerConfig {
    /// Unique-per-document field appended as a sort tiebreaker when the
    /// caller omits one.
    pub id_field: String,
    /// Behavior when a deep page is not reachable within the hop budget.
    pub fallback: FallbackPolicy,
    /// TTL for bookmark checkpoints.
    pub bookmark_ttl_ms: DurationMs,
}

impl Default for PagerConfig {
    fn default() -> Self {
        Self {
            id_field: "_id".to_string(),
            fallback: FallbackPolicy::default(),
            bookmark_ttl_ms: 3_600_000,
        }
    }
}

impl PagerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the unique tiebreaker field.
    pub fn with_id_field(mut self, id_field: impl Into<String>) -> Self {
        self.id_field = id_field.into();
        self
    }

    /// Set the hop-budget fallback policy.
    pub fn with_fallback(mut self, fallback: FallbackPolicy) -> Self {
        self.fallback = fallback;
        self
    }

    /// Set the bookmark TTL.
    pub fn with_bookmark_ttl_ms(mut self, ttl_ms: DurationMs) -> Self {
        self.bookmark_ttl_ms = ttl_ms;
        self
    }
}

/// The page assembler.
///
/// Holds the two injected collaborators and no other state; concurrent
/// requests share nothing but the external cache, on which every
/// operation is a single atomic remote call.
pub struct Pager<E, C> {
    executor: Arc<E>,
    cache: Arc<C>,
    bookmarks: BookmarkStore<C>,
    config: PagerConfig,
}

impl<E, C> Pager<E, C>
where
    E: DocumentExecutor + 'static,
    C: KvCache + 'static,
{
    pub fn new(executor: Arc<E>, cache: Arc<C>, config: PagerConfig) -> Self {
        Self {
            executor,
            bookmarks: BookmarkStore::new(cache.clone()),
            cache,
            config,
        }
    }

    pub fn with_defaults(executor: Arc<E>, cache: Arc<C>) -> Self {
        Self::new(executor, cache, PagerConfig::default())
    }

    pub fn config(&self) -> &PagerConfig {
        &self.config
    }

    /// Serve one page request.
    pub async fn page(&self, request: PageRequest) -> PagerResult<PageResult> {
        let request = request.validated(&self.config.id_field)?;
        let shape = fingerprint(
            &request.collection,
            request.filter.as_ref(),
            &request.sort,
            request.limit,
        );

        let result_key = request.cache_ttl_ms.map(|_| result_key(&shape, &request));
        if let Some(key) = &result_key {
            if let Some(cached) = self.cached_result(key).await {
                debug!(%key, "page result served from cache");
                return Ok(cached);
            }
        }

        let strategy = strategy::select(&request);
        debug!(fingerprint = %shape, ?strategy, "strategy selected");
        let (window, meta, page_number) = match strategy {
            PageStrategy::Seek { cursor } => {
                let boundary = decode_cursor(&cursor, &request.sort)?;
                let window = self.seek_fetch(&request, &boundary).await?;
                (window, PageMeta::new(StrategyKind::Seek), None)
            }
            PageStrategy::Skip { page, skip } => {
                let window = self.skip_fetch(&request, skip).await?;
                (window, PageMeta::new(StrategyKind::Skip), Some(page))
            }
            PageStrategy::Hop {
                page,
                checkpoint_index,
            } => {
                let (window, meta) = self.hop_fetch(&request, &shape, page, checkpoint_index).await?;
                (window, meta, Some(page))
            }
        };

        let totals = match request.totals_mode {
            TotalsMode::None => Totals::omitted(),
            TotalsMode::Sync => totals::sync_totals(self.executor.as_ref(), &request).await?,
            TotalsMode::Async => Totals::pending(),
        };

        let result = assemble(&request, window, meta, page_number, totals);

        if let Some(key) = &result_key {
            self.cache_result(key, &result, &request).await;
        }
        if request.totals_mode == TotalsMode::Async {
            totals::spawn_async_totals(
                self.executor.clone(),
                self.cache.clone(),
                request,
                result_key,
            );
        }
        Ok(result)
    }

    /// Direct seek from a decoded boundary. O(limit).
    async fn seek_fetch(
        &self,
        request: &PageRequest,
        boundary: &[Value],
    ) -> PagerResult<Vec<Document>> {
        let seek = seek_predicate(boundary, &request.sort, request.direction);
        let sort = match request.direction {
            SeekDirection::Forward => request.sort.clone(),
            SeekDirection::Backward => request.sort.reversed(),
        };
        let spec = self
            .base_spec(request, sort, request.limit + 1)
            .with_filter(FilterExpr::and_opt(request.filter.clone(), Some(seek)));
        self.executor
            .fetch(&spec)
            .await
            .map_err(|e| fetch_context(e, StrategyKind::Seek))
    }

    /// Bounded native skip.
    async fn skip_fetch(&self, request: &PageRequest, skip: u64) -> PagerResult<Vec<Document>> {
        let spec = self
            .base_spec(request, request.sort.clone(), request.limit + 1)
            .with_filter(request.filter.clone())
            .with_skip(skip);
        self.executor
            .fetch(&spec)
            .await
            .map_err(|e| fetch_context(e, StrategyKind::Skip))
    }

    /// Bookmark-assisted hop walk, with the configured fallback when the
    /// budget does not reach the target page.
    async fn hop_fetch(
        &self,
        request: &PageRequest,
        shape: &str,
        page: u64,
        checkpoint_index: u64,
    ) -> PagerResult<(Vec<Document>, PageMeta)> {
        let hopper = HopExecutor {
            executor: self.executor.as_ref(),
            bookmarks: &self.bookmarks,
        };
        let outcome = hopper
            .run(
                request,
                shape,
                page,
                checkpoint_index,
                self.config.bookmark_ttl_ms,
            )
            .await
            .map_err(|e| match e {
                PagerError::Fetch(fetch) => fetch_context(fetch, StrategyKind::Hop),
                other => other,
            })?;
        match outcome {
            HopOutcome::Reached { window, hops } => {
                let mut meta = PageMeta::new(StrategyKind::Hop);
                meta.hops = hops;
                Ok((window, meta))
            }
            HopOutcome::BudgetExhausted { hops_needed } => match self.config.fallback {
                FallbackPolicy::Reject => Err(FetchError::PageUnreachable {
                    page,
                    hops_needed,
                    max_hops: request.hop_policy.max_hops,
                }
                .into()),
                FallbackPolicy::DegradeWithWarning => {
                    warn!(
                        page,
                        hops_needed,
                        max_hops = request.hop_policy.max_hops,
                        "hop budget exhausted; degrading to literal skip"
                    );
                    // A saturated skip lies past any real collection and
                    // fetches an empty window.
                    let skip = (page - 1).saturating_mul(request.limit);
                    let window = self.skip_fetch(request, skip).await?;
                    let mut meta = PageMeta::new(StrategyKind::Skip);
                    meta.cost_warning = true;
                    Ok((window, meta))
                }
            },
        }
    }

    fn base_spec(&self, request: &PageRequest, sort: SortSpec, limit: u64) -> FetchSpec {
        FetchSpec::new(&request.collection, sort, limit)
            .with_hint(request.hint.clone())
            .with_max_time_ms(request.max_time_ms)
    }

    /// Replay a cached envelope. Any failure is a miss.
    async fn cached_result(&self, key: &str) -> Option<PageResult> {
        let bytes = match self.cache.get(key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(error) => {
                debug!(%key, %error, "result cache read failed; treating as miss");
                return None;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(result) => Some(result),
            Err(error) => {
                debug!(%key, %error, "result cache entry corrupt; treating as miss");
                None
            }
        }
    }

    /// Store the whole envelope. Failures are swallowed.
    async fn cache_result(&self, key: &str, result: &PageResult, request: &PageRequest) {
        let Some(ttl_ms) = request.cache_ttl_ms else {
            return;
        };
        let bytes = match serde_json::to_vec(result) {
            Ok(bytes) => bytes,
            Err(error) => {
                debug!(%key, %error, "result serialization failed");
                return;
            }
        };
        if let Err(error) = self.cache.put(key, bytes, ttl_ms).await {
            debug!(%key, %error, "result cache write failed; skipping");
        }
    }
}

/// Cache key for a whole page result: fingerprint plus page/cursor
/// identity plus direction plus totals mode. Requests that differ in
/// totals mode produce different envelopes and must not share an entry.
fn result_key(shape: &str, request: &PageRequest) -> String {
    use sha2::{Digest, Sha256};
    let identity = match (&request.page, &request.after) {
        (Some(page), _) => format!("p{page}"),
        (None, Some(cursor)) => {
            let digest = Sha256::digest(cursor.as_str().as_bytes());
            let direction = match request.direction {
                SeekDirection::Forward => "f",
                SeekDirection::Backward => "b",
            };
            format!("c{}:{direction}", hex::encode(&digest[..8]))
        }
        (None, None) => "p1".to_string(),
    };
    let totals = match request.totals_mode {
        TotalsMode::None => "tn",
        TotalsMode::Sync => "ts",
        TotalsMode::Async => "ta",
    };
    format!("pgres:{shape}:{identity}:{totals}")
}

/// Enrich an executor timeout with the strategy context the caller
/// needs. `hops_attempted` passes through: executors report 0, and the
/// hop walk stamps its count before the error reaches here.
fn fetch_context(error: FetchError, strategy: StrategyKind) -> PagerError {
    match error {
        FetchError::FetchTimeout {
            max_time_ms,
            hops_attempted,
            ..
        } => FetchError::FetchTimeout {
            max_time_ms,
            strategy: Some(strategy),
            hops_attempted,
        }
        .into(),
        other => other.into(),
    }
}

/// Build the result envelope from a fetched window.
fn assemble(
    request: &PageRequest,
    mut window: Vec<Document>,
    meta: PageMeta,
    page_number: Option<u64>,
    totals: Totals,
) -> PageResult {
    let limit = request.limit as usize;
    let extra = window.len() > limit;
    window.truncate(limit);

    let backward =
        request.after.is_some() && request.direction == SeekDirection::Backward;
    if backward {
        // The fetch ran in reversed order; restore sort order.
        window.reverse();
    }

    let effective_skip = page_number.map_or(0, |p| (p - 1).saturating_mul(request.limit));
    let (has_next_page, has_previous_page) = if backward {
        (true, true)
    } else {
        (extra, effective_skip > 0)
    };

    let start_cursor = window.first().map(|d| encode_cursor(d, &request.sort));
    let end_cursor = window.last().map(|d| encode_cursor(d, &request.sort));

    PageResult {
        items: window,
        page_info: PageInfo {
            start_cursor,
            end_cursor,
            has_next_page,
            has_previous_page,
            page_number,
        },
        totals,
        meta,
    }
}
