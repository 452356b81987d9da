//! Hop executor: bounded seek walks from the nearest bookmark.
//!
//! Walking to page `p` with checkpoint step `s` means crossing the
//! checkpoints between the nearest known bookmark and `(p-1)/s`, one seek
//! fetch of `s * limit` documents per checkpoint. Every boundary crossed
//! writes a fresh bookmark, so repeated access to nearby deep pages gets
//! progressively cheaper and evicted bookmarks regenerate under normal
//! traffic. The final window fetch adds a native skip bounded below
//! `s * limit` for the intra-checkpoint remainder.

use chrono::Utc;
use serde_json::Value;
use tracing::debug;
use waypoint_core::{Document, FetchError, FilterExpr, PageRequest, PagerError, SeekDirection};

use crate::bookmark::{Bookmark, BookmarkStore};
use crate::cursor::{boundary_values, decode_cursor, encode_cursor, seek_predicate};
use crate::executor::{DocumentExecutor, FetchSpec, KvCache};

/// Outcome of a hop walk.
#[derive(Debug)]
pub(crate) enum HopOutcome {
    /// The target window was fetched (`limit + 1` documents, possibly
    /// fewer or none when the collection ends first).
    Reached { window: Vec<Document>, hops: u32 },
    /// More hops were needed than the policy allows; the pager applies
    /// its fallback policy.
    BudgetExhausted { hops_needed: u32 },
}

/// Stamp the walk's hop count onto a timeout so the error reports how
/// far the walk got before the budget ran out.
fn with_hops(error: PagerError, hops: u32) -> PagerError {
    match error {
        PagerError::Fetch(FetchError::FetchTimeout {
            max_time_ms,
            strategy,
            ..
        }) => PagerError::Fetch(FetchError::FetchTimeout {
            max_time_ms,
            strategy,
            hops_attempted: hops,
        }),
        other => other,
    }
}

pub(crate) struct HopExecutor<'a, E, C> {
    pub executor: &'a E,
    pub bookmarks: &'a BookmarkStore<C>,
}

impl<E: DocumentExecutor, C: KvCache> HopExecutor<'_, E, C> {
    /// Walk from the nearest bookmark to page `page`.
    pub async fn run(
        &self,
        request: &PageRequest,
        fingerprint: &str,
        page: u64,
        checkpoint_index: u64,
        bookmark_ttl_ms: i64,
    ) -> Result<HopOutcome, PagerError> {
        let step = request.hop_policy.step;
        let max_hops = request.hop_policy.max_hops;
        let limit = request.limit;

        let (start_index, mut boundary) = self
            .nearest_bookmark(request, fingerprint, checkpoint_index, max_hops)
            .await;

        let hops_needed = checkpoint_index - start_index;
        if hops_needed > u64::from(max_hops) {
            return Ok(HopOutcome::BudgetExhausted {
                hops_needed: hops_needed.min(u64::from(u32::MAX)) as u32,
            });
        }

        let hop_span = step.saturating_mul(limit);
        let mut hops = 0u32;
        for crossed in start_index..checkpoint_index {
            let docs = self
                .fetch_from(request, boundary.as_deref(), hop_span, 0)
                .await
                .map_err(|e| with_hops(e, hops))?;
            hops += 1;
            if (docs.len() as u64) < hop_span {
                // Collection ended before the target page.
                return Ok(HopOutcome::Reached {
                    window: Vec::new(),
                    hops,
                });
            }
            if let Some(last) = docs.last() {
                boundary = Some(boundary_values(last, &request.sort));
                let bookmark = Bookmark {
                    fingerprint: fingerprint.to_string(),
                    checkpoint_index: crossed + 1,
                    cursor: encode_cursor(last, &request.sort),
                    created_at: Utc::now(),
                };
                self.bookmarks.put(&bookmark, bookmark_ttl_ms).await;
            }
        }

        // Intra-checkpoint remainder, strictly below step * limit.
        let remainder_skip = ((page - 1) - checkpoint_index * step).saturating_mul(limit);
        let window = self
            .fetch_from(request, boundary.as_deref(), limit + 1, remainder_skip)
            .await
            .map_err(|e| with_hops(e, hops))?;
        Ok(HopOutcome::Reached { window, hops })
    }

    /// Probe for the nearest usable bookmark at or below the target
    /// checkpoint. A bookmark whose cursor fails to decode (evicted shape
    /// collision, foreign sort spec) is discarded as stale.
    async fn nearest_bookmark(
        &self,
        request: &PageRequest,
        fingerprint: &str,
        checkpoint_index: u64,
        max_hops: u32,
    ) -> (u64, Option<Vec<Value>>) {
        let floor = checkpoint_index.saturating_sub(u64::from(max_hops)).max(1);
        let mut index = checkpoint_index;
        while index >= floor {
            if let Some(bookmark) = self.bookmarks.get(fingerprint, index).await {
                match decode_cursor(&bookmark.cursor, &request.sort) {
                    Ok(boundary) => return (index, Some(boundary)),
                    Err(error) => {
                        debug!(%fingerprint, index, %error, "stale bookmark discarded");
                    }
                }
            }
            index -= 1;
        }
        (0, None)
    }

    async fn fetch_from(
        &self,
        request: &PageRequest,
        boundary: Option<&[Value]>,
        limit: u64,
        skip: u64,
    ) -> Result<Vec<Document>, PagerError> {
        let seek = boundary.map(|b| seek_predicate(b, &request.sort, SeekDirection::Forward));
        let filter = FilterExpr::and_opt(request.filter.clone(), seek);
        let spec = FetchSpec::new(&request.collection, request.sort.clone(), limit)
            .with_filter(filter)
            .with_skip(skip)
            .with_hint(request.hint.clone())
            .with_max_time_ms(request.max_time_ms);
        Ok(self.executor.fetch(&spec).await?)
    }
}
