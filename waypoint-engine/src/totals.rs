//! Totals calculation: none, blocking exact count, or detached count.

use chrono::Utc;
use std::sync::Arc;
use tracing::debug;
use waypoint_core::{
    DurationMs, FetchError, PageResult, PagerError, PageRequest, Totals, TotalsMode,
};

use crate::executor::{DocumentExecutor, KvCache};

/// Run an exact count, blocking the response.
pub(crate) async fn sync_totals<E: DocumentExecutor>(
    executor: &E,
    request: &PageRequest,
) -> Result<Totals, PagerError> {
    let value = executor
        .count(
            &request.collection,
            request.filter.as_ref(),
            request.max_time_ms,
        )
        .await
        .map_err(count_error)?;
    Ok(Totals::exact(value, TotalsMode::Sync, Utc::now()))
}

/// A fetch-shaped timeout from a count surfaces as `CountTimeout`.
fn count_error(error: FetchError) -> PagerError {
    match error {
        FetchError::FetchTimeout { max_time_ms, .. } => {
            FetchError::CountTimeout { max_time_ms }.into()
        }
        other => other.into(),
    }
}

/// Trigger a detached count.
///
/// On completion the count patches the cached page-result envelope (when
/// result caching is enabled) so subsequent identical requests observe
/// the value. Without a cache key the result is discarded after a log.
pub(crate) fn spawn_async_totals<E, C>(
    executor: Arc<E>,
    cache: Arc<C>,
    request: PageRequest,
    result_key: Option<String>,
) where
    E: DocumentExecutor + 'static,
    C: KvCache + 'static,
{
    tokio::spawn(async move {
        let count = executor
            .count(
                &request.collection,
                request.filter.as_ref(),
                request.max_time_ms,
            )
            .await;
        let value = match count {
            Ok(value) => value,
            Err(error) => {
                debug!(collection = %request.collection, %error, "detached count failed");
                return;
            }
        };
        let (Some(key), Some(ttl_ms)) = (result_key, request.cache_ttl_ms) else {
            debug!(collection = %request.collection, value, "detached count discarded; result caching disabled");
            return;
        };
        patch_cached_totals(cache.as_ref(), &key, value, ttl_ms).await;
    });
}

/// Patch the totals of a cached envelope. Best-effort: the entry may have
/// been evicted between the page response and the count completing.
async fn patch_cached_totals<C: KvCache>(cache: &C, key: &str, value: u64, ttl_ms: DurationMs) {
    let bytes = match cache.get(key).await {
        Ok(Some(bytes)) => bytes,
        Ok(None) => return,
        Err(error) => {
            debug!(%key, %error, "cached envelope read failed; dropping count");
            return;
        }
    };
    let Ok(mut envelope) = serde_json::from_slice::<PageResult>(&bytes) else {
        return;
    };
    envelope.totals.value = Some(value);
    envelope.totals.pending = false;
    envelope.totals.computed_at = Some(Utc::now());
    let Ok(bytes) = serde_json::to_vec(&envelope) else {
        return;
    };
    if let Err(error) = cache.put(key, bytes, ttl_ms).await {
        debug!(%key, %error, "cached envelope write failed; dropping count");
    }
}
