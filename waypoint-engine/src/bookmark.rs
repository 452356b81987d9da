//! Bookmark store: advisory cursor checkpoints over the injected cache.
//!
//! A bookmark records the cursor reached at a checkpoint boundary of a
//! query shape. Bookmarks are hints, never truth: losing one only forces
//! a more expensive strategy, and a stale one is re-verified against live
//! data by the hop executor. Writes are fire-and-forget with
//! last-write-wins semantics - no compare-and-swap, no locks.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use waypoint_core::{Cursor, DurationMs, Timestamp};

use crate::executor::KvCache;

/// A cached cursor checkpoint for one query shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bookmark {
    pub fingerprint: String,
    /// `(page - 1) / step` of the first page this checkpoint covers.
    pub checkpoint_index: u64,
    /// Boundary reached at the checkpoint: the cursor after document
    /// `checkpoint_index * step * limit`.
    pub cursor: Cursor,
    pub created_at: Timestamp,
}

/// Thin addressing scheme over the external cache.
pub struct BookmarkStore<C> {
    cache: Arc<C>,
}

impl<C: KvCache> BookmarkStore<C> {
    pub fn new(cache: Arc<C>) -> Self {
        Self { cache }
    }

    fn key(fingerprint: &str, checkpoint_index: u64) -> String {
        format!("pg:{fingerprint}:{checkpoint_index}")
    }

    /// Read a bookmark. Any cache failure or corrupt entry is a miss.
    pub async fn get(&self, fingerprint: &str, checkpoint_index: u64) -> Option<Bookmark> {
        let key = Self::key(fingerprint, checkpoint_index);
        let bytes = match self.cache.get(&key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(error) => {
                debug!(%key, %error, "bookmark read failed; treating as miss");
                return None;
            }
        };
        match serde_json::from_slice::<Bookmark>(&bytes) {
            Ok(bookmark) => Some(bookmark),
            Err(error) => {
                debug!(%key, %error, "bookmark entry corrupt; treating as miss");
                None
            }
        }
    }

    /// Write a bookmark. Failures only cost a future optimization and are
    /// swallowed - a page request must never fail on cache trouble.
    pub async fn put(&self, bookmark: &Bookmark, ttl_ms: DurationMs) {
        let key = Self::key(&bookmark.fingerprint, bookmark.checkpoint_index);
        let bytes = match serde_json::to_vec(bookmark) {
            Ok(bytes) => bytes,
            Err(error) => {
                debug!(%key, %error, "bookmark serialization failed");
                return;
            }
        };
        if let Err(error) = self.cache.put(&key, bytes, ttl_ms).await {
            debug!(%key, %error, "bookmark write failed; skipping");
        }
    }
}
