//! Page requests and their policies.

use crate::cursor::Cursor;
use crate::error::RequestError;
use crate::filter::FilterExpr;
use crate::sort::SortSpec;
use crate::DurationMs;
use serde::{Deserialize, Serialize};

/// Direction a cursor seek moves in.
///
/// `Backward` is the "previous page" direction: every seek inequality is
/// flipped, the fetch runs in reversed sort order, and the returned items
/// are restored to sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeekDirection {
    #[default]
    Forward,
    Backward,
}

/// Bounded native skip policy.
///
/// Literal skip+limit is permitted only while `(page-1)*limit` stays at or
/// below `max_skip`; deeper pages go through the bookmark-hop path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetPolicy {
    pub enabled: bool,
    pub max_skip: u64,
}

impl Default for OffsetPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            max_skip: 10_000,
        }
    }
}

/// Bookmark-hop policy.
///
/// `step` is the checkpoint interval in pages; `max_hops` bounds how many
/// `step * limit` seek fetches one request may spend walking from the
/// nearest bookmark to the target page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HopPolicy {
    pub step: u64,
    pub max_hops: u32,
}

impl Default for HopPolicy {
    fn default() -> Self {
        Self {
            step: 10,
            max_hops: 8,
        }
    }
}

/// How the total-matching-count is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TotalsMode {
    /// Omit totals entirely.
    #[default]
    None,
    /// Exact count, blocking the response.
    Sync,
    /// Respond immediately; a detached count patches the cached result.
    Async,
}

/// A single page request. Created per call, immutable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Collection to page over.
    pub collection: String,
    /// Base filter, applied to every fetch including hop fetches.
    pub filter: Option<FilterExpr>,
    /// Result ordering. A unique tiebreaker is appended when missing.
    pub sort: SortSpec,
    /// Page size. Must be positive.
    pub limit: u64,
    /// 1-based page number. Mutually exclusive with `after`.
    pub page: Option<u64>,
    /// Resume after this boundary. Mutually exclusive with `page`.
    pub after: Option<Cursor>,
    /// Seek direction; only meaningful with `after`.
    pub direction: SeekDirection,
    /// Bounded native-skip policy.
    pub offset_policy: OffsetPolicy,
    /// Bookmark-hop policy.
    pub hop_policy: HopPolicy,
    /// Totals computation mode.
    pub totals_mode: TotalsMode,
    /// Index hint passed through to every fetch.
    pub hint: Option<String>,
    /// Time budget propagated unchanged into every sub-fetch and count.
    pub max_time_ms: Option<DurationMs>,
    /// When set, the whole page result is cached under this TTL.
    pub cache_ttl_ms: Option<DurationMs>,
}

impl PageRequest {
    /// Create a request with default policies; set exactly one of
    /// [`with_page`](Self::with_page) / [`with_after`](Self::with_after)
    /// before use.
    pub fn new(collection: impl Into<String>, sort: SortSpec, limit: u64) -> Self {
        Self {
            collection: collection.into(),
            filter: None,
            sort,
            limit,
            page: None,
            after: None,
            direction: SeekDirection::Forward,
            offset_policy: OffsetPolicy::default(),
            hop_policy: HopPolicy::default(),
            totals_mode: TotalsMode::default(),
            hint: None,
            max_time_ms: None,
            cache_ttl_ms: None,
        }
    }

    /// Set the base filter.
    pub fn with_filter(mut self, filter: FilterExpr) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Request a 1-based page number.
    pub fn with_page(mut self, page: u64) -> Self {
        self.page = Some(page);
        self
    }

    /// Resume after a cursor boundary.
    pub fn with_after(mut self, cursor: Cursor) -> Self {
        self.after = Some(cursor);
        self
    }

    /// Set the seek direction.
    pub fn with_direction(mut self, direction: SeekDirection) -> Self {
        self.direction = direction;
        self
    }

    /// Set the bounded-skip policy.
    pub fn with_offset_policy(mut self, policy: OffsetPolicy) -> Self {
        self.offset_policy = policy;
        self
    }

    /// Set the bookmark-hop policy.
    pub fn with_hop_policy(mut self, policy: HopPolicy) -> Self {
        self.hop_policy = policy;
        self
    }

    /// Set the totals mode.
    pub fn with_totals(mut self, mode: TotalsMode) -> Self {
        self.totals_mode = mode;
        self
    }

    /// Set the index hint.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Set the per-request time budget.
    pub fn with_max_time_ms(mut self, max_time_ms: DurationMs) -> Self {
        self.max_time_ms = Some(max_time_ms);
        self
    }

    /// Cache the whole page result under this TTL.
    pub fn with_cache_ttl_ms(mut self, ttl_ms: DurationMs) -> Self {
        self.cache_ttl_ms = Some(ttl_ms);
        self
    }

    /// Validate the request and normalize the sort spec.
    ///
    /// Returns the request with `{id_field} ascending` appended as a
    /// tiebreaker when the caller omitted one.
    pub fn validated(mut self, id_field: &str) -> Result<Self, RequestError> {
        if self.limit == 0 {
            return Err(RequestError::ZeroLimit);
        }
        match (self.page, &self.after) {
            (Some(_), Some(_)) => return Err(RequestError::ConflictingPageTarget),
            (None, None) => return Err(RequestError::MissingPageTarget),
            (Some(0), None) => return Err(RequestError::ZeroPage),
            _ => {}
        }
        if self.direction == SeekDirection::Backward && self.after.is_none() {
            return Err(RequestError::BackwardWithoutCursor);
        }
        if self.hop_policy.step == 0 {
            return Err(RequestError::ZeroHopStep);
        }
        self.sort = self.sort.with_tiebreaker(id_field);
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sort::SortField;

    fn base() -> PageRequest {
        PageRequest::new(
            "users",
            SortSpec::new(vec![SortField::desc("createdAt")]),
            20,
        )
    }

    #[test]
    fn neither_page_nor_after_is_rejected() {
        assert_eq!(
            base().validated("_id").unwrap_err(),
            RequestError::MissingPageTarget
        );
    }

    #[test]
    fn both_page_and_after_is_rejected() {
        let req = base()
            .with_page(1)
            .with_after(Cursor::from_token("token"));
        assert_eq!(
            req.validated("_id").unwrap_err(),
            RequestError::ConflictingPageTarget
        );
    }

    #[test]
    fn zero_limit_and_zero_page_are_rejected() {
        let mut req = base().with_page(1);
        req.limit = 0;
        assert_eq!(req.validated("_id").unwrap_err(), RequestError::ZeroLimit);
        assert_eq!(
            base().with_page(0).validated("_id").unwrap_err(),
            RequestError::ZeroPage
        );
    }

    #[test]
    fn backward_requires_cursor() {
        let req = base().with_page(3).with_direction(SeekDirection::Backward);
        assert_eq!(
            req.validated("_id").unwrap_err(),
            RequestError::BackwardWithoutCursor
        );
    }

    #[test]
    fn validation_appends_tiebreaker() {
        let req = base().with_page(1).validated("_id").unwrap();
        assert!(req.sort.has_tiebreaker("_id"));
        assert_eq!(req.sort.len(), 2);
    }
}
