//! Page strategy selection.
//!
//! Priority order on a validated request:
//! 1. cursor supplied - direct seek, O(limit);
//! 2. page within the skip ceiling - bounded native skip;
//! 3. deep page - bookmark-assisted hop sequence.
//!
//! The hop path's budget-exhausted fallback (degrade vs. reject) is
//! resolved later by the pager's [`FallbackPolicy`].
//!
//! [`FallbackPolicy`]: crate::pager::FallbackPolicy

use waypoint_core::{Cursor, PageRequest};

/// The strategy chosen for one page request.
#[derive(Debug, Clone, PartialEq)]
pub enum PageStrategy {
    /// Decode the cursor, build the seek predicate, fetch directly.
    Seek { cursor: Cursor },
    /// Native skip+limit, bounded by construction.
    Skip { page: u64, skip: u64 },
    /// Walk from the nearest bookmark at or below `checkpoint_index`.
    Hop { page: u64, checkpoint_index: u64 },
}

/// Select the strategy for a validated request.
pub fn select(request: &PageRequest) -> PageStrategy {
    if let Some(cursor) = &request.after {
        return PageStrategy::Seek {
            cursor: cursor.clone(),
        };
    }
    // Validation guarantees `page` is present and >= 1 past this point.
    let page = request.page.unwrap_or(1);
    if request.offset_policy.enabled {
        // An overflowing product can never sit under the ceiling.
        if let Some(skip) = (page - 1).checked_mul(request.limit) {
            if skip <= request.offset_policy.max_skip {
                return PageStrategy::Skip { page, skip };
            }
        }
    }
    PageStrategy::Hop {
        page,
        checkpoint_index: (page - 1) / request.hop_policy.step,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waypoint_core::{OffsetPolicy, SortField, SortSpec};

    fn request(limit: u64) -> PageRequest {
        PageRequest::new(
            "users",
            SortSpec::new(vec![SortField::desc("createdAt")]),
            limit,
        )
    }

    #[test]
    fn cursor_always_wins() {
        let req = request(20)
            .with_after(Cursor::from_token("t"))
            .validated("_id")
            .unwrap();
        assert!(matches!(select(&req), PageStrategy::Seek { .. }));
    }

    #[test]
    fn shallow_page_uses_bounded_skip() {
        let req = request(20).with_page(3).validated("_id").unwrap();
        assert_eq!(select(&req), PageStrategy::Skip { page: 3, skip: 40 });
    }

    #[test]
    fn skip_boundary_is_inclusive() {
        let mut req = request(100).with_page(101).validated("_id").unwrap();
        req.offset_policy = OffsetPolicy {
            enabled: true,
            max_skip: 10_000,
        };
        // (101-1)*100 == 10_000, exactly at the ceiling.
        assert_eq!(
            select(&req),
            PageStrategy::Skip {
                page: 101,
                skip: 10_000
            }
        );
    }

    #[test]
    fn deep_page_hops() {
        let req = request(20).with_page(10_000).validated("_id").unwrap();
        // step defaults to 10: (10000-1)/10 == 999.
        assert_eq!(
            select(&req),
            PageStrategy::Hop {
                page: 10_000,
                checkpoint_index: 999
            }
        );
    }

    #[test]
    fn astronomical_page_never_overflows_into_skip() {
        let req = request(20).with_page(u64::MAX).validated("_id").unwrap();
        // (u64::MAX - 1) * 20 wraps; the wrapped value must not be
        // mistaken for a shallow skip.
        assert!(matches!(select(&req), PageStrategy::Hop { .. }));
    }

    #[test]
    fn disabled_offset_forces_hops_even_for_page_one() {
        let mut req = request(20).with_page(1).validated("_id").unwrap();
        req.offset_policy.enabled = false;
        assert_eq!(
            select(&req),
            PageStrategy::Hop {
                page: 1,
                checkpoint_index: 0
            }
        );
    }
}
