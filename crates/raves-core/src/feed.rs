//! Reconciliation of fetched pages into the accumulated review list.
//!
//! [`ReviewFeed`] is the single owned mutable state of the engine. Fetches
//! resolve in arbitrary order, so every outcome is judged by its epoch and
//! page, never by arrival time:
//!
//! 1. Outcomes from an epoch below the committed one are dropped whole —
//!    a slow response for a superseded filter can arrive long after the
//!    newer filter's data was committed, and must not overwrite it.
//! 2. A page-1 success at or above the committed epoch replaces the list
//!    (reset) and pins the committed epoch.
//! 3. A later-page success for exactly the committed epoch appends the
//!    not-yet-seen items (append).
//!
//! Failures report outward and touch nothing.

use crate::error::FetchError;
use crate::model::{Review, ReviewPage};
use crate::request::PageRequest;
use std::collections::HashSet;

/// Resolution of one fetch: the page, or a transient error.
pub type FetchOutcome = Result<ReviewPage, FetchError>;

/// What applying one fetch outcome did to the feed.
#[derive(Debug, Clone, PartialEq)]
pub enum MergeEffect {
    /// The list was replaced wholesale by a page-1 payload.
    Reset { count: usize },
    /// Unseen items from a later page were appended.
    Appended { added: usize, start: usize },
    /// Every item of a later page was already held; nothing changed.
    NothingNew,
    /// The outcome belonged to a superseded epoch (or arrived for a page of
    /// an epoch with no committed page 1) and was dropped whole.
    Stale,
    /// The fetch failed; the list and total are untouched.
    Failed(FetchError),
}

impl MergeEffect {
    /// True when the accumulated list changed.
    #[must_use]
    pub const fn changed(&self) -> bool {
        matches!(self, Self::Reset { .. } | Self::Appended { .. })
    }
}

/// The accumulated, deduplicated review list across paginated fetches.
#[derive(Debug, Clone, Default)]
pub struct ReviewFeed {
    reviews: Vec<Review>,
    seen_ids: HashSet<String>,
    current_epoch: u64,
    new_items_start: usize,
    total: Option<u64>,
}

impl ReviewFeed {
    /// Empty feed: no committed epoch, no reviews.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The accumulated reviews, in merge order.
    #[must_use]
    pub fn reviews(&self) -> &[Review] {
        &self.reviews
    }

    /// Number of accumulated reviews.
    #[must_use]
    pub fn len(&self) -> usize {
        self.reviews.len()
    }

    /// True when nothing has been committed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reviews.is_empty()
    }

    /// The epoch whose data the feed currently holds; 0 before any commit.
    #[must_use]
    pub const fn current_epoch(&self) -> u64 {
        self.current_epoch
    }

    /// Index where the most recent merge began appending; 0 after a reset.
    #[must_use]
    pub const fn new_items_start(&self) -> usize {
        self.new_items_start
    }

    /// Most recently reported total matches for the committed filter.
    #[must_use]
    pub const fn total(&self) -> Option<u64> {
        self.total
    }

    /// True when the upstream reports more matches than are held.
    #[must_use]
    pub fn has_more_reported(&self) -> bool {
        self.total
            .is_some_and(|total| (self.reviews.len() as u64) < total)
    }

    /// Apply one fetch outcome for the request that produced it.
    pub fn apply(&mut self, request: &PageRequest, outcome: FetchOutcome) -> MergeEffect {
        let page = match outcome {
            Ok(page) => page,
            Err(err) => {
                tracing::warn!(epoch = request.epoch, page = request.page, error = %err,
                    "fetch failed, keeping current list");
                return MergeEffect::Failed(err);
            }
        };

        if request.epoch < self.current_epoch {
            tracing::debug!(epoch = request.epoch, current = self.current_epoch,
                "dropping stale response");
            return MergeEffect::Stale;
        }

        if request.page == 1 {
            return self.reset(request, page);
        }

        if request.epoch == self.current_epoch {
            return self.append(request, page);
        }

        // Later page of an epoch whose page 1 never committed. The builder
        // does not produce this ordering; an out-of-order delivery that
        // loses the race against a newer epoch lands here and is dropped.
        tracing::debug!(epoch = request.epoch, page = request.page,
            "dropping later page of an uncommitted epoch");
        MergeEffect::Stale
    }

    /// Replace the list with a page-1 payload, deduplicated, first id wins.
    fn reset(&mut self, request: &PageRequest, page: ReviewPage) -> MergeEffect {
        self.reviews.clear();
        self.seen_ids.clear();
        for review in page.reviews {
            if self.seen_ids.insert(review.id.clone()) {
                self.reviews.push(review);
            }
        }
        self.current_epoch = request.epoch;
        self.new_items_start = 0;
        self.total = Some(page.total);
        tracing::debug!(epoch = self.current_epoch, count = self.reviews.len(),
            total = page.total, "reset committed");
        MergeEffect::Reset {
            count: self.reviews.len(),
        }
    }

    /// Append the unseen subsequence of a later page, preserving its order.
    fn append(&mut self, request: &PageRequest, page: ReviewPage) -> MergeEffect {
        let fresh: Vec<Review> = page
            .reviews
            .into_iter()
            .filter(|r| !self.seen_ids.contains(&r.id))
            .collect();

        // The upstream may legitimately re-serve boundary items; a page of
        // nothing-but-known ids leaves the list and the marker untouched.
        if fresh.is_empty() {
            self.total = Some(page.total);
            return MergeEffect::NothingNew;
        }

        let start = self.reviews.len();
        self.new_items_start = start;
        let mut added = 0usize;
        for review in fresh {
            if self.seen_ids.insert(review.id.clone()) {
                self.reviews.push(review);
                added += 1;
            }
        }
        self.total = Some(page.total);
        tracing::debug!(epoch = request.epoch, page = request.page, added, start,
            "append committed");
        MergeEffect::Appended { added, start }
    }
}
