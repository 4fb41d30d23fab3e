//! Session layer: request building, reconciliation, and the view contract.
//!
//! [`FeedSession`] is the single mutation entry point. It owns the request
//! builder and the feed, tracks which requests are outstanding, and
//! re-derives the display groups synchronously on every state change, so a
//! presentation adapter that reads [`FeedSession::view`] after each
//! [`FeedSession::complete`] always sees groups consistent with the list.
//!
//! The session performs no I/O. The caller hands built descriptors to a
//! [`ReviewSource`] and feeds each resolution back in, in whatever order
//! the fetches happen to finish.

use crate::bucket::{ReviewGroup, group_by_date};
use crate::error::{FetchError, RequestError};
use crate::feed::{FetchOutcome, MergeEffect, ReviewFeed};
use crate::filter::Filter;
use crate::model::ReviewPage;
use crate::request::{PageRequest, RequestBuilder};
use chrono::{DateTime, Utc};
use std::fmt;

/// The fetch collaborator: resolves one page request.
///
/// Implementations decide transport, timeouts, and retries; the engine only
/// distinguishes success from failure.
pub trait ReviewSource {
    /// Fetch the page a request describes.
    fn fetch(&self, request: &PageRequest) -> Result<ReviewPage, FetchError>;
}

/// Coarse display state, for empty-state rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedHealth {
    /// At least one review is held.
    Populated,
    /// Nothing held, nothing outstanding.
    Empty,
    /// Nothing held, a fetch is outstanding.
    Loading,
}

impl fmt::Display for FeedHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Populated => f.write_str("populated"),
            Self::Empty => f.write_str("empty"),
            Self::Loading => f.write_str("loading"),
        }
    }
}

/// Read-only snapshot handed to the presentation adapter.
#[derive(Debug, Clone, Copy)]
pub struct FeedView<'a> {
    /// Ordered temporal groups, re-derived on every state change.
    pub groups: &'a [ReviewGroup],
    /// More matches are reported upstream, or a next-page fetch is outstanding.
    pub has_more: bool,
    /// Nothing committed yet and a fetch is outstanding.
    pub initial_loading: bool,
    /// A page beyond the first is outstanding.
    pub loading_more: bool,
    /// A page-1 fetch for a newer filter is outstanding while an older
    /// filter's reviews are still held. Render as loading, never as content.
    pub data_inconsistency: bool,
    /// Index where the most recent merge began appending; scroll target.
    pub new_items_start: usize,
    /// Most recently reported total for the committed filter.
    pub total: Option<u64>,
    /// Most recent transient failure, cleared by the next success.
    pub error: Option<&'a FetchError>,
}

impl FeedView<'_> {
    /// Coarse display state for empty-state handling.
    #[must_use]
    pub const fn health(&self) -> FeedHealth {
        if !self.groups.is_empty() {
            FeedHealth::Populated
        } else if self.initial_loading || self.data_inconsistency {
            FeedHealth::Loading
        } else {
            FeedHealth::Empty
        }
    }
}

/// Owns the accumulated state and every mutation of it.
#[derive(Debug, Clone, Default)]
pub struct FeedSession {
    builder: RequestBuilder,
    feed: ReviewFeed,
    in_flight: Vec<PageRequest>,
    groups: Vec<ReviewGroup>,
    last_error: Option<FetchError>,
}

impl FeedSession {
    /// Fresh session: no epoch, no reviews, nothing outstanding.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a filter intent and mark the built request outstanding.
    ///
    /// The caller must resolve the returned request through its fetch
    /// collaborator and hand the outcome to [`FeedSession::complete`].
    pub fn set_filter(&mut self, filter: Filter) -> PageRequest {
        let request = self.builder.filter_change(filter);
        self.in_flight.push(request.clone());
        request
    }

    /// Apply a load-more intent and mark the built request outstanding.
    pub fn load_more(&mut self) -> Result<PageRequest, RequestError> {
        let request = self.builder.load_more()?;
        self.in_flight.push(request.clone());
        Ok(request)
    }

    /// Re-issue the most recently built request, for retry after a failure.
    pub fn retry_last(&mut self) -> Option<PageRequest> {
        let request = self.builder.last_request()?.clone();
        if !self.in_flight.contains(&request) {
            self.in_flight.push(request.clone());
        }
        Some(request)
    }

    /// Resolve one outstanding request with its fetch outcome.
    ///
    /// Groups are recomputed against `now` before this returns whenever the
    /// accumulated list changed.
    pub fn complete(
        &mut self,
        request: &PageRequest,
        outcome: FetchOutcome,
        now: DateTime<Utc>,
    ) -> MergeEffect {
        if let Some(position) = self.in_flight.iter().position(|r| r == request) {
            self.in_flight.remove(position);
        }

        if let Ok(page) = &outcome {
            // Builder ignores page counts from superseded epochs itself.
            self.builder.record_response(request.epoch, page.pages);
        }

        let effect = self.feed.apply(request, outcome);
        match &effect {
            MergeEffect::Failed(err) => self.last_error = Some(err.clone()),
            MergeEffect::Reset { .. } | MergeEffect::Appended { .. } | MergeEffect::NothingNew => {
                self.last_error = None;
            }
            MergeEffect::Stale => {}
        }

        if effect.changed() {
            self.groups = group_by_date(self.feed.reviews(), now);
        }
        effect
    }

    /// Read-only snapshot for the presentation adapter.
    #[must_use]
    pub fn view(&self) -> FeedView<'_> {
        let current_epoch = self.feed.current_epoch();
        let next_page_outstanding = self
            .in_flight
            .iter()
            .any(|r| r.page > 1 && r.epoch == current_epoch);
        let newer_reset_outstanding = self
            .in_flight
            .iter()
            .any(|r| r.page == 1 && r.epoch > current_epoch);

        FeedView {
            groups: &self.groups,
            has_more: self.feed.has_more_reported() || next_page_outstanding,
            initial_loading: self.feed.is_empty() && !self.in_flight.is_empty(),
            loading_more: self.in_flight.iter().any(|r| r.page > 1),
            data_inconsistency: newer_reset_outstanding && !self.feed.is_empty(),
            new_items_start: self.feed.new_items_start(),
            total: self.feed.total(),
            error: self.last_error.as_ref(),
        }
    }

    /// The accumulated feed (read-only).
    #[must_use]
    pub const fn feed(&self) -> &ReviewFeed {
        &self.feed
    }

    /// Requests issued but not yet resolved.
    #[must_use]
    pub fn outstanding(&self) -> &[PageRequest] {
        &self.in_flight
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Review;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 10, 0, 0).unwrap()
    }

    fn review(id: &str, day: u32) -> Review {
        Review {
            id: id.to_string(),
            author: None,
            body: String::new(),
            posted_at: Utc.with_ymd_and_hms(2024, 3, day, 9, 0, 0).unwrap(),
            stars: "4.00".parse().expect("valid rating"),
            title: String::new(),
            version: None,
            country: None,
            product_id: None,
        }
    }

    fn page_of(ids: &[(&str, u32)], total: u64, pages: u32, this_page: u32) -> ReviewPage {
        ReviewPage {
            reviews: ids.iter().map(|(id, day)| review(id, *day)).collect(),
            total,
            pages,
            this_page,
        }
    }

    fn keyword(k: &str) -> Filter {
        Filter::new(Some(k), [])
    }

    // === Happy path ===

    #[test]
    fn filter_then_load_more_builds_grouped_view() {
        let mut session = FeedSession::new();

        let first = session.set_filter(Filter::default());
        session.complete(
            &first,
            Ok(page_of(&[("a", 15), ("b", 14)], 4, 2, 1)),
            now(),
        );

        let view = session.view();
        assert_eq!(view.groups.len(), 2);
        assert_eq!(view.groups[0].label, "Today");
        assert_eq!(view.groups[1].label, "Yesterday");
        assert!(view.has_more);
        assert_eq!(view.new_items_start, 0);

        let second = session.load_more().expect("page 2 available");
        session.complete(
            &second,
            Ok(page_of(&[("c", 14), ("d", 11)], 4, 2, 2)),
            now(),
        );

        let view = session.view();
        assert_eq!(view.new_items_start, 2);
        assert!(!view.has_more);
        assert_eq!(view.health(), FeedHealth::Populated);
    }

    #[test]
    fn groups_are_recomputed_synchronously_on_completion() {
        let mut session = FeedSession::new();
        let request = session.set_filter(Filter::default());
        assert!(session.view().groups.is_empty());

        session.complete(&request, Ok(page_of(&[("a", 15)], 1, 1, 1)), now());
        assert_eq!(session.view().groups.len(), 1);
    }

    // === Loading flags ===

    #[test]
    fn initial_loading_until_first_completion() {
        let mut session = FeedSession::new();
        let request = session.set_filter(Filter::default());

        let view = session.view();
        assert!(view.initial_loading);
        assert_eq!(view.health(), FeedHealth::Loading);

        session.complete(&request, Ok(page_of(&[("a", 15)], 1, 1, 1)), now());
        assert!(!session.view().initial_loading);
    }

    #[test]
    fn loading_more_and_has_more_while_next_page_outstanding() {
        let mut session = FeedSession::new();
        let first = session.set_filter(Filter::default());
        // Upstream reports exactly the held count, so total alone says done.
        session.complete(&first, Ok(page_of(&[("a", 15)], 1, 2, 1)), now());
        assert!(!session.view().has_more);

        // But a later response may still report more pages; simulate one.
        session.complete(&first, Ok(page_of(&[("a", 15)], 2, 2, 1)), now());
        let second = session.load_more().expect("page 2 reported");
        let view = session.view();
        assert!(view.loading_more);
        assert!(view.has_more, "outstanding next page keeps has_more on");

        session.complete(&second, Ok(page_of(&[("b", 14)], 2, 2, 2)), now());
        let view = session.view();
        assert!(!view.loading_more);
        assert!(!view.has_more);
    }

    // === Stale responses across epochs ===

    #[test]
    fn slow_superseded_filter_cannot_overwrite_newer_results() {
        let mut session = FeedSession::new();
        let slow = session.set_filter(keyword("old"));
        let fast = session.set_filter(keyword("new"));

        // The newer epoch resolves first and commits.
        session.complete(&fast, Ok(page_of(&[("new-1", 15)], 1, 1, 1)), now());
        let committed: Vec<String> = session
            .feed()
            .reviews()
            .iter()
            .map(|r| r.id.clone())
            .collect();

        // The superseded epoch's response finally arrives.
        let effect = session.complete(&slow, Ok(page_of(&[("old-1", 15)], 1, 1, 1)), now());
        assert_eq!(effect, MergeEffect::Stale);
        let after: Vec<String> = session
            .feed()
            .reviews()
            .iter()
            .map(|r| r.id.clone())
            .collect();
        assert_eq!(committed, after);
        assert_eq!(session.feed().current_epoch(), fast.epoch);
    }

    #[test]
    fn data_inconsistency_raised_only_while_newer_reset_outstanding() {
        let mut session = FeedSession::new();
        let first = session.set_filter(keyword("a"));
        session.complete(&first, Ok(page_of(&[("a-1", 15)], 1, 1, 1)), now());
        assert!(!session.view().data_inconsistency);

        // New filter issued; old reviews still held until its page 1 lands.
        let second = session.set_filter(keyword("b"));
        let view = session.view();
        assert!(view.data_inconsistency);
        assert_eq!(view.health(), FeedHealth::Loading);

        session.complete(&second, Ok(page_of(&[("b-1", 15)], 1, 1, 1)), now());
        assert!(!session.view().data_inconsistency);
    }

    // === Failures ===

    #[test]
    fn failure_surfaces_error_and_keeps_reviews() {
        let mut session = FeedSession::new();
        let first = session.set_filter(Filter::default());
        session.complete(&first, Ok(page_of(&[("a", 15)], 2, 2, 1)), now());

        let second = session.load_more().expect("page 2 available");
        session.complete(
            &second,
            Err(FetchError::Upstream {
                status: 502,
                message: "bad gateway".to_string(),
            }),
            now(),
        );

        let view = session.view();
        assert_eq!(view.groups.len(), 1, "old reviews still displayed");
        assert_eq!(view.error.and_then(FetchError::status), Some(502));
    }

    #[test]
    fn retry_reuses_the_same_descriptor_and_success_clears_the_error() {
        let mut session = FeedSession::new();
        let first = session.set_filter(Filter::default());
        session.complete(&first, Ok(page_of(&[("a", 15)], 2, 2, 1)), now());

        let second = session.load_more().expect("page 2 available");
        session.complete(
            &second,
            Err(FetchError::Network("reset".to_string())),
            now(),
        );
        assert!(session.view().error.is_some());

        let retried = session.retry_last().expect("a request was built");
        assert_eq!(retried, second);
        session.complete(&retried, Ok(page_of(&[("b", 14)], 2, 2, 2)), now());
        assert!(session.view().error.is_none());
        assert_eq!(session.feed().len(), 2);
    }

    #[test]
    fn load_more_rejection_leaves_everything_untouched() {
        let mut session = FeedSession::new();
        assert_eq!(session.load_more(), Err(RequestError::NoResponseYet));
        assert!(session.outstanding().is_empty());
        assert_eq!(session.view().health(), FeedHealth::Empty);
    }
}
