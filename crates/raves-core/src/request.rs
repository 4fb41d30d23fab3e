//! Page descriptors and the epoch-allocating request builder.
//!
//! An epoch identifies one distinct filter value's lifetime. All requests
//! built for the same epoch carry the same filter, and page numbers within
//! an epoch grow one at a time. The epoch counter lives for the process and
//! only ever increases, which is what lets the feed drop slow responses
//! from superseded filters no matter when they resolve.

use crate::error::RequestError;
use crate::filter::Filter;
use serde::{Deserialize, Serialize};

/// A canonical page request: one filter, one page, one epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Filter shared by every request in this epoch.
    pub filter: Filter,
    /// 1-based page number.
    pub page: u32,
    /// Epoch this request belongs to.
    pub epoch: u64,
}

/// Bookkeeping for the epoch currently being paged through.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ActiveEpoch {
    epoch: u64,
    filter: Filter,
    last_requested_page: u32,
    /// Page count reported by the most recent response for this epoch.
    reported_pages: Option<u32>,
}

/// Turns filter-change and load-more intents into [`PageRequest`]s.
///
/// Performs no I/O; the caller hands the built descriptors to a fetch
/// collaborator and feeds outcomes back via [`RequestBuilder::record_response`].
#[derive(Debug, Clone, Default)]
pub struct RequestBuilder {
    next_epoch: u64,
    active: Option<ActiveEpoch>,
    last_built: Option<PageRequest>,
}

impl RequestBuilder {
    /// New builder with no active epoch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The epoch currently being paged, if any.
    #[must_use]
    pub fn active_epoch(&self) -> Option<u64> {
        self.active.as_ref().map(|a| a.epoch)
    }

    /// The filter of the active epoch, if any.
    #[must_use]
    pub fn active_filter(&self) -> Option<&Filter> {
        self.active.as_ref().map(|a| &a.filter)
    }

    /// Apply a filter intent.
    ///
    /// A filter that differs from the active one allocates a fresh epoch and
    /// starts at page 1. Re-submitting the identical filter re-issues page 1
    /// of the same epoch (a refresh): epochs are per distinct filter value,
    /// not per submission.
    pub fn filter_change(&mut self, filter: Filter) -> PageRequest {
        let epoch = match &self.active {
            Some(active) if active.filter == filter => active.epoch,
            _ => {
                self.next_epoch += 1;
                tracing::debug!(epoch = self.next_epoch, %filter, "allocating epoch");
                self.next_epoch
            }
        };

        self.active = Some(ActiveEpoch {
            epoch,
            filter: filter.clone(),
            last_requested_page: 1,
            reported_pages: self
                .active
                .as_ref()
                .filter(|a| a.epoch == epoch)
                .and_then(|a| a.reported_pages),
        });

        let request = PageRequest {
            filter,
            page: 1,
            epoch,
        };
        self.last_built = Some(request.clone());
        request
    }

    /// Apply a load-more intent: next page of the active epoch.
    ///
    /// Rejected without side effects when no response has been recorded for
    /// the epoch yet, or when every reported page has been requested.
    pub fn load_more(&mut self) -> Result<PageRequest, RequestError> {
        let Some(active) = self.active.as_mut() else {
            return Err(RequestError::NoResponseYet);
        };
        let Some(pages) = active.reported_pages else {
            return Err(RequestError::NoResponseYet);
        };
        if active.last_requested_page >= pages {
            return Err(RequestError::NoMorePages {
                page: active.last_requested_page,
                pages,
            });
        }

        active.last_requested_page += 1;
        let request = PageRequest {
            filter: active.filter.clone(),
            page: active.last_requested_page,
            epoch: active.epoch,
        };
        self.last_built = Some(request.clone());
        Ok(request)
    }

    /// Record the page count a response reported for `epoch`.
    ///
    /// Responses for epochs other than the active one are ignored; they can
    /// only come from superseded filters.
    pub fn record_response(&mut self, epoch: u64, pages: u32) {
        if let Some(active) = self.active.as_mut()
            && active.epoch == epoch
        {
            active.reported_pages = Some(pages);
        }
    }

    /// The most recently built descriptor, for caller-driven retry.
    ///
    /// A retry re-issues the identical epoch and page; the feed treats the
    /// eventual response exactly like the first attempt would have been.
    #[must_use]
    pub fn last_request(&self) -> Option<&PageRequest> {
        self.last_built.as_ref()
    }
}
