//! Invariant checks run after every delivered response.
//!
//! The oracle compares the engine's committed state against the simulated
//! upstream's ground truth. Any violation aborts the run with context.

use crate::source::SimulatedSource;
use anyhow::{Result, bail, ensure};
use raves_core::{FeedSession, Filter};
use std::collections::{HashMap, HashSet};

/// Check every reconciliation invariant against ground truth.
///
/// `filters_by_epoch` maps each issued epoch to the filter it was built for.
pub fn check(
    session: &FeedSession,
    source: &SimulatedSource,
    filters_by_epoch: &HashMap<u64, Filter>,
) -> Result<()> {
    let feed = session.feed();

    // Ids are unique across the whole accumulated list.
    let mut seen = HashSet::new();
    for review in feed.reviews() {
        ensure!(
            seen.insert(review.id.as_str()),
            "duplicate id committed: {}",
            review.id
        );
    }

    ensure!(
        feed.new_items_start() <= feed.len(),
        "new-items marker {} beyond list length {}",
        feed.new_items_start(),
        feed.len()
    );

    // Before any commit there is nothing else to check.
    if feed.current_epoch() == 0 {
        ensure!(
            feed.is_empty(),
            "reviews committed without a committed epoch"
        );
        return Ok(());
    }

    let Some(filter) = filters_by_epoch.get(&feed.current_epoch()) else {
        bail!("committed epoch {} was never issued", feed.current_epoch());
    };

    // Every committed review matches the committed filter, and the committed
    // order is a subsequence of the upstream's match order (pages within an
    // epoch only ever extend forward).
    let truth: Vec<&str> = source
        .matching(filter)
        .iter()
        .map(|r| r.id.as_str())
        .collect();
    let mut cursor = 0_usize;
    for review in feed.reviews() {
        ensure!(
            SimulatedSource::matches(review, filter),
            "committed review {} does not match filter {filter}",
            review.id
        );
        match truth[cursor..].iter().position(|id| *id == review.id) {
            Some(offset) => cursor += offset + 1,
            None => bail!(
                "committed order of {} diverges from upstream order",
                review.id
            ),
        }
    }

    // The latest reported total is the upstream's match count.
    if let Some(total) = feed.total() {
        ensure!(
            total == truth.len() as u64,
            "reported total {total} disagrees with upstream match count {}",
            truth.len()
        );
    }

    Ok(())
}
