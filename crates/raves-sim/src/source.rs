//! Simulated upstream: a generated review corpus served page by page.
//!
//! The source knows its own ground truth (which reviews match a filter, in
//! which order), which is what lets the oracle judge the engine's committed
//! state. Fault injection covers the failure modes the engine must absorb:
//! flat-out fetch failures and boundary items re-served on adjacent pages.

use crate::rng::DeterministicRng;
use chrono::{DateTime, Duration, TimeZone, Utc};
use raves_core::{FetchError, Filter, PageRequest, Review, ReviewPage};

const LEXICON: [&str; 12] = [
    "login", "sync", "crash", "battery", "update", "widget", "export", "search", "offline",
    "billing", "theme", "speed",
];

/// Fault injection configuration for the simulated upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaultConfig {
    /// Percentage of fetches that fail outright.
    pub fail_rate_percent: u8,
    /// Items re-served from the end of the previous page.
    pub page_overlap: u32,
    /// Maximum delivery delay in rounds.
    pub max_delay_rounds: u8,
}

impl Default for FaultConfig {
    fn default() -> Self {
        Self {
            fail_rate_percent: 5,
            page_overlap: 1,
            max_delay_rounds: 3,
        }
    }
}

/// In-memory upstream with a deterministic corpus.
#[derive(Debug, Clone)]
pub struct SimulatedSource {
    corpus: Vec<Review>,
    per_page: u32,
    fault: FaultConfig,
}

impl SimulatedSource {
    /// Generate a corpus of `size` reviews, newest first, dated across
    /// roughly a year before `newest`.
    #[must_use]
    pub fn generate(seed: u64, size: u32, per_page: u32, fault: FaultConfig) -> Self {
        let mut rng = DeterministicRng::new(seed);
        let newest = sim_now();
        let mut corpus = Vec::new();

        let mut offset_hours = 0_i64;
        for n in 0..size {
            // Gaps of 1..36 hours keep the corpus strictly newest-first.
            offset_hours += 1 + i64::try_from(rng.next_bounded(36)).unwrap_or(1);
            let word_a = LEXICON[usize::try_from(rng.next_bounded(12)).unwrap_or(0)];
            let word_b = LEXICON[usize::try_from(rng.next_bounded(12)).unwrap_or(0)];
            let stars = 1 + rng.next_bounded(5);

            corpus.push(Review {
                id: format!("r-{n}"),
                author: (!rng.hit_rate_percent(20)).then(|| format!("user{}", n % 17)),
                body: format!("the {word_a} and the {word_b} could be better"),
                posted_at: newest - Duration::hours(offset_hours),
                stars: format!("{stars}.00").parse().expect("generated in range"),
                title: format!("about {word_a}"),
                version: Some("2.1.0".to_string()),
                country: Some("US".to_string()),
                product_id: Some(1),
            });
        }

        Self {
            corpus,
            per_page,
            fault,
        }
    }

    /// Ground truth: does this review match the filter?
    #[must_use]
    pub fn matches(review: &Review, filter: &Filter) -> bool {
        let keyword_ok = filter.keyword.as_ref().is_none_or(|k| {
            let needle = k.to_ascii_lowercase();
            review.body.to_ascii_lowercase().contains(&needle)
                || review.title.to_ascii_lowercase().contains(&needle)
        });
        let rating_ok =
            filter.ratings.is_empty() || filter.ratings.contains(&review.stars.rounded());
        keyword_ok && rating_ok
    }

    /// Ground truth: every corpus review matching `filter`, newest first.
    #[must_use]
    pub fn matching(&self, filter: &Filter) -> Vec<&Review> {
        self.corpus
            .iter()
            .filter(|r| Self::matches(r, filter))
            .collect()
    }

    /// Serve one page, with failure injection and boundary overlap.
    pub fn serve(
        &self,
        request: &PageRequest,
        rng: &mut DeterministicRng,
    ) -> Result<ReviewPage, FetchError> {
        if rng.hit_rate_percent(self.fault.fail_rate_percent) {
            return Err(FetchError::Upstream {
                status: 503,
                message: "simulated upstream outage".to_string(),
            });
        }

        let matching = self.matching(&request.filter);
        let total = matching.len() as u64;
        let per_page = usize::try_from(self.per_page.max(1)).unwrap_or(1);
        let pages = matching.len().div_ceil(per_page).max(1);
        let overlap = usize::try_from(self.fault.page_overlap).unwrap_or(0);

        // Later pages start early by the overlap amount, re-serving items
        // from the previous page's tail.
        let page_index = usize::try_from(request.page.saturating_sub(1)).unwrap_or(0);
        let nominal_start = page_index.saturating_mul(per_page);
        let start = if request.page > 1 {
            nominal_start.saturating_sub(overlap)
        } else {
            nominal_start
        };
        let end = nominal_start.saturating_add(per_page).min(matching.len());

        let reviews: Vec<Review> = matching
            .get(start..end)
            .unwrap_or(&[])
            .iter()
            .map(|r| (*r).clone())
            .collect();

        Ok(ReviewPage {
            reviews,
            total,
            pages: u32::try_from(pages).unwrap_or(u32::MAX),
            this_page: request.page,
        })
    }
}

/// The fixed instant the simulation treats as "now".
#[must_use]
pub fn sim_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}
