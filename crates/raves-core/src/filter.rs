//! Filter values and their query-string encoding.
//!
//! A filter is a trimmed keyword plus a set of whole-star ratings. Two
//! filters are equal iff the keywords match exactly and the rating sets are
//! equal as sets; the request builder allocates one epoch per distinct
//! filter value, so equality here decides when the feed resets.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Sorting
// ---------------------------------------------------------------------------

/// Sort order requested from the upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortOrder {
    /// Newest first. The reconciliation engine assumes this ordering.
    #[default]
    DateDesc,
    /// Oldest first.
    DateAsc,
    /// Grouped by country.
    Country,
    /// Highest rating first.
    Stars,
}

impl SortOrder {
    /// The upstream query-string value.
    #[must_use]
    pub const fn as_query(self) -> &'static str {
        match self {
            Self::DateDesc => "-date",
            Self::DateAsc => "date",
            Self::Country => "country",
            Self::Stars => "stars",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_query())
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "-date" => Ok(Self::DateDesc),
            "date" => Ok(Self::DateAsc),
            "country" => Ok(Self::Country),
            "stars" => Ok(Self::Stars),
            other => Err(format!("unknown sort order: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Rating filter codec
// ---------------------------------------------------------------------------

/// Encode a rating set as the comma-joined `stars` query value.
#[must_use]
pub fn format_rating_filter(ratings: &BTreeSet<u8>) -> String {
    let digits: Vec<String> = ratings.iter().map(ToString::to_string).collect();
    digits.join(",")
}

/// Decode a `stars` query value back into a rating set.
///
/// Tokens outside 1..=5 (including unparsable ones) are dropped, matching
/// the adapter layer: a hand-edited query string never breaks the filter.
#[must_use]
pub fn parse_rating_filter(raw: &str) -> BTreeSet<u8> {
    raw.split(',')
        .filter_map(|token| token.trim().parse::<u8>().ok())
        .filter(|n| (1..=5).contains(n))
        .collect()
}

// ---------------------------------------------------------------------------
// Filter
// ---------------------------------------------------------------------------

/// A keyword + star-rating filter over the review stream.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Filter {
    /// Trimmed search keyword; `None` means unfiltered.
    pub keyword: Option<String>,
    /// Whole-star ratings to include; empty means all.
    pub ratings: BTreeSet<u8>,
}

impl Filter {
    /// Build a normalized filter: the keyword is trimmed and blank keywords
    /// collapse to `None`; ratings outside 1..=5 are dropped.
    #[must_use]
    pub fn new(keyword: Option<&str>, ratings: impl IntoIterator<Item = u8>) -> Self {
        let keyword = keyword
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(ToString::to_string);
        let ratings = ratings
            .into_iter()
            .filter(|n| (1..=5).contains(n))
            .collect();
        Self { keyword, ratings }
    }

    /// True when neither keyword nor ratings constrain the stream.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keyword.is_none() && self.ratings.is_empty()
    }

    /// Query pairs understood by the upstream: `q`, `stars`, `sort`,
    /// `count`, `page`. Unset parts are omitted entirely.
    #[must_use]
    pub fn query_pairs(&self, sort: SortOrder, count: u32, page: u32) -> Vec<(String, String)> {
        let mut pairs = Vec::with_capacity(5);
        if let Some(keyword) = &self.keyword {
            pairs.push(("q".to_string(), keyword.clone()));
        }
        if !self.ratings.is_empty() {
            pairs.push(("stars".to_string(), format_rating_filter(&self.ratings)));
        }
        pairs.push(("sort".to_string(), sort.as_query().to_string()));
        pairs.push(("count".to_string(), count.to_string()));
        pairs.push(("page".to_string(), page.to_string()));
        pairs
    }

    /// Human-readable summary of the active constraints.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();

        if let Some(keyword) = &self.keyword {
            parts.push(format!("\"{keyword}\""));
        }

        if !self.ratings.is_empty() {
            let stars = format_rating_filter(&self.ratings).replace(',', ", ");
            let noun = if self.ratings.len() == 1 && self.ratings.contains(&1) {
                "star"
            } else {
                "stars"
            };
            parts.push(format!("{stars} {noun}"));
        }

        if parts.is_empty() {
            "All reviews".to_string()
        } else {
            parts.join(" with ")
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}
