//! Date bucketing for display grouping.
//!
//! Pure and stateless: [`group_by_date`] maps the accumulated review list to
//! ordered, labeled groups against a caller-supplied `now`, and is cheap
//! enough to recompute on every feed change. Item order inside a group is
//! inherited from the accumulated list; nothing is ever re-sorted here.
//!
//! # Bucket Ranking
//!
//! Fixed buckets have a total ordering:
//!   Today(0) < Yesterday(1) < ThisWeek(2) < LastWeek(3)
//!     < ThisMonth(4) < LastMonth(5)
//!
//! Month/year buckets sort after every fixed bucket, most recent month
//! first. Weeks are ISO weeks, Monday start.

use crate::model::Review;
use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;

const MONTH_ABBREV: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

// ---------------------------------------------------------------------------
// DateBucket
// ---------------------------------------------------------------------------

/// A named temporal grouping relative to `now`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateBucket {
    Today,
    Yesterday,
    ThisWeek,
    LastWeek,
    ThisMonth,
    LastMonth,
    /// Anything older, keyed by the item's own calendar month.
    Month { year: i32, month: u32 },
}

impl DateBucket {
    /// Rank of the fixed buckets; month buckets all share the sentinel rank.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Today => 0,
            Self::Yesterday => 1,
            Self::ThisWeek => 2,
            Self::LastWeek => 3,
            Self::ThisMonth => 4,
            Self::LastMonth => 5,
            Self::Month { .. } => 6,
        }
    }

    /// Stable key: `today`, `yesterday`, `this-week`, `last-week`,
    /// `this-month`, `last-month`, or `Mon YYYY` for month buckets.
    #[must_use]
    pub fn key(self) -> String {
        match self {
            Self::Today => "today".to_string(),
            Self::Yesterday => "yesterday".to_string(),
            Self::ThisWeek => "this-week".to_string(),
            Self::LastWeek => "last-week".to_string(),
            Self::ThisMonth => "this-month".to_string(),
            Self::LastMonth => "last-month".to_string(),
            Self::Month { .. } => self.label(),
        }
    }

    /// Display label; for month buckets, key and label coincide.
    #[must_use]
    pub fn label(self) -> String {
        match self {
            Self::Today => "Today".to_string(),
            Self::Yesterday => "Yesterday".to_string(),
            Self::ThisWeek => "This Week".to_string(),
            Self::LastWeek => "Last Week".to_string(),
            Self::ThisMonth => "This Month".to_string(),
            Self::LastMonth => "Last Month".to_string(),
            Self::Month { year, month } => {
                let index = month.checked_sub(1).and_then(|m| usize::try_from(m).ok());
                let name = index.and_then(|i| MONTH_ABBREV.get(i)).unwrap_or(&"???");
                format!("{name} {year}")
            }
        }
    }
}

impl PartialOrd for DateBucket {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DateBucket {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.rank().cmp(&other.rank()) {
            Ordering::Equal => match (self, other) {
                // Month buckets: most recent month first.
                (
                    Self::Month { year, month },
                    Self::Month {
                        year: other_year,
                        month: other_month,
                    },
                ) => (other_year, other_month).cmp(&(year, month)),
                _ => Ordering::Equal,
            },
            unequal => unequal,
        }
    }
}

impl fmt::Display for DateBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

impl Serialize for DateBucket {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.key())
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Classify one timestamp against `now`. First match wins.
#[must_use]
pub fn classify(posted_at: DateTime<Utc>, now: DateTime<Utc>) -> DateBucket {
    let date = posted_at.date_naive();
    let today = now.date_naive();

    if date == today {
        return DateBucket::Today;
    }
    if today.pred_opt() == Some(date) {
        return DateBucket::Yesterday;
    }
    if date.iso_week() == today.iso_week() {
        return DateBucket::ThisWeek;
    }
    if is_previous_iso_week(date, today) {
        return DateBucket::LastWeek;
    }
    if (date.year(), date.month()) == (today.year(), today.month()) {
        return DateBucket::ThisMonth;
    }
    if (date.year(), date.month()) == previous_month(today) {
        return DateBucket::LastMonth;
    }
    DateBucket::Month {
        year: date.year(),
        month: date.month(),
    }
}

fn is_previous_iso_week(date: NaiveDate, today: NaiveDate) -> bool {
    today
        .checked_sub_days(Days::new(7))
        .is_some_and(|a_week_ago| date.iso_week() == a_week_ago.iso_week())
}

fn previous_month(date: NaiveDate) -> (i32, u32) {
    if date.month() == 1 {
        (date.year() - 1, 12)
    } else {
        (date.year(), date.month() - 1)
    }
}

// ---------------------------------------------------------------------------
// Grouping
// ---------------------------------------------------------------------------

/// One displayable group of reviews.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewGroup {
    /// Bucket identity, serialized as its key.
    #[serde(rename = "group")]
    pub bucket: DateBucket,
    /// Display label.
    pub label: String,
    /// Members, in accumulated-list order.
    pub reviews: Vec<Review>,
}

/// Group reviews into ordered buckets against `now`.
///
/// Deterministic in `(reviews, now)`; derived per call and safe to discard.
#[must_use]
pub fn group_by_date(reviews: &[Review], now: DateTime<Utc>) -> Vec<ReviewGroup> {
    let mut groups: Vec<ReviewGroup> = Vec::new();

    for review in reviews {
        let bucket = classify(review.posted_at, now);
        match groups.iter_mut().find(|g| g.bucket == bucket) {
            Some(group) => group.reviews.push(review.clone()),
            None => groups.push(ReviewGroup {
                bucket,
                label: bucket.label(),
                reviews: vec![review.clone()],
            }),
        }
    }

    groups.sort_by(|a, b| a.bucket.cmp(&b.bucket));
    groups
}
