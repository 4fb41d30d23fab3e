//! Wire-level review data model.
//!
//! Field names mirror the upstream reviews API: the review text travels as
//! `review`, the timestamp as `date`, the country code as `iso`, and the star
//! rating as a decimal string such as `"5.00"`. Identity is by `id` alone —
//! two payload items with equal ids are the same review and the first one
//! seen wins.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

// ---------------------------------------------------------------------------
// Star rating
// ---------------------------------------------------------------------------

/// A star rating in `[0.0, 5.0]`.
///
/// The upstream serves ratings as decimal strings (`"4.50"`); some mirrors
/// serve bare numbers. Both decode, anything outside the range is rejected
/// as a malformed payload.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Stars(f64);

/// Error for a rating outside `[0.0, 5.0]` or unparsable text.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid star rating: {input}")]
pub struct InvalidStars {
    pub input: String,
}

impl Stars {
    /// Construct from a decimal value, rejecting out-of-range input.
    pub fn new(value: f64) -> Result<Self, InvalidStars> {
        if value.is_finite() && (0.0..=5.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(InvalidStars {
                input: value.to_string(),
            })
        }
    }

    /// The raw decimal value.
    #[must_use]
    pub const fn value(self) -> f64 {
        self.0
    }

    /// Nearest whole-star count, for display and rating-filter comparisons.
    #[must_use]
    pub fn rounded(self) -> u8 {
        // value is already bounded to [0, 5]
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        {
            self.0.round() as u8
        }
    }
}

impl fmt::Display for Stars {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl std::str::FromStr for Stars {
    type Err = InvalidStars;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<f64>()
            .map_err(|_| InvalidStars {
                input: s.to_string(),
            })
            .and_then(Self::new)
    }
}

impl Serialize for Stars {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Stars {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(f64),
        }

        let parsed = match Raw::deserialize(deserializer)? {
            Raw::Text(s) => s.parse::<Self>(),
            Raw::Number(n) => Self::new(n),
        };
        parsed.map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Review
// ---------------------------------------------------------------------------

/// One user-submitted review as served by the upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    /// Globally unique id; the sole identity of a review.
    pub id: String,
    /// Author display name, absent for anonymous reviews.
    #[serde(default)]
    pub author: Option<String>,
    /// Review text.
    #[serde(rename = "review")]
    pub body: String,
    /// When the review was posted; upstream sorts descending on request.
    #[serde(rename = "date")]
    pub posted_at: DateTime<Utc>,
    /// Star rating, wire-encoded as a decimal string.
    pub stars: Stars,
    /// Review title, may be empty.
    #[serde(default)]
    pub title: String,
    /// App version the review refers to.
    #[serde(default)]
    pub version: Option<String>,
    /// ISO country code where the review was observed.
    #[serde(rename = "iso", default)]
    pub country: Option<String>,
    /// Upstream product id.
    #[serde(rename = "product", default)]
    pub product_id: Option<u64>,
}

/// One successful page of reviews from the upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewPage {
    /// Reviews in source order.
    pub reviews: Vec<Review>,
    /// Total matches for the active filter, across all pages.
    pub total: u64,
    /// Number of pages available for the active filter.
    pub pages: u32,
    /// Page number this payload answers.
    pub this_page: u32,
}
