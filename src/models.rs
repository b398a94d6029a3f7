use std::collections::btree_map::{self, BTreeMap};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Device label used when the platform reports no device metadata
pub const UNKNOWN_DEVICE: &str = "Unknown";

/// A single review as tracked in the state file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: String,
    pub rating: u8,
    pub text: String,
    pub author: String,
    pub device: String,
    pub date: DateTime<Utc>,
    pub notified: bool,
}

impl Review {
    /// Star glyphs repeated once per rating point
    pub fn stars(&self) -> String {
        "⭐".repeat(self.rating as usize)
    }

    /// Date rendered the way chat messages show it (RFC 1123)
    pub fn display_date(&self) -> String {
        self.date.format("%a, %d %b %Y %H:%M:%S UTC").to_string()
    }
}

/// Inclusive rating window selected on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingRange {
    pub start: u8,
    pub end: u8,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RangeError {
    #[error("invalid rating range format '{0}'. Use format: start-end (e.g., 1-3)")]
    InvalidFormat(String),

    #[error("invalid {bound} rating '{value}'")]
    InvalidNumber { bound: &'static str, value: String },

    #[error("rating range must be between 1 and 5")]
    OutOfBounds,

    #[error("start rating must be less than or equal to end rating")]
    StartAfterEnd,
}

impl RatingRange {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(start: u8, end: u8) -> Result<Self, RangeError> {
        let valid = Self::MIN..=Self::MAX;
        if !valid.contains(&start) || !valid.contains(&end) {
            return Err(RangeError::OutOfBounds);
        }
        if start > end {
            return Err(RangeError::StartAfterEnd);
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, rating: u8) -> bool {
        self.start <= rating && rating <= self.end
    }
}

impl FromStr for RatingRange {
    type Err = RangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('-').collect();
        if parts.len() != 2 {
            return Err(RangeError::InvalidFormat(s.to_string()));
        }

        let parse = |bound: &'static str, value: &str| {
            value
                .trim()
                .parse::<i64>()
                .map_err(|_| RangeError::InvalidNumber {
                    bound,
                    value: value.to_string(),
                })
        };

        let start = parse("start", parts[0])?;
        let end = parse("end", parts[1])?;

        let in_bounds = |v: i64| (Self::MIN as i64..=Self::MAX as i64).contains(&v);
        if !in_bounds(start) || !in_bounds(end) {
            return Err(RangeError::OutOfBounds);
        }

        Self::new(start as u8, end as u8)
    }
}

impl fmt::Display for RatingRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// All known reviews keyed by review ID.
///
/// Records are only ever inserted or replaced, never removed, so entries the
/// platform stops returning stay in the state file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewSet {
    reviews: BTreeMap<String, Review>,
}

impl ReviewSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&Review> {
        self.reviews.get(id)
    }

    /// Insert or replace the record for `review.id`.
    ///
    /// A record already marked notified is never downgraded.
    pub fn upsert(&mut self, mut review: Review) {
        if let Some(existing) = self.reviews.get(&review.id) {
            review.notified |= existing.notified;
        }
        self.reviews.insert(review.id.clone(), review);
    }

    pub fn is_notified(&self, id: &str) -> bool {
        self.reviews.get(id).is_some_and(|r| r.notified)
    }

    pub fn len(&self) -> usize {
        self.reviews.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reviews.is_empty()
    }

    pub fn iter(&self) -> btree_map::Values<'_, String, Review> {
        self.reviews.values()
    }
}

impl FromIterator<Review> for ReviewSet {
    fn from_iter<I: IntoIterator<Item = Review>>(iter: I) -> Self {
        let mut set = Self::new();
        for review in iter {
            set.upsert(review);
        }
        set
    }
}

impl<'a> IntoIterator for &'a ReviewSet {
    type Item = &'a Review;
    type IntoIter = btree_map::Values<'a, String, Review>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
