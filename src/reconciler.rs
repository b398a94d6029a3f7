//! Merges freshly fetched reviews into stored state.
//!
//! A fetched review is a candidate when it passes the rating filter and the
//! stored state has no notified record for its ID. Candidates are announced in
//! fetch order and written back to state only once delivery succeeded, so a
//! failed delivery is simply picked up again on the next run.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::filter;
use crate::models::{RatingRange, Review, ReviewSet, UNKNOWN_DEVICE};
use crate::notifications::Notifier;
use crate::playstore::RawReview;

/// Why a fetched review could not be turned into a state record
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransformError {
    #[error("review has no user comment")]
    MissingComment,

    #[error("star rating {0} is outside 1-5")]
    InvalidRating(i64),

    #[error("user comment has no last-modified timestamp")]
    MissingTimestamp,
}

/// Outcome of one reconciliation pass
#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    /// Reviews delivered this run, in fetch order
    pub new_reviews: Vec<Review>,
    pub filtered_out: usize,
    pub already_notified: usize,
    pub malformed: usize,
    pub failed: usize,
}

pub struct Reconciler<'a> {
    notifier: &'a Notifier,
    range: Option<RatingRange>,
}

impl<'a> Reconciler<'a> {
    pub fn new(notifier: &'a Notifier, range: Option<RatingRange>) -> Self {
        Self { notifier, range }
    }

    pub async fn reconcile(&self, fetched: &[RawReview], state: &mut ReviewSet) -> Reconciliation {
        let mut outcome = Reconciliation::default();

        for raw in fetched {
            let review = match extract_review(raw) {
                Ok(r) => r,
                Err(e) => {
                    warn!(review_id = %raw.review_id, error = %e, "Skipping malformed review");
                    outcome.malformed += 1;
                    continue;
                }
            };

            if !filter::matches(review.rating, self.range.as_ref()) {
                debug!(review_id = %review.id, rating = review.rating, "Outside rating range");
                outcome.filtered_out += 1;
                continue;
            }

            if state.is_notified(&review.id) {
                outcome.already_notified += 1;
                continue;
            }

            if let Err(e) = self.notifier.notify(&review).await {
                warn!(review_id = %review.id, error = %e, "Failed to send review to webhook");
                outcome.failed += 1;
                continue;
            }

            let review = Review {
                notified: true,
                ..review
            };
            state.upsert(review.clone());
            outcome.new_reviews.push(review);
        }

        info!(
            new = outcome.new_reviews.len(),
            already_notified = outcome.already_notified,
            filtered_out = outcome.filtered_out,
            malformed = outcome.malformed,
            failed = outcome.failed,
            "Reconciliation complete"
        );

        outcome
    }
}

/// Build an un-notified state record from an API review
pub fn extract_review(raw: &RawReview) -> Result<Review, TransformError> {
    let comment = raw.primary_comment().ok_or(TransformError::MissingComment)?;

    let rating = u8::try_from(comment.star_rating)
        .ok()
        .filter(|r| (RatingRange::MIN..=RatingRange::MAX).contains(r))
        .ok_or(TransformError::InvalidRating(comment.star_rating))?;

    let modified = comment
        .last_modified
        .ok_or(TransformError::MissingTimestamp)?;
    let date = DateTime::<Utc>::from_timestamp(modified.seconds, 0)
        .ok_or(TransformError::MissingTimestamp)?;

    let device = comment
        .device_metadata
        .as_ref()
        .map(|d| d.product_name.clone())
        .unwrap_or_else(|| UNKNOWN_DEVICE.to_string());

    Ok(Review {
        id: raw.review_id.clone(),
        rating,
        text: comment.text.trim().to_string(),
        author: raw.author_name.clone(),
        device,
        date,
        notified: false,
    })
}
