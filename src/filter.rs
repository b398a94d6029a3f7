use crate::models::RatingRange;

/// Whether a review with `rating` passes the optional rating window.
///
/// No window means every rating passes.
pub fn matches(rating: u8, range: Option<&RatingRange>) -> bool {
    range.map_or(true, |r| r.contains(rating))
}
