pub mod csv;

pub use self::csv::CsvLedger;

use anyhow::Result;
use crate::models::ReviewSet;

/// Trait for review state persistence backends
pub trait Ledger: Send + Sync {
    /// Load every known review. A store that has never been written yields an empty set.
    fn load(&self) -> Result<ReviewSet>;

    /// Replace the stored state with `reviews`
    fn save(&self, reviews: &ReviewSet) -> Result<()>;
}
