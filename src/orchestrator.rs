use anyhow::{Context, Result};
use tracing::{info, instrument};

use crate::ledger::Ledger;
use crate::models::{RatingRange, Review};
use crate::notifications::Notifier;
use crate::playstore::ReviewSource;
use crate::reconciler::{Reconciler, Reconciliation};

/// What a pipeline run did
#[derive(Debug, Clone)]
pub struct RunReport {
    pub fetched: usize,
    pub stored: usize,
    pub reconciliation: Reconciliation,
}

impl RunReport {
    pub fn new_reviews(&self) -> &[Review] {
        &self.reconciliation.new_reviews
    }
}

/// Orchestrates one load → fetch → reconcile → save pass
pub struct Orchestrator<S: ReviewSource, L: Ledger> {
    source: S,
    ledger: L,
    notifier: Notifier,
    range: Option<RatingRange>,
}

impl<S: ReviewSource, L: Ledger> Orchestrator<S, L> {
    pub fn new(source: S, ledger: L, notifier: Notifier, range: Option<RatingRange>) -> Self {
        Self {
            source,
            ledger,
            notifier,
            range,
        }
    }

    #[instrument(skip(self), fields(range = ?self.range, dry_run = self.notifier.is_dry_run()))]
    pub async fn run(&self) -> Result<RunReport> {
        info!("Starting review pipeline");

        let mut state = self
            .ledger
            .load()
            .context("Failed to read existing reviews")?;

        let fetched = self
            .source
            .list_reviews()
            .await
            .context("Failed to fetch reviews")?;

        let reconciliation = Reconciler::new(&self.notifier, self.range)
            .reconcile(&fetched, &mut state)
            .await;

        self.ledger
            .save(&state)
            .context("Failed to save reviews")?;

        let report = RunReport {
            fetched: fetched.len(),
            stored: state.len(),
            reconciliation,
        };

        if report.new_reviews().is_empty() {
            info!("No new reviews found");
        } else {
            info!("\n{}", generate_summary(report.new_reviews()));
        }

        info!(
            fetched = report.fetched,
            stored = report.stored,
            new = report.new_reviews().len(),
            "Review pipeline complete"
        );

        Ok(report)
    }

    /// Get the ledger for direct access
    pub fn ledger(&self) -> &L {
        &self.ledger
    }
}

/// One line per announced review, numbered from 1
pub fn generate_summary(reviews: &[Review]) -> String {
    let mut out = String::from("=== New Reviews ===");

    for (i, review) in reviews.iter().enumerate() {
        out.push_str(&format!(
            "\n[{}] {} | {} | {} | {} | {}",
            i + 1,
            review.stars(),
            review.text,
            review.author,
            review.device,
            review.display_date()
        ));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_generate_summary() {
        let review = Review {
            id: "r1".to_string(),
            rating: 2,
            text: "Crashes on start".to_string(),
            author: "Sam".to_string(),
            device: "Unknown".to_string(),
            date: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            notified: true,
        };

        let summary = generate_summary(&[review]);
        assert_eq!(
            summary,
            "=== New Reviews ===\n[1] ⭐⭐ | Crashes on start | Sam | Unknown | Tue, 14 Nov 2023 22:13:20 UTC"
        );
    }

    #[test]
    fn test_generate_summary_empty() {
        assert_eq!(generate_summary(&[]), "=== New Reviews ===");
    }
}
