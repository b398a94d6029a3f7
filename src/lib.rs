pub mod config;
pub mod filter;
pub mod ledger;
pub mod logging;
pub mod models;
pub mod notifications;
pub mod orchestrator;
pub mod playstore;
pub mod reconciler;

pub use config::{Config, Overrides};
pub use ledger::{CsvLedger, Ledger};
pub use models::*;
pub use notifications::{DeliveryError, Notifier, NotifierConfig};
pub use orchestrator::{generate_summary, Orchestrator, RunReport};
pub use playstore::{PlayStoreClient, RawReview, ReviewSource, ServiceAccountKey};
pub use reconciler::{Reconciler, Reconciliation, TransformError};
