pub mod auth;
pub mod client;
pub mod types;

pub use auth::{ServiceAccountAuth, ServiceAccountKey};
pub use client::PlayStoreClient;
pub use types::RawReview;

use std::future::Future;

use anyhow::Result;

/// Anything that can list the current reviews for one app
pub trait ReviewSource {
    fn list_reviews(&self) -> impl Future<Output = Result<Vec<RawReview>>> + Send;
}
