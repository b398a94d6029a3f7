use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::Review;

/// Delay observed after every delivery attempt, to stay under the chat rate limit
pub const DEFAULT_PACING: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("failed to serialize webhook message: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to send webhook: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("webhook returned non-200 status code: {status}")]
    Status { status: StatusCode, body: String },
}

#[derive(Debug, Clone)]
pub struct NotifierConfig {
    pub webhook_url: String,
    pub dry_run: bool,
    pub pacing: Duration,
}

/// Chat webhook payload
#[derive(Serialize)]
struct WebhookMessage<'a> {
    text: &'a str,
}

/// Delivers one review at a time to a chat webhook
pub struct Notifier {
    client: Client,
    config: NotifierConfig,
}

impl Notifier {
    pub fn new(config: NotifierConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn is_dry_run(&self) -> bool {
        self.config.dry_run
    }

    /// Announce a review. Never retries; the pacing delay runs before returning
    /// whenever the attempt got as far as the network (or would have, in dry-run).
    pub async fn notify(&self, review: &Review) -> Result<(), DeliveryError> {
        let text = format_message(review);

        if self.config.dry_run {
            info!(review_id = %review.id, "TEST MODE - Would send to webhook:\n{}", text);
            self.pace().await;
            return Ok(());
        }

        let body = serde_json::to_vec(&WebhookMessage { text: &text })?;

        let result = self.send(body).await;
        self.pace().await;

        match &result {
            Ok(()) => info!(review_id = %review.id, "Webhook notification sent"),
            Err(e) => warn!(review_id = %review.id, error = %e, "Webhook notification failed"),
        }

        result
    }

    async fn send(&self, body: Vec<u8>) -> Result<(), DeliveryError> {
        debug!("Sending webhook notification");

        let response = self
            .client
            .post(&self.config.webhook_url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Status { status, body });
        }

        Ok(())
    }

    async fn pace(&self) {
        if !self.config.pacing.is_zero() {
            tokio::time::sleep(self.config.pacing).await;
        }
    }
}

/// Chat message body announcing a review
pub fn format_message(review: &Review) -> String {
    format!(
        "*New Review*\nRating: {} ({})\nReview: {}\nAuthor: {}\nDevice: {}\nDate: {}",
        review.stars(),
        review.rating,
        review.text,
        review.author,
        review.device,
        review.display_date()
    )
}
