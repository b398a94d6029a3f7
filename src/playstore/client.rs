use anyhow::{Context, Result};
use reqwest::Client;
use tracing::{debug, info, instrument};

use super::auth::{ServiceAccountAuth, ServiceAccountKey};
use super::types::{RawReview, ReviewsListResponse};
use super::ReviewSource;

pub const DEFAULT_API_BASE_URL: &str = "https://androidpublisher.googleapis.com";

/// Client for the Play Developer API reviews endpoint
pub struct PlayStoreClient {
    client: Client,
    auth: ServiceAccountAuth,
    base_url: String,
    package_name: String,
    max_results: Option<u32>,
}

impl PlayStoreClient {
    pub fn new(key: ServiceAccountKey, package_name: impl Into<String>) -> Result<Self> {
        let client = Client::new();
        let auth = ServiceAccountAuth::new(client.clone(), key)?;

        Ok(Self {
            client,
            auth,
            base_url: DEFAULT_API_BASE_URL.to_string(),
            package_name: package_name.into(),
            max_results: None,
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_max_results(mut self, max_results: Option<u32>) -> Self {
        self.max_results = max_results;
        self
    }

    async fn fetch_page(&self, page_token: Option<&str>) -> Result<ReviewsListResponse> {
        let url = format!(
            "{}/androidpublisher/v3/applications/{}/reviews",
            self.base_url, self.package_name
        );
        let token = self.auth.access_token().await?;

        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(max) = self.max_results {
            query.push(("maxResults", max.to_string()));
        }
        if let Some(t) = page_token {
            query.push(("token", t.to_string()));
        }

        debug!(url = %url, page_token = ?page_token, "Requesting reviews page");

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .query(&query)
            .send()
            .await
            .context("Failed to send request to Play Developer API")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Play Developer API error ({}): {}", status, error_text);
        }

        response
            .json()
            .await
            .context("Failed to parse reviews response")
    }
}

impl ReviewSource for PlayStoreClient {
    #[instrument(skip(self), fields(package = %self.package_name))]
    async fn list_reviews(&self) -> Result<Vec<RawReview>> {
        let mut reviews = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self.fetch_page(page_token.as_deref()).await?;
            reviews.extend(page.reviews);

            match page.token_pagination.and_then(|p| p.next_page_token) {
                Some(next) if !next.is_empty() => page_token = Some(next),
                _ => break,
            }
        }

        info!(count = reviews.len(), "Total reviews fetched from API");

        Ok(reviews)
    }
}
