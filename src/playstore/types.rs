use serde::{Deserialize, Deserializer};

/// A review as returned by the Play Developer API
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawReview {
    pub review_id: String,
    #[serde(default)]
    pub author_name: String,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

impl RawReview {
    /// The first comment's user part, which carries the rating and text
    pub fn primary_comment(&self) -> Option<&UserComment> {
        self.comments.first().and_then(|c| c.user_comment.as_ref())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub user_comment: Option<UserComment>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserComment {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub star_rating: i64,
    pub last_modified: Option<Timestamp>,
    pub device_metadata: Option<DeviceMetadata>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceMetadata {
    #[serde(default)]
    pub product_name: String,
}

/// Protobuf-style timestamp. `seconds` is an int64 and arrives JSON-encoded as a string.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Timestamp {
    #[serde(deserialize_with = "int64_string_or_number")]
    pub seconds: i64,
    #[serde(default)]
    pub nanos: i32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ReviewsListResponse {
    #[serde(default)]
    pub reviews: Vec<RawReview>,
    pub token_pagination: Option<TokenPagination>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TokenPagination {
    pub next_page_token: Option<String>,
}

fn int64_string_or_number<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Int64 {
        Number(i64),
        Text(String),
    }

    match Int64::deserialize(deserializer)? {
        Int64::Number(n) => Ok(n),
        Int64::Text(s) => s.parse().map_err(serde::de::Error::custom),
    }
}
