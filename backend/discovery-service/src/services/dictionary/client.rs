use crate::error::{DiscoveryError, Result};
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde_json::Value;
use std::time::Duration;

/// Raw HTTP outcome of one lookup attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictionaryResponse {
    pub status: u16,
    pub body: String,
}

impl DictionaryResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Remote dictionary transport. `Err` means the request never produced a
/// status (connection refused, DNS, timeout inside the client).
#[async_trait]
pub trait DictionaryTransport: Send + Sync {
    async fn fetch(&self, word: &str) -> Result<DictionaryResponse>;
}

/// Naver Korean dictionary search API
pub struct NaverDictionaryClient {
    client: HttpClient,
    base_url: String,
}

impl NaverDictionaryClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = HttpClient::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0")
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
        })
    }
}

#[async_trait]
impl DictionaryTransport for NaverDictionaryClient {
    async fn fetch(&self, word: &str) -> Result<DictionaryResponse> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("query", word), ("range", "word"), ("page", "1")])
            .send()
            .await
            .map_err(|e| DiscoveryError::Transport(format!("dictionary request failed: {}", e)))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| DiscoveryError::Transport(format!("dictionary body read failed: {}", e)))?;

        Ok(DictionaryResponse { status, body })
    }
}

/// Standard iff `searchResultMap.searchResultListMap.WORD.items` is a non-empty array.
/// Malformed JSON is an error; any other shape is "not standard".
pub fn parse_is_standard(body: &str) -> Result<bool> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| DiscoveryError::Parse(format!("dictionary response is not JSON: {}", e)))?;

    Ok(value
        .pointer("/searchResultMap/searchResultListMap/WORD/items")
        .and_then(Value::as_array)
        .map(|items| !items.is_empty())
        .unwrap_or(false))
}

/// Statuses worth retrying
pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}
