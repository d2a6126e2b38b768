//! Text similarity service client
//!
//! Thin client for the external text-embedding service. The service is
//! a black box: two strings in, one cosine-like similarity out. All
//! failures (timeout, network, bad payload) collapse to an absent
//! signal so one slow candidate never aborts a batch.

use async_trait::async_trait;
use refind_common::db::models::Report;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Text client errors
#[derive(Debug, Error)]
pub enum TextClientError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Text similarity provider seam
///
/// Injected into the match runner so fusion is testable with
/// deterministic fakes. `None` means the signal is unavailable.
#[async_trait]
pub trait TextSimilarity: Send + Sync {
    async fn similarity(&self, a: &Report, b: &Report) -> Option<f64>;
}

/// Similarity request body
#[derive(Debug, Serialize)]
struct SimilarityRequest<'a> {
    text_a: &'a str,
    text_b: &'a str,
}

/// Similarity response body
#[derive(Debug, Deserialize)]
struct SimilarityResponse {
    similarity: f64,
}

/// HTTP client for the text similarity service
pub struct HttpTextClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTextClient {
    /// Create a client with a bounded per-call timeout
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TextClientError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TextClientError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Query the service for the similarity of two text payloads
    async fn query(&self, text_a: &str, text_b: &str) -> Result<f64, TextClientError> {
        let url = format!("{}/v1/similarity", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&SimilarityRequest { text_a, text_b })
            .send()
            .await
            .map_err(|e| TextClientError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TextClientError::Api(status.as_u16(), body));
        }

        let parsed: SimilarityResponse = response
            .json()
            .await
            .map_err(|e| TextClientError::Parse(e.to_string()))?;

        Ok(parsed.similarity.clamp(0.0, 1.0))
    }
}

#[async_trait]
impl TextSimilarity for HttpTextClient {
    async fn similarity(&self, a: &Report, b: &Report) -> Option<f64> {
        match self.query(&a.similarity_text(), &b.similarity_text()).await {
            Ok(score) => Some(score),
            Err(e) => {
                tracing::warn!(
                    report_a = %a.id,
                    report_b = %b.id,
                    error = %e,
                    "Text similarity unavailable, scoring without it"
                );
                None
            }
        }
    }
}
