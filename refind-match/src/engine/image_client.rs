//! Image similarity service client
//!
//! Client for the external perceptual-hash comparison service. The
//! image signal is structurally absent (no service call made) unless
//! both reports carry at least one image reference; service failures
//! also collapse to an absent signal.

use async_trait::async_trait;
use refind_common::db::models::Report;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Image client errors
#[derive(Debug, Error)]
pub enum ImageClientError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Image similarity provider seam
///
/// `None` means the signal is absent, not zero: either report has no
/// image, or the service was unreachable.
#[async_trait]
pub trait ImageSimilarity: Send + Sync {
    async fn similarity(&self, a: &Report, b: &Report) -> Option<f64>;
}

#[derive(Debug, Serialize)]
struct SimilarityRequest<'a> {
    image_a: &'a str,
    image_b: &'a str,
}

#[derive(Debug, Deserialize)]
struct SimilarityResponse {
    similarity: f64,
}

/// HTTP client for the image similarity service
pub struct HttpImageClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpImageClient {
    /// Create a client with a bounded per-call timeout
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ImageClientError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ImageClientError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Compare two image references through the service
    async fn query(&self, image_a: &str, image_b: &str) -> Result<f64, ImageClientError> {
        let url = format!("{}/v1/similarity", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&SimilarityRequest { image_a, image_b })
            .send()
            .await
            .map_err(|e| ImageClientError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ImageClientError::Api(status.as_u16(), body));
        }

        let parsed: SimilarityResponse = response
            .json()
            .await
            .map_err(|e| ImageClientError::Parse(e.to_string()))?;

        Ok(parsed.similarity.clamp(0.0, 1.0))
    }
}

#[async_trait]
impl ImageSimilarity for HttpImageClient {
    async fn similarity(&self, a: &Report, b: &Report) -> Option<f64> {
        // No call when the signal is structurally absent
        let (image_a, image_b) = match (a.primary_image(), b.primary_image()) {
            (Some(ia), Some(ib)) => (ia, ib),
            _ => return None,
        };

        match self.query(image_a, image_b).await {
            Ok(score) => Some(score),
            Err(e) => {
                tracing::warn!(
                    report_a = %a.id,
                    report_b = %b.id,
                    error = %e,
                    "Image similarity unavailable, scoring without it"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_normalized() {
        let client =
            HttpImageClient::new("http://localhost:5851///", Duration::from_secs(3)).unwrap();
        assert_eq!(client.base_url, "http://localhost:5851");
    }
}
