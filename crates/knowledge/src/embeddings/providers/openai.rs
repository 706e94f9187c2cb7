//! OpenAI embedding provider.
//!
//! Calls an OpenAI-compatible `/embeddings` endpoint with whole batches.
//!
//! # Features
//! - Batched requests (one HTTP call per batch)
//! - Automatic retry with exponential backoff on transient failures
//! - Strict dimension and count checks on every response

use crate::embeddings::provider::EmbeddingProvider;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, StatusCode};
use sage_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Default OpenAI API base URL
const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";

/// Initial backoff duration in milliseconds
const INITIAL_BACKOFF_MS: u64 = 200;

/// Longest wait between retries.
const MAX_BACKOFF_MS: u64 = 30_000;

/// OpenAI embedding provider
#[derive(Debug, Clone)]
pub struct OpenAiEmbeddingProvider {
    /// HTTP client with auth header and timeout applied
    client: Client,
    /// Full embeddings URL
    endpoint: String,
    /// Model name (e.g., "text-embedding-3-small")
    model: String,
    /// Expected embedding dimensions
    dimensions: usize,
    /// Attempts per batch before giving up
    max_retries: u32,
}

/// Request payload for the embeddings API
#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

/// Response from the embeddings API
#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

/// Error envelope from the embeddings API
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// A failed attempt, classified for the retry loop.
#[derive(Debug)]
struct AttemptError {
    error: AppError,
    transient: bool,
}

impl AttemptError {
    fn transient(message: String) -> Self {
        Self {
            error: AppError::Embedding(message),
            transient: true,
        }
    }

    fn permanent(message: String) -> Self {
        Self {
            error: AppError::Embedding(message),
            transient: false,
        }
    }
}

impl OpenAiEmbeddingProvider {
    /// Create a provider for `base_url` (or the OpenAI default).
    ///
    /// # Errors
    /// * `AppError::Config` - If the key is not a valid header value or the
    ///   HTTP client cannot be built
    pub fn new(
        base_url: Option<&str>,
        api_key: &str,
        model: String,
        dimensions: usize,
        max_retries: u32,
        timeout: Duration,
    ) -> AppResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|_| AppError::Config("Invalid embedding API key".to_string()))?,
        );

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| {
                AppError::Config(format!("Failed to create HTTP client for embeddings: {}", e))
            })?;

        let base_url = base_url.unwrap_or(DEFAULT_OPENAI_URL).trim_end_matches('/');

        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", base_url),
            model,
            dimensions,
            max_retries: max_retries.max(1),
        })
    }

    /// Build the request body for a batch.
    fn request_body<'a>(&'a self, texts: &'a [String]) -> EmbeddingRequest<'a> {
        // Only the v3 models accept a requested output dimension
        let dimensions = self
            .model
            .starts_with("text-embedding-3")
            .then_some(self.dimensions);

        EmbeddingRequest {
            model: &self.model,
            input: texts,
            dimensions,
        }
    }

    /// Embed one batch with retry logic
    #[instrument(skip(self, texts), fields(batch_size = texts.len(), model = %self.model))]
    async fn embed_with_retries(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.embed_once(texts).await {
                Ok(embeddings) => return Ok(embeddings),
                Err(failure) if failure.transient && attempt < self.max_retries => {
                    let backoff_ms = backoff_ms(attempt);
                    warn!(
                        "Embedding failed (attempt {}/{}), retrying in {}ms: {}",
                        attempt, self.max_retries, backoff_ms, failure.error
                    );
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                }
                Err(failure) => return Err(failure.error),
            }
        }
    }

    /// Embed one batch (no retries)
    async fn embed_once(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AttemptError> {
        debug!("Sending embedding request to {}", self.endpoint);

        let response = self
            .client
            .post(&self.endpoint)
            .json(&self.request_body(texts))
            .send()
            .await
            .map_err(|e| AttemptError::transient(format!("Embedding request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let detail = serde_json::from_str::<ErrorEnvelope>(&error_text)
                .map(|envelope| envelope.error.message)
                .unwrap_or(error_text);
            let message = format!("Embedding API error ({}): {}", status, detail);

            return Err(if is_transient(status) {
                AttemptError::transient(message)
            } else {
                AttemptError::permanent(message)
            });
        }

        let body: EmbeddingResponse = response.json().await.map_err(|e| {
            AttemptError::transient(format!("Failed to parse embedding response: {}", e))
        })?;

        self.collect_embeddings(texts.len(), body)
            .map_err(AttemptError::permanent)
    }

    /// Order embeddings by input index and check count and dimension.
    fn collect_embeddings(
        &self,
        expected: usize,
        response: EmbeddingResponse,
    ) -> Result<Vec<Vec<f32>>, String> {
        if response.data.len() != expected {
            return Err(format!(
                "Embedding API returned {} vectors for {} inputs",
                response.data.len(),
                expected
            ));
        }

        let mut slots: Vec<Option<Vec<f32>>> = vec![None; expected];
        for item in response.data {
            if item.embedding.len() != self.dimensions {
                return Err(format!(
                    "Unexpected embedding dimensions: got {}, expected {}",
                    item.embedding.len(),
                    self.dimensions
                ));
            }
            let slot = slots
                .get_mut(item.index)
                .ok_or_else(|| format!("Embedding index {} out of range", item.index))?;
            if slot.replace(item.embedding).is_some() {
                return Err(format!("Embedding index {} returned twice", item.index));
            }
        }

        // Counts match and no index repeats, so every slot is filled
        Ok(slots.into_iter().flatten().collect())
    }
}

/// Delay before retrying after `attempt` failures, doubling up to a ceiling.
fn backoff_ms(attempt: u32) -> u64 {
    2_u64
        .checked_pow(attempt.saturating_sub(1))
        .and_then(|factor| INITIAL_BACKOFF_MS.checked_mul(factor))
        .map_or(MAX_BACKOFF_MS, |ms| ms.min(MAX_BACKOFF_MS))
}

/// Whether a failed status is worth retrying.
fn is_transient(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    fn provider_name(&self) -> &str {
        "openai"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        if let Some(position) = texts.iter().position(|t| t.is_empty()) {
            return Err(AppError::Embedding(format!(
                "Cannot embed empty text (batch position {})",
                position
            )));
        }

        self.embed_with_retries(texts).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(model: &str, dimensions: usize) -> OpenAiEmbeddingProvider {
        OpenAiEmbeddingProvider::new(
            Some("http://localhost:9/v1/"),
            "sk-test",
            model.to_string(),
            dimensions,
            3,
            Duration::from_secs(1),
        )
        .unwrap()
    }

    fn response(json: &str) -> EmbeddingResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_endpoint_and_metadata() {
        let provider = provider("text-embedding-3-small", 3);
        assert_eq!(provider.endpoint, "http://localhost:9/v1/embeddings");
        assert_eq!(provider.provider_name(), "openai");
        assert_eq!(provider.model_name(), "text-embedding-3-small");
        assert_eq!(provider.dimensions(), 3);
    }

    #[test]
    fn test_request_dimensions_only_for_v3_models() {
        let texts = vec!["a".to_string()];

        let v3 = provider("text-embedding-3-small", 256);
        let body = serde_json::to_value(v3.request_body(&texts)).unwrap();
        assert_eq!(body["dimensions"], 256);
        assert_eq!(body["input"][0], "a");

        let ada = provider("text-embedding-ada-002", 1536);
        let body = serde_json::to_value(ada.request_body(&texts)).unwrap();
        assert!(body.get("dimensions").is_none());
    }

    #[test]
    fn test_collect_orders_by_index() {
        let provider = provider("m", 2);
        let parsed = response(
            r#"{"data":[{"index":1,"embedding":[0.0,1.0]},{"index":0,"embedding":[1.0,0.0]}]}"#,
        );

        let embeddings = provider.collect_embeddings(2, parsed).unwrap();
        assert_eq!(embeddings, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn test_collect_rejects_wrong_dimension() {
        let provider = provider("m", 3);
        let parsed = response(r#"{"data":[{"index":0,"embedding":[1.0,0.0]}]}"#);

        let err = provider.collect_embeddings(1, parsed).unwrap_err();
        assert!(err.contains("expected 3"));
    }

    #[test]
    fn test_collect_rejects_missing_and_duplicate_vectors() {
        let provider = provider("m", 1);

        let short = response(r#"{"data":[{"index":0,"embedding":[1.0]}]}"#);
        assert!(provider.collect_embeddings(2, short).is_err());

        let duplicate =
            response(r#"{"data":[{"index":0,"embedding":[1.0]},{"index":0,"embedding":[2.0]}]}"#);
        assert!(provider.collect_embeddings(2, duplicate).is_err());
    }

    #[test]
    fn test_transient_statuses() {
        assert!(is_transient(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_transient(StatusCode::SERVICE_UNAVAILABLE));
        assert!(!is_transient(StatusCode::UNAUTHORIZED));
        assert!(!is_transient(StatusCode::BAD_REQUEST));
    }

    #[test]
    fn test_backoff_doubles_up_to_ceiling() {
        assert_eq!(backoff_ms(1), 200);
        assert_eq!(backoff_ms(2), 400);
        assert_eq!(backoff_ms(4), 1600);
        assert_eq!(backoff_ms(12), MAX_BACKOFF_MS);
        assert_eq!(backoff_ms(64), MAX_BACKOFF_MS);
        assert_eq!(backoff_ms(u32::MAX), MAX_BACKOFF_MS);
    }

    #[tokio::test]
    async fn test_empty_text_rejected_without_request() {
        let provider = provider("m", 2);
        let err = provider
            .embed_batch(&["ok".to_string(), String::new()])
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Embedding(_)));
        assert!(err.to_string().contains("batch position 1"));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_embedding_error() {
        let provider = OpenAiEmbeddingProvider::new(
            Some("http://127.0.0.1:9/v1"),
            "sk-test",
            "m".to_string(),
            2,
            1,
            Duration::from_millis(200),
        )
        .unwrap();

        let err = provider.embed("hello").await.unwrap_err();
        assert!(matches!(err, AppError::Embedding(_)));
    }
}
