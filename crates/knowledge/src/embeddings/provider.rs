//! Embedding provider trait and factory.

use sage_core::config::{resolve_credential, EmbeddingProviderKind, EmbeddingSettings};
use sage_core::{AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

use super::providers::hashed::HashedProvider;
use super::providers::openai::OpenAiEmbeddingProvider;

/// Trait for embedding providers.
///
/// Implementations are deterministic for a fixed model and return an error
/// rather than a placeholder vector when embedding fails.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "openai", "hashed")
    fn provider_name(&self) -> &str;

    /// Get model identifier
    fn model_name(&self) -> &str;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Generate embeddings for multiple texts, in input order.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    /// Generate embedding for a single text (convenience method).
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut results = self.embed_batch(&[text.to_string()]).await?;
        results
            .pop()
            .ok_or_else(|| AppError::Embedding("No embedding returned".to_string()))
    }
}

/// Create an embedding provider from settings.
///
/// Remote providers resolve their API key through `lookup`; a missing key is
/// a configuration error.
pub fn create_provider<F>(
    settings: &EmbeddingSettings,
    lookup: F,
) -> AppResult<Arc<dyn EmbeddingProvider>>
where
    F: Fn(&str) -> Option<String>,
{
    tracing::debug!(
        provider = settings.provider.as_str(),
        model = %settings.model,
        dimensions = settings.dimension,
        "Creating embedding provider"
    );

    match settings.provider {
        EmbeddingProviderKind::Hashed => Ok(Arc::new(HashedProvider::new(
            settings.model.clone(),
            settings.dimension,
        ))),

        EmbeddingProviderKind::OpenAI => {
            let env_name = settings.api_key_env();
            let api_key = resolve_credential(env_name, lookup).ok_or_else(|| {
                AppError::Config(format!(
                    "Embedding provider 'openai' requires {} to be set",
                    env_name
                ))
            })?;

            let provider = OpenAiEmbeddingProvider::new(
                settings.base_url.as_deref(),
                &api_key,
                settings.model.clone(),
                settings.dimension,
                settings.max_retries,
                Duration::from_secs(settings.timeout_secs),
            )?;
            Ok(Arc::new(provider))
        }
    }
}
