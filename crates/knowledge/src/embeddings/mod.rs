//! Embedding engine for the teaching corpus.
//!
//! Provides provider-agnostic embedding generation and the batched,
//! concurrent embedding pass used while building the index.

pub mod provider;
pub mod providers;

pub use provider::{create_provider, EmbeddingProvider};

use crate::progress::ProgressReporter;
use futures::stream::{self, StreamExt, TryStreamExt};
use sage_core::{AppError, AppResult};

/// Batching knobs for bulk embedding.
#[derive(Debug, Clone, Copy)]
pub struct BatchOptions {
    /// Texts per provider call
    pub batch_size: usize,

    /// Provider calls in flight at once
    pub concurrency: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            batch_size: 64,
            concurrency: 4,
        }
    }
}

/// Embed `texts` in batches, running up to `concurrency` batches at once.
///
/// Output order matches input order. The first failing batch aborts the
/// whole pass; nothing is substituted for a failed embedding.
pub async fn embed_texts(
    provider: &dyn EmbeddingProvider,
    texts: &[String],
    options: BatchOptions,
    progress: &ProgressReporter,
) -> AppResult<Vec<Vec<f32>>> {
    if texts.is_empty() {
        return Ok(Vec::new());
    }

    let batch_size = options.batch_size.max(1);
    let concurrency = options.concurrency.max(1);
    let total = texts.len() as u64;

    tracing::info!(
        "Embedding {} texts using provider '{}' (model: {}, batch size: {}, concurrency: {})",
        texts.len(),
        provider.provider_name(),
        provider.model_name(),
        batch_size,
        concurrency
    );

    let batches: Vec<Vec<Vec<f32>>> = stream::iter(texts.chunks(batch_size))
        .map(|batch| embed_checked(provider, batch))
        .buffered(concurrency)
        .inspect_ok({
            let mut done = 0u64;
            move |batch| {
                done += batch.len() as u64;
                progress.embed(done, Some(total), provider.model_name());
            }
        })
        .try_collect()
        .await?;

    let embeddings: Vec<Vec<f32>> = batches.into_iter().flatten().collect();

    tracing::debug!(
        "Generated {} embeddings of dimension {}",
        embeddings.len(),
        provider.dimensions()
    );

    Ok(embeddings)
}

/// Embed one batch and check the provider returned one vector per text.
async fn embed_checked(
    provider: &dyn EmbeddingProvider,
    batch: &[String],
) -> AppResult<Vec<Vec<f32>>> {
    let embeddings = provider.embed_batch(batch).await?;
    if embeddings.len() != batch.len() {
        return Err(AppError::Embedding(format!(
            "Provider returned {} embeddings for {} texts",
            embeddings.len(),
            batch.len()
        )));
    }
    Ok(embeddings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::hashed::HashedProvider;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Provider that fails on a chosen call and records batch sizes.
    #[derive(Debug, Default)]
    struct CountingProvider {
        calls: AtomicUsize,
        fail_on_call: Option<usize>,
        batch_sizes: Mutex<Vec<usize>>,
    }

    #[async_trait::async_trait]
    impl EmbeddingProvider for CountingProvider {
        fn provider_name(&self) -> &str {
            "counting"
        }

        fn model_name(&self) -> &str {
            "counting-v1"
        }

        fn dimensions(&self) -> usize {
            1
        }

        async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            self.batch_sizes.lock().unwrap().push(texts.len());
            if Some(call) == self.fail_on_call {
                return Err(AppError::Embedding("quota exceeded".to_string()));
            }
            Ok(texts
                .iter()
                .map(|t| vec![t.parse::<f32>().unwrap_or(-1.0)])
                .collect())
        }
    }

    fn numbered(n: usize) -> Vec<String> {
        (0..n).map(|i| i.to_string()).collect()
    }

    #[tokio::test]
    async fn test_batches_preserve_order() {
        let provider = CountingProvider::default();
        let options = BatchOptions {
            batch_size: 3,
            concurrency: 4,
        };

        let embeddings = embed_texts(&provider, &numbered(10), options, &ProgressReporter::noop())
            .await
            .unwrap();

        let values: Vec<f32> = embeddings.iter().map(|v| v[0]).collect();
        assert_eq!(values, (0..10).map(|i| i as f32).collect::<Vec<_>>());

        let mut sizes = provider.batch_sizes.lock().unwrap().clone();
        sizes.sort_unstable();
        assert_eq!(sizes, vec![1, 3, 3, 3]);
    }

    #[tokio::test]
    async fn test_failure_aborts_pass() {
        let provider = CountingProvider {
            fail_on_call: Some(1),
            ..CountingProvider::default()
        };
        let options = BatchOptions {
            batch_size: 2,
            concurrency: 1,
        };

        let err = embed_texts(&provider, &numbered(6), options, &ProgressReporter::noop())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Embedding(_)));
    }

    #[tokio::test]
    async fn test_progress_reports_embedded_count() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let reporter = ProgressReporter::new(Arc::new(move |event| {
            sink.lock().unwrap().push(event);
        }));

        let provider = HashedProvider::new("m", 16);
        let options = BatchOptions {
            batch_size: 2,
            concurrency: 2,
        };
        embed_texts(&provider, &numbered(5), options, &reporter)
            .await
            .unwrap();

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events.last().map(|e| e.current), Some(5));
        assert!(events.iter().all(|e| e.phase == "embed"));
    }

    #[tokio::test]
    async fn test_empty_input() {
        let provider = CountingProvider::default();
        let embeddings = embed_texts(&provider, &[], BatchOptions::default(), &ProgressReporter::noop())
            .await
            .unwrap();

        assert!(embeddings.is_empty());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }
}
