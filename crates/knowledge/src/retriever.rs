//! Query-time retrieval: embed the question and search the index.

use crate::embeddings::EmbeddingProvider;
use crate::types::RetrievedChunk;
use crate::vector_index::VectorIndex;
use sage_core::{AppError, AppResult, IndexError};
use std::sync::Arc;

/// Embeds questions and returns the nearest chunks.
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Option<Arc<dyn VectorIndex>>,
}

impl std::fmt::Debug for Retriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retriever")
            .field("embedder", &self.embedder)
            .field("indexed", &self.index.as_ref().map(|index| index.len()))
            .finish()
    }
}

impl Retriever {
    /// Create a retriever with no index attached yet.
    pub fn new(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            embedder,
            index: None,
        }
    }

    /// Attach the built index.
    pub fn with_index(mut self, index: Arc<dyn VectorIndex>) -> Self {
        self.index = Some(index);
        self
    }

    /// The attached index, if any.
    pub fn index(&self) -> Option<&Arc<dyn VectorIndex>> {
        self.index.as_ref()
    }

    /// Return the `k` chunks closest to `question`, nearest first.
    ///
    /// # Errors
    /// - `IndexError::NotReady` if no index is attached
    /// - `AppError::InvalidQuery` if the question is blank
    /// - `AppError::Embedding` if the question cannot be embedded
    pub async fn retrieve(&self, question: &str, k: usize) -> AppResult<Vec<RetrievedChunk>> {
        let index = self.index.as_ref().ok_or(IndexError::NotReady)?;

        let question = question.trim();
        if question.is_empty() {
            return Err(AppError::InvalidQuery("question must not be empty".to_string()));
        }

        let query = self.embedder.embed(question).await?;
        let results = index.search(&query, k)?;

        tracing::debug!(
            "Retrieved {} chunks (closest distance: {:?})",
            results.len(),
            results.first().map(|(_, d)| *d)
        );

        Ok(results
            .into_iter()
            .map(|(chunk, distance)| RetrievedChunk::from_chunk(chunk, distance))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::hashed::HashedProvider;
    use crate::index::FlatL2Index;
    use crate::types::Chunk;

    fn chunk(number: u32, text: &str) -> Chunk {
        Chunk {
            source_number: number,
            title: format!("Teaching {}", number),
            sequence: 0,
            text: text.to_string(),
            byte_range: 0..text.len(),
        }
    }

    async fn retriever() -> Retriever {
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(HashedProvider::new("m", 128));
        let chunks = vec![
            chunk(1, "Ocean waves and tides roll on the shore."),
            chunk(2, "Breath meditation brings calm and silence."),
            chunk(3, "Climbing mountains over rocks and ridges."),
        ];

        let mut pairs = Vec::new();
        for c in chunks {
            pairs.push((embedder.embed(&c.text).await.unwrap(), c));
        }
        let index = FlatL2Index::build(128, pairs).unwrap();

        Retriever::new(embedder).with_index(Arc::new(index))
    }

    #[tokio::test]
    async fn test_retrieve_nearest_first() {
        let retriever = retriever().await;
        let results = retriever.retrieve("calm breath meditation", 2).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].source_number, 2);
        assert_eq!(results[0].title, "Teaching 2");
        assert!(results[0].distance <= results[1].distance);
    }

    #[tokio::test]
    async fn test_retrieve_without_index_is_not_ready() {
        let retriever = Retriever::new(Arc::new(HashedProvider::new("m", 8)));
        let err = retriever.retrieve("anything", 3).await.unwrap_err();

        assert!(matches!(err, AppError::Index(IndexError::NotReady)));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_blank_question_rejected() {
        let retriever = retriever().await;
        let err = retriever.retrieve("   ", 3).await.unwrap_err();

        assert!(matches!(err, AppError::InvalidQuery(_)));
        assert!(!err.is_fatal());
    }

    #[tokio::test]
    async fn test_query_dimension_mismatch_is_index_error() {
        let retriever = Retriever::new(Arc::new(HashedProvider::new("m", 8)))
            .with_index(Arc::new(FlatL2Index::build(4, vec![(vec![0.0; 4], chunk(1, "x"))]).unwrap()));

        let err = retriever.retrieve("question", 1).await.unwrap_err();
        assert!(matches!(err, AppError::Index(IndexError::DimensionMismatch { expected: 4, actual: 8 })));
    }
}
