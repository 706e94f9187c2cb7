//! Exact in-memory vector index.
//!
//! Vectors are stored contiguously and searched by brute force with squared
//! Euclidean distance. For a corpus of a few hundred teachings this is both
//! exact and fast enough to run on every query.

use crate::types::Chunk;
use crate::vector_index::VectorIndex;
use sage_core::IndexError;
use std::cmp::Ordering;

/// Flat squared-L2 index over chunk embeddings.
#[derive(Debug, Clone)]
pub struct FlatL2Index {
    dimension: usize,
    /// Row-major vectors, `dimension` values per chunk
    vectors: Vec<f32>,
    chunks: Vec<Chunk>,
}

impl FlatL2Index {
    /// Bulk-load an index from (vector, chunk) pairs.
    ///
    /// # Errors
    /// - `IndexError::ZeroDimension` if `dimension` is zero
    /// - `IndexError::DimensionMismatch` if any vector has another length
    /// - `IndexError::NonFiniteComponent` if any component is NaN or infinite
    pub fn build<I>(dimension: usize, pairs: I) -> Result<Self, IndexError>
    where
        I: IntoIterator<Item = (Vec<f32>, Chunk)>,
    {
        if dimension == 0 {
            return Err(IndexError::ZeroDimension);
        }

        let pairs = pairs.into_iter();
        let (lower, _) = pairs.size_hint();
        let mut vectors = Vec::with_capacity(lower * dimension);
        let mut chunks = Vec::with_capacity(lower);

        for (position, (vector, chunk)) in pairs.enumerate() {
            if vector.len() != dimension {
                return Err(IndexError::DimensionMismatch {
                    expected: dimension,
                    actual: vector.len(),
                });
            }
            if vector.iter().any(|v| !v.is_finite()) {
                return Err(IndexError::NonFiniteComponent { position });
            }
            vectors.extend_from_slice(&vector);
            chunks.push(chunk);
        }

        tracing::debug!(
            "Built flat L2 index: {} vectors, dimension {}",
            chunks.len(),
            dimension
        );

        Ok(Self {
            dimension,
            vectors,
            chunks,
        })
    }

    /// Indexed chunks in insertion order.
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }
}

/// Squared Euclidean distance between equal-length vectors.
fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

impl VectorIndex for FlatL2Index {
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<(&Chunk, f32)>, IndexError> {
        if query.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        if k == 0 || self.chunks.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .chunks_exact(self.dimension)
            .map(|vector| squared_l2(query, vector))
            .enumerate()
            .collect();

        // Stable sort keeps insertion order among equal distances
        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(i, distance)| (&self.chunks[i], distance))
            .collect())
    }

    fn len(&self) -> usize {
        self.chunks.len()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
