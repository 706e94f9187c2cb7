//! Vector index abstraction for teaching chunks.
//!
//! An index is built once from (vector, chunk) pairs and is read-only
//! afterwards. It has no insert, delete, load, or save operations.

use crate::types::Chunk;
use sage_core::IndexError;

/// Read-only k-nearest-neighbour search over chunk embeddings.
pub trait VectorIndex: Send + Sync {
    /// Search for the `k` chunks closest to `query`.
    ///
    /// Returns at most `k` pairs ordered by ascending squared Euclidean
    /// distance. The result is empty only when the index is empty or `k`
    /// is zero.
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<(&Chunk, f32)>, IndexError>;

    /// Number of indexed vectors.
    fn len(&self) -> usize;

    /// Whether the index holds no vectors.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dimension every vector in the index has.
    fn dimension(&self) -> usize;
}
