//! Teachings knowledge base and question answering.
//!
//! Loads a directory of numbered teachings, splits them into chunks, embeds
//! the chunks into an exact in-memory index, and answers questions by
//! retrieving the closest passages and sending them to a generation provider.

pub mod chunker;
pub mod embeddings;
pub mod index;
pub mod loader;
pub mod pipeline;
pub mod progress;
pub mod rag;
pub mod retriever;
pub mod types;
pub mod vector_index;

// Re-export commonly used types
pub use chunker::ChunkSettings;
pub use embeddings::{create_provider, EmbeddingProvider};
pub use index::FlatL2Index;
pub use loader::{load_teachings, HeadingRule, LoaderOptions, RegexHeadingRule};
pub use pipeline::{Backends, Pipeline, PipelineStats, StartupError, StartupStage};
pub use progress::{ProgressEvent, ProgressReporter};
pub use rag::{Answer, Generator, SourceRef};
pub use retriever::Retriever;
pub use types::{Chunk, RetrievedChunk, TeachingRecord};
pub use vector_index::VectorIndex;

#[cfg(test)]
mod tests;
