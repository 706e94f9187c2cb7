//! Knowledge system type definitions.

use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::path::PathBuf;

/// One teaching document, parsed once at startup and never modified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeachingRecord {
    /// Teaching number (positive, unique within the corpus)
    pub number: u32,

    /// Teaching title (non-empty)
    pub title: String,

    /// Full source markdown
    pub body: String,

    /// File the teaching was read from
    pub path: PathBuf,
}

/// A contiguous span of a teaching's body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Number of the teaching this chunk came from
    pub source_number: u32,

    /// Title of that teaching, carried for attribution
    pub title: String,

    /// Position of the chunk within its teaching, starting at 0
    pub sequence: u32,

    /// Chunk text
    pub text: String,

    /// Byte offsets of `text` within the teaching body
    pub byte_range: Range<usize>,
}

/// A chunk returned by retrieval, with its distance to the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    /// Chunk text
    pub text: String,

    /// Teaching number
    pub source_number: u32,

    /// Teaching title
    pub title: String,

    /// Position of the chunk within its teaching
    pub sequence: u32,

    /// Squared Euclidean distance to the query (lower is closer)
    pub distance: f32,
}

impl RetrievedChunk {
    /// Build a retrieval result from an indexed chunk.
    pub fn from_chunk(chunk: &Chunk, distance: f32) -> Self {
        Self {
            text: chunk.text.clone(),
            source_number: chunk.source_number,
            title: chunk.title.clone(),
            sequence: chunk.sequence,
            distance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retrieved_chunk_from_chunk() {
        let chunk = Chunk {
            source_number: 4,
            title: "Patience".to_string(),
            sequence: 2,
            text: "Wait.".to_string(),
            byte_range: 10..15,
        };

        let retrieved = RetrievedChunk::from_chunk(&chunk, 0.25);
        assert_eq!(retrieved.source_number, 4);
        assert_eq!(retrieved.title, "Patience");
        assert_eq!(retrieved.sequence, 2);
        assert_eq!(retrieved.text, "Wait.");
        assert_eq!(retrieved.distance, 0.25);
    }

    #[test]
    fn test_chunk_serialization() {
        let chunk = Chunk {
            source_number: 1,
            title: "Breath".to_string(),
            sequence: 0,
            text: "In and out.".to_string(),
            byte_range: 0..11,
        };

        let json = serde_json::to_value(&chunk).unwrap();
        assert_eq!(json["source_number"], 1);
        assert_eq!(json["byte_range"]["start"], 0);
        assert_eq!(json["byte_range"]["end"], 11);
    }
}
