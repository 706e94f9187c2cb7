//! Text chunking with configurable size and overlap.
//!
//! Sizes are measured in extended grapheme clusters, so a chunk boundary never
//! splits a user-perceived character. Chunks are exact slices of the teaching
//! body: with zero overlap, concatenating a teaching's chunks in sequence order
//! reproduces the body byte for byte.

use crate::types::{Chunk, TeachingRecord};
use sage_core::config::RagSettings;
use sage_core::{AppError, AppResult};
use unicode_segmentation::UnicodeSegmentation;

/// Validated chunk size and overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSettings {
    size: usize,
    overlap: usize,
}

impl ChunkSettings {
    /// # Errors
    /// Returns a configuration error if `size` is zero or `overlap >= size`.
    pub fn new(size: usize, overlap: usize) -> AppResult<Self> {
        if size == 0 {
            return Err(AppError::Config("chunk size must be greater than zero".to_string()));
        }
        if overlap >= size {
            return Err(AppError::Config(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                overlap, size
            )));
        }
        Ok(Self { size, overlap })
    }

    pub fn from_settings(settings: &RagSettings) -> AppResult<Self> {
        Self::new(settings.chunk_size, settings.chunk_overlap)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }
}

/// Split a teaching into chunks.
///
/// Each chunk covers at most `size` graphemes. Consecutive chunks share
/// exactly `overlap` graphemes. A whitespace-only final chunk is folded into
/// the chunk before it, so that chunk may run past `size`. The result is
/// deterministic for a given body and settings.
pub fn chunk(record: &TeachingRecord, settings: &ChunkSettings) -> Vec<Chunk> {
    let body = record.body.as_str();
    if body.is_empty() {
        return Vec::new();
    }

    // Byte offset of every grapheme start, plus the end of the body.
    let mut boundaries: Vec<usize> = body.grapheme_indices(true).map(|(i, _)| i).collect();
    let graphemes = boundaries.len();
    boundaries.push(body.len());

    let mut chunks = Vec::new();
    let mut start = 0usize;
    let mut sequence = 0u32;

    loop {
        let end = (start + settings.size).min(graphemes);
        let byte_range = boundaries[start]..boundaries[end];

        chunks.push(Chunk {
            source_number: record.number,
            title: record.title.clone(),
            sequence,
            text: body[byte_range.clone()].to_string(),
            byte_range,
        });

        if end == graphemes {
            break;
        }

        start = end - settings.overlap;
        sequence += 1;
    }

    if chunks.len() > 1 && chunks.last().is_some_and(|c| c.text.trim().is_empty()) {
        chunks.pop();
        if let Some(last) = chunks.last_mut() {
            last.byte_range.end = body.len();
            last.text = body[last.byte_range.clone()].to_string();
        }
    }

    tracing::debug!(
        "Chunked teaching #{} into {} chunks (size: {}, overlap: {})",
        record.number,
        chunks.len(),
        settings.size,
        settings.overlap
    );

    chunks
}

/// Chunk every teaching, preserving teaching order.
pub fn chunk_all(records: &[TeachingRecord], settings: &ChunkSettings) -> Vec<Chunk> {
    records
        .iter()
        .flat_map(|record| chunk(record, settings))
        .collect()
}
