//! RAG response types.

use crate::types::RetrievedChunk;
use sage_llm::ProviderRole;
use serde::{Deserialize, Serialize};

/// Maximum snippet length for source references, in bytes.
pub const MAX_SNIPPET_LENGTH: usize = 150;

/// A passage used to answer a question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    /// Teaching number
    pub number: u32,

    /// Teaching title
    pub title: String,

    /// Chunk position within the teaching
    pub sequence: u32,

    /// Squared Euclidean distance to the question
    pub distance: f32,

    /// Short excerpt of the passage
    pub snippet: String,
}

impl From<&RetrievedChunk> for SourceRef {
    fn from(chunk: &RetrievedChunk) -> Self {
        Self {
            number: chunk.source_number,
            title: chunk.title.clone(),
            sequence: chunk.sequence,
            distance: chunk.distance,
            snippet: truncate_snippet(&chunk.text, MAX_SNIPPET_LENGTH),
        }
    }
}

/// A generated answer with its provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    /// Answer text from the model
    pub text: String,

    /// Passages given to the model, in retrieval order
    pub sources: Vec<SourceRef>,

    /// Provider slot that produced the answer
    pub role: ProviderRole,

    /// Provider name (e.g., "openai", "groq")
    pub provider: String,

    /// Model that produced the answer
    pub model: String,
}

impl Answer {
    /// Distinct teaching numbers cited, in first-appearance order.
    pub fn teachings(&self) -> Vec<u32> {
        let mut numbers = Vec::new();
        for source in &self.sources {
            if !numbers.contains(&source.number) {
                numbers.push(source.number);
            }
        }
        numbers
    }
}

/// Truncate snippet to at most `max_len` bytes, preferring a word boundary.
pub fn truncate_snippet(text: &str, max_len: usize) -> String {
    let text = text.trim();
    if text.len() <= max_len {
        return text.to_string();
    }

    let mut end = max_len;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    let truncated = &text[..end];

    match truncated.rfind(char::is_whitespace) {
        Some(last_space) if last_space > 0 => format!("{}...", truncated[..last_space].trim_end()),
        _ => format!("{}...", truncated),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn retrieved(number: u32, text: &str) -> RetrievedChunk {
        RetrievedChunk {
            text: text.to_string(),
            source_number: number,
            title: format!("T{}", number),
            sequence: 0,
            distance: 0.5,
        }
    }

    #[test]
    fn test_truncate_snippet() {
        assert_eq!(truncate_snippet("Short text", 100), "Short text");

        let long = "This is a very long text that needs to be truncated at some point";
        let result = truncate_snippet(long, 30);
        assert!(result.len() <= 33);
        assert!(result.ends_with("..."));
        assert!(!result.contains("trun"));
    }

    #[test]
    fn test_truncate_snippet_multibyte() {
        let text = "日本語".repeat(20);
        let result = truncate_snippet(&text, 10);
        assert!(result.ends_with("..."));
        assert_eq!(result, "日本語...");
    }

    #[test]
    fn test_answer_teachings_deduplicated_in_order() {
        let answer = Answer {
            text: "x".to_string(),
            sources: vec![
                SourceRef::from(&retrieved(5, "a")),
                SourceRef::from(&retrieved(2, "b")),
                SourceRef::from(&retrieved(5, "c")),
            ],
            role: ProviderRole::Primary,
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
        };

        assert_eq!(answer.teachings(), vec![5, 2]);
    }

    #[test]
    fn test_source_ref_serialization() {
        let source = SourceRef::from(&retrieved(3, "Stillness is a practice."));
        let json = serde_json::to_value(&source).unwrap();

        assert_eq!(json["number"], 3);
        assert_eq!(json["title"], "T3");
        assert_eq!(json["snippet"], "Stillness is a practice.");
    }
}
