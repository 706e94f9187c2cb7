//! Error types for the Sage teachings assistant.
//!
//! This module defines a unified error enum covering every failure class of
//! the answer pipeline: corpus, configuration, provider, index, and
//! generation-exhausted errors, plus the ambient I/O, prompt, and
//! serialization errors.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for the Sage workspace.
///
/// All fallible functions return `Result<T, AppError>`.
/// We never panic: errors must be represented and propagated.
#[derive(Error, Debug)]
pub enum AppError {
    /// Empty, duplicate, or malformed source documents
    #[error("Corpus error: {0}")]
    Corpus(#[from] CorpusError),

    /// Missing or invalid configuration, including absent credentials
    #[error("Configuration error: {0}")]
    Config(String),

    /// Embedding provider failures (network, auth, malformed response)
    #[error("Embedding provider error: {0}")]
    Embedding(String),

    /// A single generation provider failed
    #[error("LLM error: {0}")]
    Llm(String),

    /// Vector index misuse: dimension mismatch or not built
    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    /// Every configured generation provider failed for this request
    #[error("Generation unavailable: {}", format_attempts(.attempts))]
    GenerationUnavailable { attempts: Vec<ProviderFailure> },

    /// The caller supplied a question that cannot be answered
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Prompt template errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl AppError {
    /// Whether this error means the process itself is unfit to serve.
    ///
    /// Configuration and index errors cannot be fixed by retrying a query;
    /// everything else is reported to the caller as that query's failure.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Index(_))
    }
}

/// Failures detected while loading the teaching corpus.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CorpusError {
    #[error("no teaching files with extension '.{extension}' found in {dir:?}")]
    Empty { dir: PathBuf, extension: String },

    #[error("corpus directory {0:?} does not exist or is not a directory")]
    MissingDirectory(PathBuf),

    #[error("teaching #{number} is declared by both {first:?} and {second:?}")]
    DuplicateTeaching {
        number: u32,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("{path:?}: {reason}")]
    Malformed { path: PathBuf, reason: String },

    #[error("failed to read {path:?}: {reason}")]
    Unreadable { path: PathBuf, reason: String },
}

/// Vector index errors. Both indicate a programming or configuration fault.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    #[error("vector dimension mismatch: index expects {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("vector #{position} has a non-finite component")]
    NonFiniteComponent { position: usize },

    #[error("index dimension must be greater than zero")]
    ZeroDimension,

    #[error("retrieval attempted before the index was built")]
    NotReady,
}

/// One failed generation attempt, kept for the exhausted-providers report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderFailure {
    /// Slot that failed ("primary" or "secondary")
    pub role: String,

    /// Provider name (e.g., "openai", "groq")
    pub provider: String,

    /// Failure description
    pub message: String,
}

impl fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.role, self.provider, self.message)
    }
}

fn format_attempts(attempts: &[ProviderFailure]) -> String {
    if attempts.is_empty() {
        return "no generation provider is available".to_string();
    }
    attempts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
