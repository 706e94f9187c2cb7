//! Sage Core Library
//!
//! Foundational utilities shared by every Sage crate:
//! - Error handling (`AppError`, `AppResult`, and the corpus/index error kinds)
//! - Logging infrastructure
//! - Configuration schema and credential resolution

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use config::{AppConfig, Settings};
pub use error::{AppError, AppResult, CorpusError, IndexError, ProviderFailure};
