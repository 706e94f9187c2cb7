//! RAG (Retrieval-Augmented Generation) answering.
//!
//! Turns retrieved teaching passages into a model answer with sources.

pub mod generator;
pub mod types;

pub use generator::Generator;
pub use types::{Answer, SourceRef};
