//! Prompt system for the Sage teachings assistant.
//!
//! This crate provides:
//! - Handlebars template rendering with HTML escaping disabled
//! - Attributed, order-preserving injection of retrieved passages
//! - YAML prompt files and resolution from the `chatbot` settings section

pub mod builder;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::build_prompt;
pub use loader::{load_prompt_file, resolve_template};
pub use types::{
    BuiltPrompt, BuiltPromptMetadata, ContextEntry, PromptTemplate, DEFAULT_SYSTEM_PROMPT,
    DEFAULT_TEMPLATE,
};
