//! Generation provider integration for Sage.
//!
//! This crate provides a provider-agnostic abstraction over chat completion
//! APIs and an ordered fallback chain across the configured providers.
//!
//! # Providers
//! - **OpenAI**: `https://api.openai.com/v1`
//! - **Groq**: OpenAI-compatible endpoint at `https://api.groq.com/openai/v1`
//!
//! # Example
//! ```no_run
//! use sage_llm::{LlmRequest, ProviderChain};
//! use sage_core::config::{env_lookup, ModelProviderSettings};
//!
//! # async fn example(settings: ModelProviderSettings) -> Result<(), Box<dyn std::error::Error>> {
//! let chain = ProviderChain::from_settings(&settings, env_lookup)?;
//! let answer = chain.complete(&LlmRequest::new("What is patience?", "")).await?;
//! println!("{} via {}", answer.response.content, answer.provider);
//! # Ok(())
//! # }
//! ```

pub mod chain;
pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

// Re-export main types
pub use chain::{ChainResponse, ProviderChain, ProviderSlot};
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::OpenAiCompatibleClient;
pub use types::{default_base_url, ProviderRole};
