//! LLM provider factory.
//!
//! Creates generation clients from provider settings. Secrets are resolved by
//! the caller and passed in, so the factory never reads the environment.

use crate::client::LlmClient;
use crate::providers::OpenAiCompatibleClient;
use crate::types::default_base_url;
use sage_core::config::{ProviderKind, ProviderSettings};
use sage_core::AppResult;
use std::sync::Arc;
use std::time::Duration;

/// Create an LLM client for a configured provider slot.
///
/// # Errors
/// Returns a configuration error if the key is blank or the HTTP client
/// cannot be built.
pub fn create_client(settings: &ProviderSettings, api_key: &str) -> AppResult<Arc<dyn LlmClient>> {
    let base_url = settings
        .base_url
        .as_deref()
        .unwrap_or_else(|| default_base_url(settings.kind));
    let timeout = Duration::from_secs(settings.timeout_secs);

    match settings.kind {
        ProviderKind::OpenAI | ProviderKind::Groq => {
            let client =
                OpenAiCompatibleClient::new(settings.kind.as_str(), base_url, api_key, timeout)?;
            Ok(Arc::new(client))
        }
    }
}
