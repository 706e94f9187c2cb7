//! Ordered provider chain with single-attempt fallback.
//!
//! A request goes to the primary provider first. Any provider failure moves
//! on to the secondary, if one is configured and has a credential. Each
//! provider is tried at most once per request, which bounds worst-case latency
//! to one timeout per configured provider.

use crate::client::{LlmClient, LlmRequest, LlmResponse};
use crate::factory::create_client;
use crate::types::ProviderRole;
use sage_core::config::{resolve_credential, ModelProviderSettings};
use sage_core::{AppError, AppResult, ProviderFailure};
use std::sync::Arc;

/// A configured, credentialed provider.
#[derive(Clone)]
pub struct ProviderSlot {
    /// Fallback position
    pub role: ProviderRole,

    /// Model requested from this provider
    pub model: String,

    /// Client used for completions
    pub client: Arc<dyn LlmClient>,
}

impl std::fmt::Debug for ProviderSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSlot")
            .field("role", &self.role)
            .field("provider", &self.client.provider_name())
            .field("model", &self.model)
            .finish()
    }
}

/// Successful completion plus the slot that produced it.
#[derive(Debug, Clone)]
pub struct ChainResponse {
    pub role: ProviderRole,
    pub provider: String,
    pub response: LlmResponse,
}

/// Generation providers in fallback order.
#[derive(Debug, Clone)]
pub struct ProviderChain {
    slots: Vec<ProviderSlot>,
}

impl ProviderChain {
    /// Build a chain from explicit slots.
    ///
    /// Slots are ordered by role. At least one slot is required and each role
    /// may appear once.
    pub fn new(mut slots: Vec<ProviderSlot>) -> AppResult<Self> {
        if slots.is_empty() {
            return Err(AppError::Config(
                "No generation provider is available".to_string(),
            ));
        }

        slots.sort_by_key(|slot| slot.role);
        if slots.windows(2).any(|pair| pair[0].role == pair[1].role) {
            return Err(AppError::Config(
                "Each provider role may be configured only once".to_string(),
            ));
        }

        Ok(Self { slots })
    }

    /// Build a chain from settings, resolving credentials through `lookup`.
    ///
    /// A provider whose key is absent is skipped with a warning. If no
    /// provider has a key the pipeline cannot serve, so this fails.
    pub fn from_settings<F>(settings: &ModelProviderSettings, lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut slots = Vec::new();
        let mut missing = Vec::new();

        for (role_name, provider) in settings.slots() {
            let role = ProviderRole::parse(role_name).ok_or_else(|| {
                AppError::Config(format!("Unknown provider role: {}", role_name))
            })?;
            let env_name = provider.api_key_env();

            match resolve_credential(env_name, &lookup) {
                Some(key) => {
                    let client = create_client(provider, &key)?;
                    tracing::info!(
                        role = %role,
                        provider = provider.kind.as_str(),
                        model = %provider.model,
                        "Generation provider available"
                    );
                    slots.push(ProviderSlot {
                        role,
                        model: provider.model.clone(),
                        client,
                    });
                }
                None => {
                    tracing::warn!(
                        role = %role,
                        provider = provider.kind.as_str(),
                        "{} not set; provider unavailable",
                        env_name
                    );
                    missing.push(env_name.to_string());
                }
            }
        }

        if slots.is_empty() {
            return Err(AppError::Config(format!(
                "No API keys found for any generation provider (checked: {})",
                missing.join(", ")
            )));
        }

        Self::new(slots)
    }

    /// Slots in the order they will be tried.
    pub fn slots(&self) -> &[ProviderSlot] {
        &self.slots
    }

    /// Complete `request`, falling back through the chain.
    ///
    /// The request's model is replaced by each slot's configured model.
    pub async fn complete(&self, request: &LlmRequest) -> AppResult<ChainResponse> {
        let mut attempts = Vec::new();

        for slot in &self.slots {
            let provider = slot.client.provider_name().to_string();
            let slot_request = request.for_model(&slot.model);

            match slot.client.complete(&slot_request).await {
                Ok(response) => {
                    if !attempts.is_empty() {
                        tracing::info!(role = %slot.role, provider = %provider, "Fallback provider answered");
                    }
                    return Ok(ChainResponse {
                        role: slot.role,
                        provider,
                        response,
                    });
                }
                Err(e) => {
                    tracing::warn!(role = %slot.role, provider = %provider, "Provider failed: {}", e);
                    attempts.push(ProviderFailure {
                        role: slot.role.to_string(),
                        provider,
                        message: e.to_string(),
                    });
                }
            }
        }

        Err(AppError::GenerationUnavailable { attempts })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::LlmUsage;
    use sage_core::config::{ProviderKind, ProviderSettings};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Test double that either always fails or echoes its model name.
    struct ScriptedClient {
        name: &'static str,
        fail: bool,
        calls: AtomicUsize,
    }

    impl ScriptedClient {
        fn new(name: &'static str, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                name,
                fail,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl LlmClient for ScriptedClient {
        fn provider_name(&self) -> &str {
            self.name
        }

        async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(AppError::Llm(format!("{} quota exceeded", self.name)));
            }
            Ok(LlmResponse {
                content: format!("answer from {}", request.model),
                model: request.model.clone(),
                usage: LlmUsage::default(),
            })
        }
    }

    fn slot(role: ProviderRole, model: &str, client: Arc<ScriptedClient>) -> ProviderSlot {
        ProviderSlot {
            role,
            model: model.to_string(),
            client,
        }
    }

    #[tokio::test]
    async fn test_primary_success_skips_secondary() {
        let primary = ScriptedClient::new("openai", false);
        let secondary = ScriptedClient::new("groq", false);
        let chain = ProviderChain::new(vec![
            slot(ProviderRole::Primary, "gpt", primary.clone()),
            slot(ProviderRole::Secondary, "llama", secondary.clone()),
        ])
        .unwrap();

        let result = chain.complete(&LlmRequest::new("q", "unused")).await.unwrap();

        assert_eq!(result.role, ProviderRole::Primary);
        assert_eq!(result.response.content, "answer from gpt");
        assert_eq!(primary.calls(), 1);
        assert_eq!(secondary.calls(), 0);
    }

    #[tokio::test]
    async fn test_failing_primary_falls_back_once() {
        let primary = ScriptedClient::new("openai", true);
        let secondary = ScriptedClient::new("groq", false);
        let chain = ProviderChain::new(vec![
            slot(ProviderRole::Secondary, "llama", secondary.clone()),
            slot(ProviderRole::Primary, "gpt", primary.clone()),
        ])
        .unwrap();

        let result = chain.complete(&LlmRequest::new("q", "unused")).await.unwrap();

        assert_eq!(result.role, ProviderRole::Secondary);
        assert_eq!(result.provider, "groq");
        assert_eq!(result.response.content, "answer from llama");
        assert_eq!(primary.calls(), 1);
        assert_eq!(secondary.calls(), 1);
    }

    #[tokio::test]
    async fn test_all_failing_reports_each_attempt() {
        let primary = ScriptedClient::new("openai", true);
        let secondary = ScriptedClient::new("groq", true);
        let chain = ProviderChain::new(vec![
            slot(ProviderRole::Primary, "gpt", primary.clone()),
            slot(ProviderRole::Secondary, "llama", secondary.clone()),
        ])
        .unwrap();

        let err = chain.complete(&LlmRequest::new("q", "unused")).await.unwrap_err();

        match err {
            AppError::GenerationUnavailable { attempts } => {
                assert_eq!(attempts.len(), 2);
                assert_eq!(attempts[0].role, "primary");
                assert_eq!(attempts[1].provider, "groq");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(primary.calls(), 1);
        assert_eq!(secondary.calls(), 1);
    }

    #[tokio::test]
    async fn test_primary_only_failure_is_not_retried() {
        let primary = ScriptedClient::new("openai", true);
        let chain = ProviderChain::new(vec![slot(ProviderRole::Primary, "gpt", primary.clone())])
            .unwrap();

        let err = chain.complete(&LlmRequest::new("q", "unused")).await.unwrap_err();

        assert!(matches!(err, AppError::GenerationUnavailable { ref attempts } if attempts.len() == 1));
        assert!(!err.is_fatal());
        assert_eq!(primary.calls(), 1);
    }

    #[test]
    fn test_empty_and_duplicate_slots_rejected() {
        assert!(ProviderChain::new(vec![]).is_err());

        let a = ScriptedClient::new("openai", false);
        let b = ScriptedClient::new("groq", false);
        let result = ProviderChain::new(vec![
            slot(ProviderRole::Primary, "gpt", a),
            slot(ProviderRole::Primary, "llama", b),
        ]);
        assert!(result.is_err());
    }

    fn provider_settings() -> ModelProviderSettings {
        ModelProviderSettings {
            primary: ProviderSettings {
                kind: ProviderKind::OpenAI,
                model: "gpt-4o-mini".to_string(),
                api_key_env: None,
                base_url: None,
                timeout_secs: 30,
            },
            secondary: Some(ProviderSettings {
                kind: ProviderKind::Groq,
                model: "llama-3.1-8b-instant".to_string(),
                api_key_env: None,
                base_url: None,
                timeout_secs: 30,
            }),
        }
    }

    #[test]
    fn test_from_settings_without_keys_is_configuration_error() {
        let err = ProviderChain::from_settings(&provider_settings(), |_| None).unwrap_err();

        assert!(matches!(err, AppError::Config(_)));
        let message = err.to_string();
        assert!(message.contains("OPENAI_API_KEY"));
        assert!(message.contains("GROQ_API_KEY"));
    }

    #[test]
    fn test_from_settings_degrades_to_available_provider() {
        let lookup = |name: &str| (name == "GROQ_API_KEY").then(|| "gsk-test".to_string());
        let chain = ProviderChain::from_settings(&provider_settings(), lookup).unwrap();

        assert_eq!(chain.slots().len(), 1);
        assert_eq!(chain.slots()[0].role, ProviderRole::Secondary);
        assert_eq!(chain.slots()[0].model, "llama-3.1-8b-instant");
    }
}
