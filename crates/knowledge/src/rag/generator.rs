//! Answer generation over retrieved context.
//!
//! Renders the prompt from retrieved chunks (in retrieval order, each
//! delimited by its teaching number) and sends it through the provider chain.

use crate::rag::types::{Answer, SourceRef};
use crate::types::RetrievedChunk;
use sage_core::config::ChatbotSettings;
use sage_core::AppResult;
use sage_llm::{LlmRequest, ProviderChain};
use sage_prompt::{build_prompt, ContextEntry, PromptTemplate};

/// Generates answers from a question and its retrieved context.
#[derive(Debug, Clone)]
pub struct Generator {
    chain: ProviderChain,
    template: PromptTemplate,
    temperature: f32,
    max_tokens: u32,
}

impl Generator {
    /// Create a generator with sampling settings from the `chatbot` section.
    pub fn new(chain: ProviderChain, template: PromptTemplate, settings: &ChatbotSettings) -> Self {
        Self {
            chain,
            template,
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        }
    }

    /// The provider chain answers are generated through.
    pub fn chain(&self) -> &ProviderChain {
        &self.chain
    }

    /// Build the model request for `question` and `context`.
    fn build_request(&self, question: &str, context: &[RetrievedChunk]) -> AppResult<LlmRequest> {
        let entries: Vec<ContextEntry> = context
            .iter()
            .map(|chunk| ContextEntry {
                number: chunk.source_number,
                title: chunk.title.clone(),
                text: chunk.text.clone(),
            })
            .collect();

        let built = build_prompt(&self.template, question, &entries)?;

        // The chain substitutes each provider's configured model.
        let mut request = LlmRequest::new(built.user, "")
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens);
        if let Some(system) = built.system {
            request = request.with_system(system);
        }
        Ok(request)
    }

    /// Generate an answer, falling back across providers.
    ///
    /// # Errors
    /// - `AppError::Prompt` if the template cannot be rendered
    /// - `AppError::GenerationUnavailable` if every provider failed
    pub async fn generate(&self, question: &str, context: &[RetrievedChunk]) -> AppResult<Answer> {
        tracing::debug!(
            "Generating answer from {} passages (teachings: {:?})",
            context.len(),
            context.iter().map(|c| c.source_number).collect::<Vec<_>>()
        );

        let request = self.build_request(question, context)?;
        let result = self.chain.complete(&request).await?;

        tracing::info!(
            role = %result.role,
            provider = %result.provider,
            model = %result.response.model,
            total_tokens = result.response.usage.total_tokens,
            "Answer generated"
        );

        Ok(Answer {
            text: result.response.content,
            sources: context.iter().map(SourceRef::from).collect(),
            role: result.role,
            provider: result.provider,
            model: result.response.model,
        })
    }
}
