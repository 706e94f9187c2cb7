//! Prompt types for the Sage teachings assistant.
//!
//! This module defines the domain entities for the prompt system.

use serde::{Deserialize, Serialize};

/// User message template used when none is configured.
///
/// Each context passage is delimited by its teaching number and title, in
/// retrieval order, followed by the question.
pub const DEFAULT_TEMPLATE: &str = "Use the following teachings to answer the question.\n\n\
{{#each sources}}[Teaching #{{number}}: {{title}}]\n{{text}}\n\n{{/each}}\
Question: {{question}}\nAnswer:";

/// System message used when none is configured.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You answer questions using only the teachings provided. \
Cite teachings by number. If the teachings do not cover the question, say so.";

/// A prompt template loaded from YAML or assembled from settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptTemplate {
    /// Template identifier, used in logs
    #[serde(default = "default_template_id")]
    pub id: String,

    /// System message sent alongside the user message
    #[serde(default)]
    pub system: Option<String>,

    /// Handlebars template for the user message
    pub template: String,
}

fn default_template_id() -> String {
    "custom".to_string()
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            id: "default".to_string(),
            system: Some(DEFAULT_SYSTEM_PROMPT.to_string()),
            template: DEFAULT_TEMPLATE.to_string(),
        }
    }
}

/// One retrieved passage made available to the template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextEntry {
    /// Teaching number the passage came from
    pub number: u32,

    /// Teaching title
    pub title: String,

    /// Passage text
    pub text: String,
}

/// A fully built prompt ready for LLM execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPrompt {
    /// System message (optional)
    pub system: Option<String>,

    /// User message (required)
    pub user: String,

    /// Metadata about the built prompt
    pub metadata: BuiltPromptMetadata,
}

/// Metadata about a built prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPromptMetadata {
    /// Template the prompt was rendered from
    pub template_id: String,

    /// Teaching numbers of the context passages, in prompt order
    pub teachings: Vec<u32>,
}

impl BuiltPrompt {
    /// Create a new built prompt.
    pub fn new(
        system: Option<String>,
        user: String,
        template_id: String,
        teachings: Vec<u32>,
    ) -> Self {
        Self {
            system,
            user,
            metadata: BuiltPromptMetadata {
                template_id,
                teachings,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_deserialization() {
        let yaml = r#"
id: teachings.concise
system: Be brief.
template: "{{question}}"
"#;

        let template: PromptTemplate = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(template.id, "teachings.concise");
        assert_eq!(template.system.as_deref(), Some("Be brief."));
        assert_eq!(template.template, "{{question}}");
    }

    #[test]
    fn test_template_id_defaults() {
        let template: PromptTemplate = serde_yaml::from_str("template: x").unwrap();
        assert_eq!(template.id, "custom");
        assert!(template.system.is_none());
    }

    #[test]
    fn test_default_template_delimits_teachings() {
        let template = PromptTemplate::default();
        assert!(template.template.contains("[Teaching #{{number}}: {{title}}]"));
        assert!(template.template.contains("{{question}}"));
    }
}
