//! Prompt loader for YAML prompt files and chatbot settings.

use crate::builder::check_template;
use crate::types::{PromptTemplate, DEFAULT_SYSTEM_PROMPT};
use sage_core::config::ChatbotSettings;
use sage_core::{AppError, AppResult};
use std::path::Path;

/// Load a prompt template from a YAML file.
///
/// The file holds `template` and optionally `id` and `system`.
///
/// # Example
/// ```no_run
/// use sage_prompt::load_prompt_file;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompt = load_prompt_file(Path::new("prompts/teachings.yml"))?;
/// println!("Loaded prompt: {}", prompt.id);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt_file(path: &Path) -> AppResult<PromptTemplate> {
    tracing::debug!("Loading prompt from: {:?}", path);

    if !path.exists() {
        return Err(AppError::Prompt(format!("Prompt file not found: {:?}", path)));
    }

    let contents = std::fs::read_to_string(path)
        .map_err(|e| AppError::Prompt(format!("Failed to read prompt file {:?}: {}", path, e)))?;

    let template: PromptTemplate = serde_yaml::from_str(&contents)
        .map_err(|e| AppError::Prompt(format!("Failed to parse prompt YAML {:?}: {}", path, e)))?;

    validate_template(&template)?;

    tracing::info!("Loaded prompt: {}", template.id);

    Ok(template)
}

/// Resolve the prompt template described by the `chatbot` settings section.
///
/// Precedence: `prompt_file`, then inline `prompt_template`, then the built-in
/// template. `system_prompt` fills in the system message when the chosen
/// template does not carry one.
pub fn resolve_template(settings: &ChatbotSettings) -> AppResult<PromptTemplate> {
    let mut template = if let Some(path) = &settings.prompt_file {
        load_prompt_file(path)?
    } else if let Some(inline) = &settings.prompt_template {
        let template = PromptTemplate {
            id: "inline".to_string(),
            system: None,
            template: inline.clone(),
        };
        validate_template(&template)?;
        template
    } else {
        PromptTemplate {
            system: None,
            ..PromptTemplate::default()
        }
    };

    if template.system.is_none() {
        template.system = Some(
            settings
                .system_prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
        );
    }

    Ok(template)
}

/// Validate a prompt template.
fn validate_template(template: &PromptTemplate) -> AppResult<()> {
    if template.id.trim().is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if template.template.trim().is_empty() {
        return Err(AppError::Prompt("Prompt template cannot be empty".to_string()));
    }

    check_template(&template.template).map_err(|e| match e {
        AppError::Prompt(message) => {
            AppError::Prompt(format!("Prompt template '{}': {}", template.id, message))
        }
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DEFAULT_TEMPLATE;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const INLINE: &str = "{{#each sources}}[Teaching #{{number}}]\n{{text}}\n{{/each}}Q: {{question}}";

    fn chatbot() -> ChatbotSettings {
        ChatbotSettings {
            name: None,
            system_prompt: None,
            prompt_template: None,
            prompt_file: None,
            temperature: 0.3,
            max_tokens: 1000,
        }
    }

    fn write_prompt(dir: &Path, contents: &str) -> PathBuf {
        let path = dir.join("prompt.yml");
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_load_valid_prompt_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_prompt(
            temp_dir.path(),
            "id: teachings.brief\nsystem: Be brief.\ntemplate: \"{{#each sources}}#{{number}} {{text}} {{/each}}{{question}}\"\n",
        );

        let prompt = load_prompt_file(&path).unwrap();
        assert_eq!(prompt.id, "teachings.brief");
        assert_eq!(prompt.system.as_deref(), Some("Be brief."));
    }

    #[test]
    fn test_load_nonexistent_prompt() {
        let temp_dir = TempDir::new().unwrap();
        let result = load_prompt_file(&temp_dir.path().join("missing.yml"));
        assert!(matches!(result, Err(AppError::Prompt(_))));
    }

    #[test]
    fn test_load_invalid_yaml() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_prompt(temp_dir.path(), "invalid: yaml: content:");
        assert!(load_prompt_file(&path).is_err());
    }

    #[test]
    fn test_template_must_reference_question() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_prompt(temp_dir.path(), "template: \"static text\"\n");
        let err = load_prompt_file(&path).unwrap_err();
        assert!(err.to_string().contains("never references the question"));
    }

    #[test]
    fn test_inline_template_without_attributed_context_is_rejected() {
        let mut settings = chatbot();
        settings.prompt_template = Some("Q: {{question}}".to_string());

        let err = resolve_template(&settings).unwrap_err();
        assert!(matches!(err, AppError::Prompt(_)));
        assert!(err.to_string().contains("'inline'"));
        assert!(err.to_string().contains("teaching number"));
    }

    #[test]
    fn test_resolve_defaults() {
        let template = resolve_template(&chatbot()).unwrap();
        assert_eq!(template.template, DEFAULT_TEMPLATE);
        assert_eq!(template.system.as_deref(), Some(DEFAULT_SYSTEM_PROMPT));
    }

    #[test]
    fn test_resolve_inline_with_system_prompt() {
        let mut settings = chatbot();
        settings.prompt_template = Some(INLINE.to_string());
        settings.system_prompt = Some("You are a patient teacher.".to_string());

        let template = resolve_template(&settings).unwrap();
        assert_eq!(template.id, "inline");
        assert_eq!(template.template, INLINE);
        assert_eq!(template.system.as_deref(), Some("You are a patient teacher."));
    }

    #[test]
    fn test_prompt_file_takes_precedence() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_prompt(temp_dir.path(), "id: file\ntemplate: \"F {{#each sources}}#{{number}} {{text}} {{/each}}{{question}}\"\n");

        let mut settings = chatbot();
        settings.prompt_template = Some(INLINE.to_string());
        settings.system_prompt = Some("From settings".to_string());
        settings.prompt_file = Some(path);

        let template = resolve_template(&settings).unwrap();
        assert_eq!(template.id, "file");
        assert_eq!(template.system.as_deref(), Some("From settings"));
    }
}
