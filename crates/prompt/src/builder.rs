//! Prompt builder for rendering templates and injecting retrieved context.

use crate::types::{BuiltPrompt, ContextEntry, PromptTemplate};
use handlebars::Handlebars;
use sage_core::{AppError, AppResult};
use serde::Serialize;

/// Values exposed to the template.
#[derive(Serialize)]
struct TemplateData<'a> {
    question: &'a str,
    sources: &'a [ContextEntry],
}

/// Build a prompt from a template, a question, and ordered context.
///
/// `context` is rendered in the order given; callers pass passages in
/// retrieval order so the closest passage comes first.
///
/// # Example
/// ```no_run
/// use sage_prompt::{build_prompt, ContextEntry, PromptTemplate};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let context = vec![ContextEntry {
///     number: 4,
///     title: "Patience".to_string(),
///     text: "Patience is...".to_string(),
/// }];
/// let built = build_prompt(&PromptTemplate::default(), "What is patience?", &context)?;
/// println!("{}", built.user);
/// # Ok(())
/// # }
/// ```
pub fn build_prompt(
    template: &PromptTemplate,
    question: &str,
    context: &[ContextEntry],
) -> AppResult<BuiltPrompt> {
    tracing::debug!(
        template = %template.id,
        passages = context.len(),
        "Building prompt"
    );

    let data = TemplateData {
        question,
        sources: context,
    };
    let user = render_template(&template.template, &data)?;
    let teachings = context.iter().map(|entry| entry.number).collect();

    Ok(BuiltPrompt::new(
        template.system.clone(),
        user,
        template.id.clone(),
        teachings,
    ))
}

/// Render a Handlebars template with `data`.
fn render_template<T: Serialize>(template: &str, data: &T) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Disable HTML escaping for plain text
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    handlebars
        .render("prompt", data)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))
}

/// Check that a template parses and renders every passage with attribution.
///
/// The template is rendered against two sample passages. The output must
/// contain the question, each passage's teaching number, and each passage's
/// text in the order given.
pub(crate) fn check_template(template: &str) -> AppResult<()> {
    let mut handlebars = Handlebars::new();
    handlebars
        .register_template_string("check", template)
        .map_err(|e| AppError::Prompt(format!("Invalid template: {}", e)))?;

    let sample_question = "sample question 5f2c";
    let sources = [
        ContextEntry {
            number: 90_417,
            title: "First".to_string(),
            text: "first passage 8d1e".to_string(),
        },
        ContextEntry {
            number: 90_533,
            title: "Second".to_string(),
            text: "second passage 3b7a".to_string(),
        },
    ];
    let rendered = render_template(
        template,
        &TemplateData {
            question: sample_question,
            sources: &sources,
        },
    )?;

    if !rendered.contains(sample_question) {
        return Err(AppError::Prompt(
            "Prompt template never references the question".to_string(),
        ));
    }

    let mut cursor = 0;
    for source in &sources {
        if !rendered.contains(&source.number.to_string()) {
            return Err(AppError::Prompt(
                "Prompt template must show each passage's teaching number".to_string(),
            ));
        }
        match rendered[cursor..].find(&source.text) {
            Some(offset) => cursor += offset + source.text.len(),
            None => {
                return Err(AppError::Prompt(
                    "Prompt template must render every passage in retrieval order".to_string(),
                ))
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(number: u32, title: &str, text: &str) -> ContextEntry {
        ContextEntry {
            number,
            title: title.to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn test_default_template_preserves_retrieval_order() {
        let context = vec![
            entry(7, "Silence", "Silence first."),
            entry(2, "Breath", "Breath second."),
            entry(7, "Silence", "Silence again."),
        ];

        let built = build_prompt(&PromptTemplate::default(), "Why silence?", &context).unwrap();

        let first = built.user.find("[Teaching #7: Silence]\nSilence first.").unwrap();
        let second = built.user.find("[Teaching #2: Breath]\nBreath second.").unwrap();
        let third = built.user.find("[Teaching #7: Silence]\nSilence again.").unwrap();
        assert!(first < second && second < third);
        assert!(built.user.contains("Question: Why silence?"));
        assert_eq!(built.metadata.teachings, vec![7, 2, 7]);
        assert_eq!(built.metadata.template_id, "default");
        assert!(built.system.is_some());
    }

    #[test]
    fn test_no_html_escaping() {
        let context = vec![entry(1, "Q&A", "a < b && \"quoted\"")];
        let built = build_prompt(&PromptTemplate::default(), "x > y?", &context).unwrap();

        assert!(built.user.contains("[Teaching #1: Q&A]"));
        assert!(built.user.contains("a < b && \"quoted\""));
        assert!(built.user.contains("x > y?"));
    }

    #[test]
    fn test_custom_template() {
        let template = PromptTemplate {
            id: "terse".to_string(),
            system: None,
            template: "{{#each sources}}{{number}};{{/each}}{{question}}".to_string(),
        };

        let built = build_prompt(&template, "q", &[entry(3, "t", "x"), entry(1, "t", "y")]).unwrap();
        assert_eq!(built.user, "3;1;q");
        assert!(built.system.is_none());
    }

    #[test]
    fn test_empty_context_still_renders_question() {
        let built = build_prompt(&PromptTemplate::default(), "Anything?", &[]).unwrap();
        assert!(built.user.contains("Question: Anything?"));
        assert!(!built.user.contains("[Teaching #"));
    }

    #[test]
    fn test_invalid_template_is_prompt_error() {
        let template = PromptTemplate {
            id: "broken".to_string(),
            system: None,
            template: "{{#each sources}}unclosed".to_string(),
        };

        let result = build_prompt(&template, "q", &[]);
        assert!(matches!(result, Err(AppError::Prompt(_))));
        assert!(check_template("{{#if question}}open").is_err());
    }

    #[test]
    fn test_check_accepts_attributed_templates() {
        assert!(check_template(crate::types::DEFAULT_TEMPLATE).is_ok());
        assert!(check_template("{{#each sources}}{{this.number}} {{text}}\n{{/each}}{{question}}").is_ok());
    }

    #[test]
    fn test_check_rejects_templates_that_drop_context() {
        let err = check_template("Q: {{question}}").unwrap_err();
        assert!(err.to_string().contains("teaching number"));

        let err = check_template("{{#each sources}}{{text}}{{/each}}{{question}}").unwrap_err();
        assert!(err.to_string().contains("teaching number"));

        let err = check_template("{{#each sources}}[#{{number}}]{{/each}}{{question}}").unwrap_err();
        assert!(err.to_string().contains("retrieval order"));

        let err = check_template("{{#each sources}}#{{number}} {{text}}{{/each}}").unwrap_err();
        assert!(err.to_string().contains("question"));
    }
}
