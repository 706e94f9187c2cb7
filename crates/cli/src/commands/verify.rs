//! Verify command handler.
//!
//! Runs the setup checks without building the full index: configuration,
//! credentials, the teachings directory, a loader smoke test, and an
//! in-memory index smoke test. Exits non-zero when any check fails.

use clap::Args;
use sage_core::config::{
    env_lookup, resolve_credential, AppConfig, EmbeddingProviderKind, REQUIRED_SECTIONS,
};
use sage_core::{AppError, Settings};
use sage_knowledge::loader::discover_files;
use sage_knowledge::{
    load_teachings, Chunk, FlatL2Index, LoaderOptions, RegexHeadingRule, VectorIndex,
};
use std::path::Path;

/// Dimension of the index smoke test vectors.
const SMOKE_DIMENSION: usize = 10;

/// Vectors in the index smoke test.
const SMOKE_VECTORS: usize = 5;

/// Check configuration, credentials, and the teachings directory
#[derive(Args, Debug)]
pub struct VerifyCommand {}

/// Detail lines of a passing check, or the reason it failed.
type CheckResult = Result<Vec<String>, String>;

impl VerifyCommand {
    pub fn execute(
        &self,
        config: &AppConfig,
        settings: Result<&Settings, &AppError>,
    ) -> anyhow::Result<()> {
        tracing::info!("Executing verify command");

        let settings_ok = settings.ok();
        let loader = settings_ok
            .map(|s| LoaderOptions::from(&s.rag))
            .unwrap_or_default();

        let checks: Vec<(&str, CheckResult)> = vec![
            ("Configuration", check_configuration(&config.config_file, settings)),
            ("Credentials", check_credentials(settings_ok, env_lookup)),
            ("Knowledge base", check_knowledge_base(&config.corpus_dir, &loader)),
            ("Document loader", check_loader(&config.corpus_dir, settings_ok, &loader)),
            ("Vector index", check_index()),
        ];

        let mut failed = 0;
        for (name, result) in &checks {
            match result {
                Ok(details) => {
                    println!("[ok]   {}", name);
                    for line in details {
                        println!("       {}", line);
                    }
                }
                Err(reason) => {
                    failed += 1;
                    tracing::warn!("Check '{}' failed: {}", name, reason);
                    println!("[FAIL] {}", name);
                    println!("       {}", reason);
                }
            }
        }

        println!();
        if failed > 0 {
            anyhow::bail!("{} of {} checks failed", failed, checks.len());
        }

        println!("All {} checks passed.", checks.len());
        println!("Note: the first start builds the index in memory and can take 30-60 seconds.");
        Ok(())
    }
}

fn check_configuration(path: &Path, settings: Result<&Settings, &AppError>) -> CheckResult {
    match settings {
        Ok(_) => Ok(vec![format!(
            "{} is valid ({})",
            path.display(),
            REQUIRED_SECTIONS.join(", ")
        )]),
        Err(e) => Err(e.to_string()),
    }
}

/// Report each provider key. Missing keys are warnings unless none is set.
fn check_credentials<F>(settings: Option<&Settings>, lookup: F) -> CheckResult
where
    F: Fn(&str) -> Option<String>,
{
    let providers: Vec<(String, String)> = match settings {
        Some(settings) => settings
            .model_provider
            .slots()
            .map(|(role, provider)| {
                (
                    format!("{} ({})", role, provider.kind.as_str()),
                    provider.api_key_env().to_string(),
                )
            })
            .collect(),
        None => vec![
            ("openai".to_string(), "OPENAI_API_KEY".to_string()),
            ("groq".to_string(), "GROQ_API_KEY".to_string()),
        ],
    };

    let mut details = Vec::new();
    let mut found = 0;
    for (label, env_name) in &providers {
        if resolve_credential(env_name, &lookup).is_some() {
            found += 1;
            details.push(format!("{}: {} found", label, env_name));
        } else {
            details.push(format!("warning: {}: {} not set", label, env_name));
        }
    }

    if found == 0 {
        let names: Vec<&str> = providers.iter().map(|(_, env)| env.as_str()).collect();
        return Err(format!("No API keys found (checked: {})", names.join(", ")));
    }

    if let Some(embeddings) = settings.map(|s| &s.embeddings) {
        if embeddings.provider == EmbeddingProviderKind::OpenAI {
            let env_name = embeddings.api_key_env();
            if resolve_credential(env_name, &lookup).is_none() {
                return Err(format!("Embedding provider requires {} to be set", env_name));
            }
            details.push(format!("embeddings: {} found", env_name));
        }
    }

    Ok(details)
}

fn check_knowledge_base(dir: &Path, options: &LoaderOptions) -> CheckResult {
    let files = discover_files(dir, options).map_err(|e| e.to_string())?;
    if files.is_empty() {
        return Err(format!(
            "No .{} files found in {}",
            options.extension,
            dir.display()
        ));
    }

    let mut details = vec![format!("Found {} .{} files:", files.len(), options.extension)];
    details.extend(files.iter().map(|path| {
        let name = path.strip_prefix(dir).unwrap_or(path);
        format!("  - {}", name.display())
    }));
    Ok(details)
}

fn check_loader(dir: &Path, settings: Option<&Settings>, options: &LoaderOptions) -> CheckResult {
    let rule = match settings {
        Some(settings) => RegexHeadingRule::from_settings(&settings.rag),
        None => RegexHeadingRule::standard(),
    }
    .map_err(|e| e.to_string())?;

    let teachings = load_teachings(dir, &rule, options).map_err(|e| e.to_string())?;
    let first = teachings
        .first()
        .ok_or_else(|| "No teachings loaded".to_string())?;

    Ok(vec![
        format!("Loaded {} teachings", teachings.len()),
        format!("First teaching: #{} - {}", first.number, first.title),
    ])
}

/// Build a small index from pseudo-random vectors and search it.
fn check_index() -> CheckResult {
    let mut state = 0x2545_f491_4f6c_dd1d_u64;
    let mut next = move || {
        // xorshift64*
        state ^= state >> 12;
        state ^= state << 25;
        state ^= state >> 27;
        (state.wrapping_mul(0x2545_f491_4f6c_dd1d) >> 40) as f32 / (1u64 << 24) as f32
    };

    let pairs: Vec<(Vec<f32>, Chunk)> = (0..SMOKE_VECTORS)
        .map(|i| {
            let vector: Vec<f32> = (0..SMOKE_DIMENSION).map(|_| next()).collect();
            let chunk = Chunk {
                source_number: i as u32 + 1,
                title: format!("probe {}", i + 1),
                sequence: 0,
                text: String::new(),
                byte_range: 0..0,
            };
            (vector, chunk)
        })
        .collect();
    let query: Vec<f32> = (0..SMOKE_DIMENSION).map(|_| next()).collect();

    let index = FlatL2Index::build(SMOKE_DIMENSION, pairs).map_err(|e| e.to_string())?;
    let results = index.search(&query, 2).map_err(|e| e.to_string())?;

    if results.len() != 2 || results[0].1 > results[1].1 {
        return Err(format!(
            "Unexpected search result: {} hits",
            results.len()
        ));
    }

    Ok(vec![format!(
        "Created index with {} vectors of dimension {}",
        index.len(),
        index.dimension()
    )])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const SETTINGS: &str = r#"
model_provider:
  primary:
    kind: openai
    model: gpt-4o-mini
  secondary:
    kind: groq
    model: llama-3.1-8b-instant
rag: {}
embeddings:
  provider: hashed
  model: trigram-hash
  dimension: 64
ui: {}
chatbot: {}
"#;

    fn settings() -> Settings {
        Settings::from_yaml_str(SETTINGS).unwrap()
    }

    fn corpus() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.md"), "# Teaching #2: Stillness\n\nBe still.\n").unwrap();
        fs::write(dir.path().join("a.md"), "# Teaching #1: Breath\n\nBreathe.\n").unwrap();
        dir
    }

    #[test]
    fn test_index_check_passes() {
        let details = check_index().unwrap();
        assert!(details[0].contains("5 vectors of dimension 10"));
    }

    #[test]
    fn test_credentials_warn_on_partial_keys() {
        let settings = settings();
        let details = check_credentials(Some(&settings), |name| {
            (name == "GROQ_API_KEY").then(|| "gsk-test".to_string())
        })
        .unwrap();

        assert!(details.iter().any(|l| l.starts_with("warning:") && l.contains("OPENAI_API_KEY")));
        assert!(details.iter().any(|l| l.contains("GROQ_API_KEY found")));
    }

    #[test]
    fn test_credentials_fail_without_keys() {
        let err = check_credentials(None, |_| None).unwrap_err();
        assert!(err.contains("OPENAI_API_KEY"));
        assert!(err.contains("GROQ_API_KEY"));
    }

    #[test]
    fn test_knowledge_base_lists_files() {
        let dir = corpus();
        let details = check_knowledge_base(dir.path(), &LoaderOptions::default()).unwrap();

        assert_eq!(details[0], "Found 2 .md files:");
        assert_eq!(details[1], "  - a.md");
    }

    #[test]
    fn test_knowledge_base_missing_directory() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("absent");
        assert!(check_knowledge_base(&missing, &LoaderOptions::default()).is_err());
    }

    #[test]
    fn test_loader_reports_first_teaching() {
        let dir = corpus();
        let settings = settings();
        let details = check_loader(dir.path(), Some(&settings), &LoaderOptions::default()).unwrap();

        assert_eq!(details[0], "Loaded 2 teachings");
        assert_eq!(details[1], "First teaching: #1 - Breath");
    }
}
