//! Configuration management for the Sage teachings assistant.
//!
//! Two layers are handled here:
//! - `AppConfig`: process-level options (config file path, corpus directory,
//!   logging) resolved from environment variables and command-line flags
//! - `Settings`: the structured `config.yaml` document with the required
//!   `model_provider`, `rag`, `embeddings`, `ui`, and `chatbot` sections
//!
//! Provider credentials are never stored in the YAML file. Each provider names
//! the environment variable holding its key (`api_key_env`).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Sections that must be present in every configuration document.
pub const REQUIRED_SECTIONS: [&str; 5] = ["model_provider", "rag", "embeddings", "ui", "chatbot"];

/// Process-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the YAML settings document
    pub config_file: PathBuf,

    /// Directory holding the teaching markdown files
    pub corpus_dir: PathBuf,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_file: PathBuf::from("config.yaml"),
            corpus_dir: PathBuf::from("Knowledge_Base"),
            log_level: None,
            verbose: false,
            no_color: false,
        }
    }
}

impl AppConfig {
    /// Load process configuration from environment variables and defaults.
    ///
    /// Environment variables:
    /// - `SAGE_CONFIG`: Path to the settings document
    /// - `SAGE_CORPUS`: Path to the teachings directory
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    pub fn load() -> Self {
        let mut config = Self::default();

        if let Ok(config_file) = std::env::var("SAGE_CONFIG") {
            config.config_file = PathBuf::from(config_file);
        }

        if let Ok(corpus_dir) = std::env::var("SAGE_CORPUS") {
            config.corpus_dir = PathBuf::from(corpus_dir);
        }

        config.log_level = std::env::var("RUST_LOG").ok();

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        config
    }

    /// Apply CLI overrides, giving precedence to flags over the environment.
    pub fn with_overrides(
        mut self,
        config_file: Option<PathBuf>,
        corpus_dir: Option<PathBuf>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(config_file) = config_file {
            self.config_file = config_file;
        }

        if let Some(corpus_dir) = corpus_dir {
            self.corpus_dir = corpus_dir;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Load and validate the settings document named by `config_file`.
    pub fn load_settings(&self) -> AppResult<Settings> {
        Settings::load(&self.config_file)
    }
}

/// The structured settings document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Ordered generation providers
    pub model_provider: ModelProviderSettings,

    /// Chunking and retrieval knobs
    pub rag: RagSettings,

    /// Embedding model and vector dimension
    pub embeddings: EmbeddingSettings,

    /// Presentation settings; validated present, otherwise opaque to the core
    pub ui: serde_yaml::Value,

    /// Answer generation settings
    pub chatbot: ChatbotSettings,

    /// Optional logging overrides
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl Settings {
    /// Read and parse a settings file.
    pub fn load(path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let settings = Self::from_yaml_str(&contents)
            .map_err(|e| AppError::Config(format!("{:?}: {}", path, strip_prefix(&e))))?;

        tracing::debug!("Loaded settings from {:?}", path);
        Ok(settings)
    }

    /// Parse settings from YAML text, checking section presence first.
    pub fn from_yaml_str(contents: &str) -> AppResult<Self> {
        let document: serde_yaml::Value = serde_yaml::from_str(contents)
            .map_err(|e| AppError::Config(format!("Failed to parse YAML: {}", e)))?;

        let mapping = document.as_mapping().ok_or_else(|| {
            AppError::Config("Configuration document must be a mapping".to_string())
        })?;

        let missing: Vec<&str> = REQUIRED_SECTIONS
            .iter()
            .copied()
            .filter(|section| !mapping.contains_key(*section))
            .collect();

        if !missing.is_empty() {
            return Err(AppError::Config(format!(
                "Missing configuration section(s): {}",
                missing.join(", ")
            )));
        }

        let settings: Settings = serde_yaml::from_value(document)
            .map_err(|e| AppError::Config(format!("Invalid configuration: {}", e)))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Check numeric and textual invariants that serde cannot express.
    pub fn validate(&self) -> AppResult<()> {
        let rag = &self.rag;
        if rag.chunk_size == 0 {
            return Err(AppError::Config("rag.chunk_size must be greater than zero".to_string()));
        }
        if rag.chunk_overlap >= rag.chunk_size {
            return Err(AppError::Config(format!(
                "rag.chunk_overlap ({}) must be smaller than rag.chunk_size ({})",
                rag.chunk_overlap, rag.chunk_size
            )));
        }
        if rag.top_k == 0 {
            return Err(AppError::Config("rag.top_k must be greater than zero".to_string()));
        }
        if rag.file_extension.trim().is_empty() {
            return Err(AppError::Config("rag.file_extension must not be empty".to_string()));
        }

        let embeddings = &self.embeddings;
        if embeddings.dimension == 0 {
            return Err(AppError::Config(
                "embeddings.dimension must be greater than zero".to_string(),
            ));
        }
        if embeddings.batch_size == 0 || embeddings.concurrency == 0 {
            return Err(AppError::Config(
                "embeddings.batch_size and embeddings.concurrency must be greater than zero"
                    .to_string(),
            ));
        }
        if embeddings.model.trim().is_empty() {
            return Err(AppError::Config("embeddings.model must not be empty".to_string()));
        }

        for (role, provider) in self.model_provider.slots() {
            if provider.model.trim().is_empty() {
                return Err(AppError::Config(format!(
                    "model_provider.{}.model must not be empty",
                    role
                )));
            }
        }

        Ok(())
    }
}

/// Strip the "Configuration error: " display prefix when re-wrapping.
fn strip_prefix(err: &AppError) -> String {
    match err {
        AppError::Config(message) => message.clone(),
        other => other.to_string(),
    }
}

/// Generation providers in fallback order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelProviderSettings {
    /// Tried first for every request
    pub primary: ProviderSettings,

    /// Tried once when the primary fails
    #[serde(default)]
    pub secondary: Option<ProviderSettings>,
}

impl ModelProviderSettings {
    /// Iterate configured slots in fallback order with their role names.
    pub fn slots(&self) -> impl Iterator<Item = (&'static str, &ProviderSettings)> + '_ {
        std::iter::once(("primary", &self.primary))
            .chain(self.secondary.as_ref().map(|s| ("secondary", s)))
    }
}

/// Supported hosted generation backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[serde(alias = "open_ai")]
    OpenAI,
    Groq,
}

impl ProviderKind {
    /// Canonical provider name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAI => "openai",
            Self::Groq => "groq",
        }
    }

    /// Environment variable conventionally holding this provider's key.
    pub fn default_api_key_env(&self) -> &'static str {
        match self {
            Self::OpenAI => "OPENAI_API_KEY",
            Self::Groq => "GROQ_API_KEY",
        }
    }
}

/// One generation provider slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Backend kind
    pub kind: ProviderKind,

    /// Model identifier (e.g., "gpt-4o-mini", "llama-3.1-8b-instant")
    pub model: String,

    /// Environment variable holding the API key
    #[serde(default)]
    pub api_key_env: Option<String>,

    /// Optional endpoint override
    #[serde(default)]
    pub base_url: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_provider_timeout")]
    pub timeout_secs: u64,
}

impl ProviderSettings {
    /// Name of the environment variable holding this provider's key.
    pub fn api_key_env(&self) -> &str {
        self.api_key_env
            .as_deref()
            .unwrap_or_else(|| self.kind.default_api_key_env())
    }
}

fn default_provider_timeout() -> u64 {
    60
}

/// Chunking and retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagSettings {
    /// Chunk length in grapheme clusters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Grapheme clusters shared by neighbouring chunks
    #[serde(default)]
    pub chunk_overlap: usize,

    /// Number of chunks retrieved per question
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Regex with `number` and `title` groups identifying a teaching heading
    #[serde(default)]
    pub heading_pattern: Option<String>,

    /// Extension of teaching files, without the dot
    #[serde(default = "default_file_extension")]
    pub file_extension: String,

    /// Descend into subdirectories of the corpus directory
    #[serde(default)]
    pub recursive: bool,
}

fn default_chunk_size() -> usize {
    1000
}

fn default_top_k() -> usize {
    3
}

fn default_file_extension() -> String {
    "md".to_string()
}

/// Embedding backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    /// OpenAI-compatible `/embeddings` endpoint
    #[serde(alias = "open_ai")]
    OpenAI,

    /// Local deterministic trigram-hash embedder
    Hashed,
}

impl EmbeddingProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAI => "openai",
            Self::Hashed => "hashed",
        }
    }
}

/// Embedding settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    /// Backend kind
    pub provider: EmbeddingProviderKind,

    /// Model identifier (e.g., "text-embedding-3-small")
    pub model: String,

    /// Vector dimension; every indexed vector must match it
    pub dimension: usize,

    /// Environment variable holding the API key (remote providers only)
    #[serde(default)]
    pub api_key_env: Option<String>,

    /// Optional endpoint override
    #[serde(default)]
    pub base_url: Option<String>,

    /// Texts per embedding request
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Embedding requests in flight during index build
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Attempts per request before giving up
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Request timeout in seconds
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
}

impl EmbeddingSettings {
    /// Name of the environment variable holding the embedding API key.
    pub fn api_key_env(&self) -> &str {
        self.api_key_env.as_deref().unwrap_or("OPENAI_API_KEY")
    }
}

fn default_batch_size() -> usize {
    64
}

fn default_concurrency() -> usize {
    4
}

fn default_max_retries() -> u32 {
    3
}

fn default_embedding_timeout() -> u64 {
    30
}

/// Answer generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatbotSettings {
    /// Display name of the assistant
    #[serde(default)]
    pub name: Option<String>,

    /// System prompt sent with every request
    #[serde(default)]
    pub system_prompt: Option<String>,

    /// Inline Handlebars template for the user message
    #[serde(default)]
    pub prompt_template: Option<String>,

    /// YAML prompt definition file (takes precedence over the inline template)
    #[serde(default)]
    pub prompt_file: Option<PathBuf>,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Completion token limit
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_tokens() -> u32 {
    1000
}

/// Optional logging section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Filter directive (e.g., "info", "sage_knowledge=debug")
    #[serde(default)]
    pub level: Option<String>,

    /// Output format
    #[serde(default)]
    pub format: LogFormat,

    /// Colored output
    #[serde(default)]
    pub color: Option<bool>,
}

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Resolve a credential through `lookup`, treating blank values as absent.
pub fn resolve_credential<F>(env_name: &str, lookup: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(env_name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Credential lookup backed by the process environment.
pub fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok()
}
