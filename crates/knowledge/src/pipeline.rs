//! Pipeline orchestration: build the index once, then answer questions.
//!
//! Startup runs in a fixed order (configuration, credentials, corpus,
//! chunking, embedding, index) and stops at the first failing stage. The
//! resulting `Pipeline` is immutable and can be shared across tasks.

use crate::chunker::{chunk_all, ChunkSettings};
use crate::embeddings::{create_provider, embed_texts, BatchOptions, EmbeddingProvider};
use crate::index::FlatL2Index;
use crate::loader::{load_teachings, LoaderOptions, RegexHeadingRule};
use crate::progress::ProgressReporter;
use crate::rag::{Answer, Generator};
use crate::retriever::Retriever;
use crate::types::{RetrievedChunk, TeachingRecord};
use chrono::{DateTime, Utc};
use sage_core::config::env_lookup;
use sage_core::{AppError, AppResult, Settings};
use sage_llm::ProviderChain;
use sage_prompt::{resolve_template, PromptTemplate};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// Startup stage, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StartupStage {
    Configuration,
    Credentials,
    Corpus,
    Chunking,
    Embedding,
    Index,
}

impl StartupStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::Credentials => "credentials",
            Self::Corpus => "corpus",
            Self::Chunking => "chunking",
            Self::Embedding => "embedding",
            Self::Index => "index",
        }
    }
}

impl fmt::Display for StartupStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Startup failure, tagged with the stage that failed.
#[derive(Debug, thiserror::Error)]
#[error("Startup failed at {stage} stage: {error}")]
pub struct StartupError {
    pub stage: StartupStage,
    #[source]
    pub error: AppError,
}

impl StartupError {
    fn at(stage: StartupStage) -> impl FnOnce(AppError) -> Self {
        move |error| Self { stage, error }
    }
}

/// Embedding and generation backends used by the pipeline.
#[derive(Debug, Clone)]
pub struct Backends {
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub chain: ProviderChain,
}

impl Backends {
    /// Create the configured backends, resolving keys through `lookup`.
    ///
    /// Fails with `AppError::Config` when no generation provider has a key,
    /// or when a remote embedding provider has none.
    pub fn from_settings<F>(settings: &Settings, lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let chain = ProviderChain::from_settings(&settings.model_provider, &lookup)?;
        let embedder = create_provider(&settings.embeddings, &lookup)?;
        Ok(Self { embedder, chain })
    }
}

/// Corpus and index statistics captured at startup.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineStats {
    /// Teachings loaded
    pub teachings: usize,

    /// Chunks indexed
    pub chunks: usize,

    /// Vector dimension
    pub dimension: usize,

    /// Embedding provider name
    pub embedding_provider: String,

    /// Embedding model
    pub embedding_model: String,

    /// Generation providers in fallback order, as `role: provider/model`
    pub generation_providers: Vec<String>,

    /// Wall-clock time spent building
    pub build_duration_secs: f64,

    /// When the build finished
    pub built_at: DateTime<Utc>,

    /// SHA-256 over teaching numbers, titles, and bodies
    pub corpus_fingerprint: String,
}

/// Settings-derived pieces checked before any backend is touched.
struct Prepared {
    chunking: ChunkSettings,
    heading_rule: RegexHeadingRule,
    loader: LoaderOptions,
    template: PromptTemplate,
}

fn prepare(settings: &Settings) -> AppResult<Prepared> {
    settings.validate()?;
    Ok(Prepared {
        chunking: ChunkSettings::from_settings(&settings.rag)?,
        heading_rule: RegexHeadingRule::from_settings(&settings.rag)?,
        loader: LoaderOptions::from(&settings.rag),
        template: resolve_template(&settings.chatbot)?,
    })
}

/// A ready question-answering pipeline.
#[derive(Debug)]
pub struct Pipeline {
    retriever: Retriever,
    generator: Generator,
    top_k: usize,
    stats: PipelineStats,
}

impl Pipeline {
    /// Build a pipeline with credentials from the process environment.
    pub async fn initialize(corpus_dir: &Path, settings: &Settings) -> Result<Self, StartupError> {
        Self::initialize_with_lookup(corpus_dir, settings, env_lookup, &ProgressReporter::noop())
            .await
    }

    /// Build a pipeline resolving credentials through `lookup`.
    pub async fn initialize_with_lookup<F>(
        corpus_dir: &Path,
        settings: &Settings,
        lookup: F,
        progress: &ProgressReporter,
    ) -> Result<Self, StartupError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let started = Instant::now();
        let prepared = prepare(settings).map_err(StartupError::at(StartupStage::Configuration))?;
        let backends = Backends::from_settings(settings, lookup)
            .map_err(StartupError::at(StartupStage::Credentials))?;

        Self::build(corpus_dir, settings, prepared, backends, progress, started).await
    }

    /// Build a pipeline with injected backends.
    pub async fn initialize_with(
        corpus_dir: &Path,
        settings: &Settings,
        backends: Backends,
        progress: &ProgressReporter,
    ) -> Result<Self, StartupError> {
        let started = Instant::now();
        let prepared = prepare(settings).map_err(StartupError::at(StartupStage::Configuration))?;

        Self::build(corpus_dir, settings, prepared, backends, progress, started).await
    }

    async fn build(
        corpus_dir: &Path,
        settings: &Settings,
        prepared: Prepared,
        backends: Backends,
        progress: &ProgressReporter,
        started: Instant,
    ) -> Result<Self, StartupError> {
        let Backends { embedder, chain } = backends;

        let records = load_teachings(corpus_dir, &prepared.heading_rule, &prepared.loader)
            .map_err(|e| StartupError {
                stage: StartupStage::Corpus,
                error: e.into(),
            })?;
        progress.load(records.len() as u64, &corpus_dir.display().to_string());

        let chunks = chunk_all(&records, &prepared.chunking);
        if chunks.is_empty() {
            return Err(StartupError {
                stage: StartupStage::Chunking,
                error: AppError::Config("Corpus produced no chunks".to_string()),
            });
        }
        progress.chunk(records.len() as u64, Some(records.len() as u64), chunks.len());
        tracing::info!(
            "Split {} teachings into {} chunks (size {}, overlap {})",
            records.len(),
            chunks.len(),
            prepared.chunking.size(),
            prepared.chunking.overlap()
        );

        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let batching = BatchOptions {
            batch_size: settings.embeddings.batch_size,
            concurrency: settings.embeddings.concurrency,
        };
        let vectors = embed_texts(embedder.as_ref(), &texts, batching, progress)
            .await
            .map_err(StartupError::at(StartupStage::Embedding))?;

        let dimension = settings.embeddings.dimension;
        let index = FlatL2Index::build(dimension, vectors.into_iter().zip(chunks))
            .map_err(|e| StartupError {
                stage: StartupStage::Index,
                error: e.into(),
            })?;
        let chunk_count = index.chunks().len();
        progress.index(chunk_count as u64, dimension);

        let stats = PipelineStats {
            teachings: records.len(),
            chunks: chunk_count,
            dimension,
            embedding_provider: embedder.provider_name().to_string(),
            embedding_model: embedder.model_name().to_string(),
            generation_providers: chain
                .slots()
                .iter()
                .map(|slot| format!("{}: {}/{}", slot.role, slot.client.provider_name(), slot.model))
                .collect(),
            build_duration_secs: started.elapsed().as_secs_f64(),
            built_at: Utc::now(),
            corpus_fingerprint: fingerprint(&records),
        };

        tracing::info!(
            teachings = stats.teachings,
            chunks = stats.chunks,
            dimension = stats.dimension,
            duration_secs = stats.build_duration_secs,
            "Pipeline ready"
        );

        Ok(Self {
            retriever: Retriever::new(embedder).with_index(Arc::new(index)),
            generator: Generator::new(chain, prepared.template, &settings.chatbot),
            top_k: settings.rag.top_k,
            stats,
        })
    }

    /// Answer `question` from the teachings.
    ///
    /// # Errors
    /// - `AppError::InvalidQuery` if the question is blank
    /// - `AppError::Embedding` if the question cannot be embedded
    /// - `AppError::GenerationUnavailable` if every provider failed
    pub async fn answer(&self, question: &str) -> AppResult<Answer> {
        let context = self.search(question).await?;
        self.generator.generate(question.trim(), &context).await
    }

    /// Retrieve the passages closest to `question` without generating.
    pub async fn search(&self, question: &str) -> AppResult<Vec<RetrievedChunk>> {
        self.retriever.retrieve(question, self.top_k).await
    }

    /// Statistics captured when the pipeline was built.
    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }
}

/// Stable hex digest of the loaded corpus.
fn fingerprint(records: &[TeachingRecord]) -> String {
    let mut sorted: Vec<&TeachingRecord> = records.iter().collect();
    sorted.sort_by_key(|record| record.number);

    let mut hasher = Sha256::new();
    for record in sorted {
        hasher.update(record.number.to_le_bytes());
        hasher.update(record.title.as_bytes());
        hasher.update([0u8]);
        hasher.update(record.body.as_bytes());
        hasher.update([0u8]);
    }
    format!("{:x}", hasher.finalize())
}
