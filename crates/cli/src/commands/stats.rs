//! Stats command handler.
//!
//! Builds the pipeline and reports what was indexed.

use super::build_pipeline;
use anyhow::Context;
use clap::Args;
use sage_core::config::AppConfig;
use sage_core::Settings;

/// Build the index and show corpus statistics
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub async fn execute(&self, config: &AppConfig, settings: &Settings) -> anyhow::Result<()> {
        tracing::info!("Executing stats command");

        let pipeline = build_pipeline(config, settings).await?;
        let stats = pipeline.stats();

        if self.json {
            let json = serde_json::to_string_pretty(stats).context("Failed to serialize stats")?;
            println!("{}", json);
        } else {
            println!("Corpus: {}", config.corpus_dir.display());
            println!("  Teachings: {}", stats.teachings);
            println!("  Chunks: {}", stats.chunks);
            println!("  Dimension: {}", stats.dimension);
            println!(
                "  Embeddings: {} ({})",
                stats.embedding_provider, stats.embedding_model
            );
            for provider in &stats.generation_providers {
                println!("  Generation: {}", provider);
            }
            println!("  Build time: {:.2}s", stats.build_duration_secs);
            println!("  Built at: {}", stats.built_at.to_rfc3339());
            println!("  Fingerprint: {}", stats.corpus_fingerprint);
        }

        Ok(())
    }
}
