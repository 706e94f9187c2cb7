//! Search command handler.
//!
//! Retrieval only: prints the ranked passages for a question.

use super::build_pipeline;
use anyhow::Context;
use clap::Args;
use sage_core::config::AppConfig;
use sage_core::Settings;
use sage_knowledge::rag::types::truncate_snippet;

/// Show the passages closest to a question
#[derive(Args, Debug)]
pub struct SearchCommand {
    /// Query text
    #[arg(required = true)]
    pub query: Vec<String>,

    /// Print whole passages instead of snippets
    #[arg(long)]
    pub full: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl SearchCommand {
    pub async fn execute(&self, config: &AppConfig, settings: &Settings) -> anyhow::Result<()> {
        tracing::info!("Executing search command");

        let query = self.query.join(" ");
        let pipeline = build_pipeline(config, settings).await?;

        let results = pipeline.search(&query).await.context("Search failed")?;

        if self.json {
            let json = serde_json::to_string_pretty(&results)
                .context("Failed to serialize results")?;
            println!("{}", json);
            return Ok(());
        }

        if results.is_empty() {
            println!("No passages found");
            return Ok(());
        }

        for (rank, result) in results.iter().enumerate() {
            println!(
                "{}. Teaching #{}: {} [part {}] (distance {:.3})",
                rank + 1,
                result.source_number,
                result.title,
                result.sequence + 1,
                result.distance
            );
            let text = if self.full {
                result.text.trim().to_string()
            } else {
                truncate_snippet(&result.text, 200)
            };
            println!("   {}", text.replace('\n', "\n   "));
            println!();
        }

        Ok(())
    }
}
