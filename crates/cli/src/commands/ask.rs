//! Ask command handler.
//!
//! Builds the pipeline, answers one question, and prints the answer with its
//! sources.

use super::{build_pipeline, print_answer};
use anyhow::Context;
use clap::Args;
use sage_core::config::AppConfig;
use sage_core::Settings;

/// Answer a single question
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    #[arg(required = true)]
    pub question: Vec<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    /// Execute the ask command.
    pub async fn execute(&self, config: &AppConfig, settings: &Settings) -> anyhow::Result<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        let question = self.question.join(" ");
        let pipeline = build_pipeline(config, settings).await?;

        let answer = pipeline
            .answer(&question)
            .await
            .context("Failed to answer question")?;

        tracing::debug!(
            "Answered by {} ({}/{}), teachings {:?}",
            answer.role,
            answer.provider,
            answer.model,
            answer.teachings()
        );

        if self.json {
            let json = serde_json::to_string_pretty(&answer)
                .context("Failed to serialize answer")?;
            println!("{}", json);
        } else {
            print_answer(&answer);
        }

        Ok(())
    }
}
