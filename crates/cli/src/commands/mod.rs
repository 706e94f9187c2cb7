//! Command handlers for the Sage CLI.
//!
//! This module organizes all CLI commands into separate submodules.

pub mod ask;
pub mod chat;
pub mod search;
pub mod stats;
pub mod verify;

// Re-export command types for convenience
pub use ask::AskCommand;
pub use chat::ChatCommand;
pub use search::SearchCommand;
pub use stats::StatsCommand;
pub use verify::VerifyCommand;

use anyhow::Context;
use sage_core::config::{env_lookup, AppConfig};
use sage_core::Settings;
use sage_knowledge::{Answer, Pipeline, ProgressEvent, ProgressReporter};
use std::sync::Arc;

/// Build the pipeline for the configured corpus.
///
/// Prints a notice first, since embedding a large corpus takes a while, then
/// one line per startup phase on stderr.
pub async fn build_pipeline(config: &AppConfig, settings: &Settings) -> anyhow::Result<Pipeline> {
    eprintln!(
        "Building the teachings index from {}. The first build can take 30-60 seconds...",
        config.corpus_dir.display()
    );

    let progress = ProgressReporter::new(Arc::new(|event: ProgressEvent| {
        eprintln!("{}", event.format_simple())
    }));

    Pipeline::initialize_with_lookup(&config.corpus_dir, settings, env_lookup, &progress)
        .await
        .with_context(|| format!("Could not start with corpus {:?}", config.corpus_dir))
}

/// Print an answer and its sources to stdout.
pub fn print_answer(answer: &Answer) {
    println!("{}", answer.text.trim());
    println!();

    if answer.sources.is_empty() {
        println!("Sources: (no sources available)");
    } else {
        println!("Sources:");
        for source in &answer.sources {
            println!(
                "- Teaching #{}: {} (distance {:.3})",
                source.number, source.title, source.distance
            );
        }
    }
}
