//! Chat command handler.
//!
//! Reads questions line by line from stdin and answers each one. Errors on a
//! single question are reported and the loop continues; fatal errors end it.

use super::{build_pipeline, print_answer};
use anyhow::Context;
use clap::Args;
use sage_core::config::AppConfig;
use sage_core::Settings;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Answer questions read line by line from stdin
#[derive(Args, Debug)]
pub struct ChatCommand {
    /// Do not print the input prompt
    #[arg(long)]
    pub quiet: bool,
}

/// One line of chat input.
#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Blank,
    Quit,
    Question(&'a str),
}

fn parse_line(line: &str) -> Input<'_> {
    let line = line.trim();
    match line.to_ascii_lowercase().as_str() {
        "" => Input::Blank,
        "exit" | "quit" | ":q" => Input::Quit,
        _ => Input::Question(line),
    }
}

impl ChatCommand {
    pub async fn execute(&self, config: &AppConfig, settings: &Settings) -> anyhow::Result<()> {
        tracing::info!("Executing chat command");

        let pipeline = build_pipeline(config, settings).await?;
        let name = settings.chatbot.name.as_deref().unwrap_or("Sage");

        eprintln!(
            "{} is ready ({} teachings). Type a question, or 'exit' to quit.",
            name,
            pipeline.stats().teachings
        );

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut answered = 0usize;

        loop {
            if !self.quiet {
                eprint!("> ");
                std::io::stderr().flush().ok();
            }

            let Some(line) = lines.next_line().await.context("Failed to read stdin")? else {
                break;
            };

            let question = match parse_line(&line) {
                Input::Blank => continue,
                Input::Quit => break,
                Input::Question(question) => question,
            };

            match pipeline.answer(question).await {
                Ok(answer) => {
                    answered += 1;
                    print_answer(&answer);
                    println!();
                }
                Err(e) if e.is_fatal() => {
                    return Err(e).context("Chat stopped");
                }
                Err(e) => {
                    tracing::warn!("Question failed: {}", e);
                    eprintln!("Error: {}", e);
                }
            }
        }

        tracing::info!("Chat ended after {} answers", answered);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line() {
        assert_eq!(parse_line("   "), Input::Blank);
        assert_eq!(parse_line("EXIT"), Input::Quit);
        assert_eq!(parse_line(" quit \n"), Input::Quit);
        assert_eq!(
            parse_line("  What is silence?  "),
            Input::Question("What is silence?")
        );
    }
}
