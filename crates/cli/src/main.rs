mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use novelmeta_core::config::{load_dotenv, Config};
use novelmeta_llm::create_estimator;

use crate::cli::{CliArgs, Command};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    load_dotenv();
    let args = CliArgs::parse();

    let config = match args.profile.as_deref() {
        Some(profile) => Config::for_profile(profile),
        None => Config::from_env(),
    };
    config.log_summary();

    let kind = args
        .estimator
        .clone()
        .unwrap_or_else(|| config.chunking.token_estimator.clone());
    let estimator = create_estimator(&kind, &config.llm, &config.chunking);

    match args.command {
        Command::Chunk { path, max_tokens, overlap_words } => {
            commands::chunk(&config, estimator, &path, max_tokens, overlap_words).await
        }
        Command::Sample { path, segment_tokens, total_tokens, print_text } => {
            commands::sample(&config, estimator, &path, segment_tokens, total_tokens, print_text)
                .await
        }
        Command::Metadata { path, output } => {
            commands::metadata(&config, estimator, &path, output.as_deref()).await
        }
        Command::Ingest { path, output_dir, novel_id } => {
            commands::ingest(&config, estimator, &path, output_dir, novel_id).await
        }
    }?;

    info!("done");
    Ok(())
}
