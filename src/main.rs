// pii-ner - NER-model PII detection plugin
// Copyright (c) 2025 pii-ner Contributors
// Licensed under the MIT License

use pii_ner::cli::{Cli, Commands};
use pii_ner::config::LoggingConfig;
use pii_ner::logging::init_logging;
use clap::Parser;
use std::process;

#[tokio::main]
async fn main() {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let logging_config = cli
        .log_dir
        .as_deref()
        .map_or_else(LoggingConfig::console, LoggingConfig::with_file);
    let guard = match init_logging(cli.effective_log_level(), &logging_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(1);
        }
    };

    tracing::debug!(version = pii_ner::VERSION, "pii-ner - NER-model PII detection");

    let exit_code = match execute_command(&cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Command execution failed");
            if cli.reraise {
                panic!("{e:?}");
            }
            eprintln!("Error: {e:#}");
            1
        }
    };

    // Flush file logs before exiting
    drop(guard);
    process::exit(exit_code);
}

/// Execute the CLI command
async fn execute_command(cli: &Cli) -> anyhow::Result<i32> {
    match &cli.command {
        Commands::Detect(args) => args.execute(&cli.config).await,
        Commands::Info(args) => args.execute(&cli.config).await,
    }
}
