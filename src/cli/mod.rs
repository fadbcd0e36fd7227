//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for the plugin using clap.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// pii-ner - PII detection with token-classification NER models
#[derive(Parser, Debug)]
#[command(name = "pii-ner")]
#[command(version, about, long_about = None)]
#[command(author = "pii-ner Contributors")]
pub struct Cli {
    /// Configuration file(s), layered over the built-in defaults in order
    #[arg(short, long, global = true, env = "PII_NER_CONFIG", value_delimiter = ',')]
    pub config: Vec<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true, env = "PII_NER_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Also write JSON log files to this directory
    #[arg(long, global = true, env = "PII_NER_LOG_DIR")]
    pub log_dir: Option<String>,

    /// Debug mode (same as --log-level debug)
    #[arg(long, global = true)]
    pub debug: bool,

    /// Re-raise errors instead of exiting with status 1
    #[arg(long, global = true)]
    pub reraise: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Effective log level
    pub fn effective_log_level(&self) -> &str {
        if self.debug {
            "debug"
        } else {
            self.log_level.as_deref().unwrap_or("info")
        }
    }
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Detect PII in a string or a text file
    Detect(commands::detect::DetectArgs),

    /// Show information about the plugin, its models and entities
    Info(commands::info::InfoArgs),
}
