//! CLI argument definitions for kfix.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "kfix",
    version,
    about = "Integration-test fixtures for Kotlin-DSL build scripts",
    long_about = "kfix provisions throwaway projects, runs them against a local build tool \
                  installation with an isolated daemon pool, and checks the outcome."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run scenario files against the configured installation
    Run {
        /// Scenario files (TOML)
        #[arg(required = true)]
        scenarios: Vec<PathBuf>,
        /// Pass the CI diagnostic arguments even when `CI` is not set
        #[arg(long)]
        ci: bool,
    },

    /// Merge KEY=VALUE pairs into a properties file, keeping existing keys
    MergeProperties {
        /// Properties file to update (created if missing)
        file: PathBuf,
        /// Entries to merge
        #[arg(value_name = "KEY=VALUE", required = true)]
        pairs: Vec<String>,
    },

    /// Show the installation and daemon registry builds will use
    Installation,

    /// Print the effective harness configuration
    Config,
}

pub fn parse() -> Cli {
    Cli::parse()
}
