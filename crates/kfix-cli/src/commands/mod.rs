//! Command dispatch and handler modules.

mod config;
mod installation;
mod properties;
mod run;

use std::path::PathBuf;

use miette::Result;

use kfix_core::config::HarnessConfig;
use kfix_util::errors::FixtureError;

use crate::cli::{Cli, Command};

/// Route a parsed CLI invocation to the appropriate command handler.
pub fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run { scenarios, ci } => run::exec(&scenarios, ci, cli.verbose),
        Command::MergeProperties { file, pairs } => properties::exec(&file, &pairs),
        Command::Installation => installation::exec(),
        Command::Config => config::exec(),
    }
}

fn current_dir() -> Result<PathBuf> {
    Ok(std::env::current_dir().map_err(FixtureError::Io)?)
}

/// Harness configuration for the current directory.
fn load_config() -> Result<HarnessConfig> {
    HarnessConfig::load_from(&current_dir()?)
}
