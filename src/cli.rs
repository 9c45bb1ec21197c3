//! Command-line interface and env file loading.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;

use crate::report;

/// Autonomous task loop: executes, creates and reprioritizes tasks toward
/// an objective, keeping results in vector memory.
///
/// Everything else is configured through environment variables, read from
/// `.env` and any files passed with `--env`.
#[derive(Parser, Debug)]
#[command(name = "taskloop")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Extra env files, applied in order after `.env`; later files win
    #[arg(short = 'e', long = "env", value_name = "PATH", num_args = 1..)]
    pub env: Vec<PathBuf>,
}

impl Cli {
    /// Load `.env` from the working directory, then every `--env` overlay.
    pub fn load_env(&self) -> anyhow::Result<()> {
        load_default_env()?;
        load_overlays(&self.env)
    }
}

/// Load `.env` if there is one. Variables already set in the process win.
pub fn load_default_env() -> anyhow::Result<Option<PathBuf>> {
    match dotenvy::dotenv() {
        Ok(path) => {
            tracing::debug!("Loaded {}", path.display());
            Ok(Some(path))
        }
        Err(e) if e.not_found() => Ok(None),
        Err(e) => Err(e).context("Failed to load .env"),
    }
}

/// Apply each file on top of the current environment, overriding existing
/// values. A missing file is an error.
pub fn load_overlays(paths: &[PathBuf]) -> anyhow::Result<()> {
    for path in paths {
        load_overlay(path)?;
        report::env_file(path);
    }
    Ok(())
}

fn load_overlay(path: &Path) -> anyhow::Result<()> {
    dotenvy::from_path_override(path)
        .with_context(|| format!("Failed to load env file {}", path.display()))
}
