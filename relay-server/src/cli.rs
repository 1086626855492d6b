//! CLI parser and config loading.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use webhook::compute_signature;

use crate::config::RelayConfig;

#[derive(Parser)]
#[command(name = "line-relay")]
#[command(about = "LINE chat relay", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the webhook server (config from env; --bind overrides BIND_ADDR).
    Run {
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Print the x-line-signature value for a request body file.
    Sign {
        #[arg(long)]
        body_file: PathBuf,
        /// Channel secret; defaults to LINE_CHANNEL_SECRET.
        #[arg(long)]
        secret: Option<String>,
    },
}

/// Load RelayConfig from environment. If `bind` is provided it overrides BIND_ADDR.
pub fn load_config(bind: Option<String>) -> Result<RelayConfig> {
    RelayConfig::load(bind)
}

/// Signature of the exact bytes of `path` under `secret`.
pub fn sign_file(path: &Path, secret: &str) -> Result<String> {
    let body = std::fs::read(path)
        .with_context(|| format!("Failed to read body file {}", path.display()))?;
    compute_signature(&body, secret).context("Channel secret is empty")
}
