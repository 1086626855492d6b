//! `line-relay` binary: run the webhook server, or sign a body for manual testing.

use anyhow::{Context, Result};
use clap::Parser;
use relay_server::{load_config, run_relay, sign_file, Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { bind } => {
            let config = load_config(bind)?;
            run_relay(config).await
        }
        Commands::Sign { body_file, secret } => {
            let secret = secret
                .or_else(|| std::env::var("LINE_CHANNEL_SECRET").ok())
                .filter(|s| !s.is_empty())
                .context("LINE_CHANNEL_SECRET not set (or pass --secret)")?;
            println!("{}", sign_file(&body_file, &secret)?);
            Ok(())
        }
    }
}
