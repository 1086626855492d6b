//! Base config: LINE channel, HTTP bind address, logging, database. Loaded from env.

use anyhow::{Context, Result};
use std::env;
use std::net::SocketAddr;

use super::env_parse;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_DATABASE_URL: &str = "sqlite://./data/line-relay.db";
pub const DEFAULT_LOG_FILE: &str = "logs/line-relay.log";

/// Base config: LINE-related, server, logging, database only.
#[derive(Debug, Clone)]
pub struct BaseConfig {
    /// LINE_CHANNEL_ACCESS_TOKEN
    pub channel_access_token: String,
    /// LINE_CHANNEL_SECRET
    pub channel_secret: Option<String>,
    /// LINE_API_URL
    pub line_api_url: String,
    /// SKIP_SIGNATURE_VALIDATION; test/diagnostic only
    pub skip_signature_validation: bool,
    pub bind_addr: String,
    pub log_file: String,
    /// `sqlite` or `memory`
    pub store_type: String,
    pub database_url: String,
}

impl BaseConfig {
    /// Load from environment variables. `bind` overrides BIND_ADDR if provided.
    pub fn load(bind: Option<String>) -> Result<Self> {
        let channel_access_token = env::var("LINE_CHANNEL_ACCESS_TOKEN")
            .context("LINE_CHANNEL_ACCESS_TOKEN not set")?;
        let channel_secret = env::var("LINE_CHANNEL_SECRET")
            .ok()
            .filter(|s| !s.trim().is_empty());
        let line_api_url = env::var("LINE_API_URL")
            .unwrap_or_else(|_| relay_core::reply::LINE_API_BASE.to_string());
        let skip_signature_validation = env_parse("SKIP_SIGNATURE_VALIDATION", false)?;
        let bind_addr = bind
            .or_else(|| env::var("BIND_ADDR").ok())
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let log_file = env::var("LOG_FILE").unwrap_or_else(|_| DEFAULT_LOG_FILE.to_string());
        let store_type = env::var("STORE_TYPE")
            .unwrap_or_else(|_| "sqlite".to_string())
            .to_lowercase();
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());

        Ok(Self {
            channel_access_token,
            channel_secret,
            line_api_url,
            skip_signature_validation,
            bind_addr,
            log_file,
            store_type,
            database_url,
        })
    }

    /// Validate config: credentials present, URLs and address parse, known store type.
    pub fn validate(&self) -> Result<()> {
        if self.channel_access_token.trim().is_empty() {
            anyhow::bail!("LINE_CHANNEL_ACCESS_TOKEN is empty");
        }
        if self.channel_secret.is_none() && !self.skip_signature_validation {
            anyhow::bail!(
                "LINE_CHANNEL_SECRET not set (required unless SKIP_SIGNATURE_VALIDATION=true)"
            );
        }
        if reqwest::Url::parse(&self.line_api_url).is_err() {
            anyhow::bail!("LINE_API_URL is not a valid URL: {}", self.line_api_url);
        }
        if self.bind_addr.parse::<SocketAddr>().is_err() {
            anyhow::bail!("BIND_ADDR is not a valid socket address: {}", self.bind_addr);
        }
        if !matches!(self.store_type.as_str(), "sqlite" | "memory") {
            anyhow::bail!(
                "STORE_TYPE must be 'sqlite' or 'memory', got '{}'",
                self.store_type
            );
        }
        Ok(())
    }
}
