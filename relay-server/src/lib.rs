//! # LINE relay server
//!
//! Loads configuration from env, assembles store, search, generator and reply client into a
//! [`webhook::WebhookPipeline`], and serves it over HTTP (`POST /webhook`, `GET /health`).

pub mod cli;
pub mod components;
pub mod config;
pub mod runner;
pub mod server;

pub use cli::{load_config, sign_file, Cli, Commands};
pub use components::{
    build_pipeline, build_relay_components, build_search_augmenter, create_store,
    pipeline_settings, RelayComponents,
};
pub use config::{BaseConfig, PipelineConfig, RelayConfig};
pub use runner::run_relay;
pub use server::{build_router, serve, shutdown_signal};
