//! Relay configuration: BaseConfig (LINE + server + log + DB) + PipelineConfig (limits, search,
//! timeouts) + the LLM config from llm-client.

mod base;
mod pipeline;
mod relay_config;

#[cfg(test)]
mod tests;

pub use base::BaseConfig;
pub use pipeline::PipelineConfig;
pub use relay_config::RelayConfig;

pub(crate) use llm_client::env_parse;
