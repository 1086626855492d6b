//! RelayConfig: BaseConfig + PipelineConfig + EnvLlmConfig. Use load() for env-based loading.

use anyhow::Result;
use llm_client::EnvLlmConfig;

use super::{BaseConfig, PipelineConfig};

pub struct RelayConfig {
    pub base: BaseConfig,
    pub pipeline: PipelineConfig,
    pub llm: EnvLlmConfig,
}

impl RelayConfig {
    /// Load full config from environment variables. If `bind` is provided it overrides BIND_ADDR.
    /// Call validate() after load to check config before init.
    pub fn load(bind: Option<String>) -> Result<Self> {
        let base = BaseConfig::load(bind)?;
        let pipeline = PipelineConfig::from_env()?;
        let llm = EnvLlmConfig::from_env()?;
        Ok(Self {
            base,
            pipeline,
            llm,
        })
    }

    /// Validate config. Call after load() to fail fast before init.
    pub fn validate(&self) -> Result<()> {
        self.base.validate()?;
        self.pipeline.validate()
    }

    pub fn base(&self) -> &BaseConfig {
        &self.base
    }

    pub fn pipeline(&self) -> &PipelineConfig {
        &self.pipeline
    }

    pub fn llm(&self) -> &EnvLlmConfig {
        &self.llm
    }
}
