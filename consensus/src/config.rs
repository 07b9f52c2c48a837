//! Engine configuration with TOML file support.

use serde::{Deserialize, Serialize};
use snowstorm_types::{Parameters, TransitionGraph, Tx};
use snowstorm_utils::LogFormat;
use std::path::Path;

use crate::{ConsensusError, Snowstorm};

/// Configuration for a snowstorm engine and the task that owns it.
///
/// Can be loaded from a TOML file via [`EngineConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Capacity of the command channel feeding the engine task.
    #[serde(default = "default_command_buffer")]
    pub command_buffer: usize,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter, e.g. "info" or "info,snowstorm_consensus=debug".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Snowball parameters. Must stay last: TOML tables follow plain values.
    #[serde(default)]
    pub parameters: Parameters,
}

fn default_command_buffer() -> usize {
    256
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl EngineConfig {
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConsensusError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConsensusError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConsensusError> {
        toml::from_str(s).map_err(|e| ConsensusError::Config(e.to_string()))
    }

    pub fn to_toml_string(&self) -> Result<String, ConsensusError> {
        toml::to_string_pretty(self).map_err(|e| ConsensusError::Config(e.to_string()))
    }

    /// Check every field without building anything.
    pub fn validate(&self) -> Result<(), ConsensusError> {
        self.parameters.validate()?;
        if self.command_buffer == 0 {
            return Err(ConsensusError::Config(
                "command_buffer must be positive".to_string(),
            ));
        }
        self.format()?;
        Ok(())
    }

    pub fn format(&self) -> Result<LogFormat, ConsensusError> {
        Ok(self.log_format.parse()?)
    }

    /// Install the global tracing subscriber described by `log_format` and
    /// `log_level`.
    pub fn init_logging(&self) -> Result<(), ConsensusError> {
        Ok(snowstorm_utils::init_logging(self.format()?, &self.log_level)?)
    }

    /// Build an engine over `graph` with these parameters.
    pub fn build<T: Tx, G: TransitionGraph>(
        &self,
        graph: G,
    ) -> Result<Snowstorm<T, G>, ConsensusError> {
        Snowstorm::new(self.parameters, graph)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            command_buffer: default_command_buffer(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            parameters: Parameters::default(),
        }
    }
}
