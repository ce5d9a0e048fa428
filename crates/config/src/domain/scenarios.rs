//! Sales scenario catalog
//!
//! Loaded from scenarios.yaml. A scenario names the documents a deal needs and
//! declares its trade-in situation, which becomes the `ScenarioFeatures` passed to
//! field requirement checks.

use dealer_assist_core::{ScenarioFeatures, TradeInStatus};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::ConfigError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub trade_in: TradeInStatus,
    /// Document ids in signing order
    #[serde(default)]
    pub required_documents: Vec<String>,
}

impl ScenarioDefinition {
    pub fn features(&self) -> ScenarioFeatures {
        ScenarioFeatures::from_trade_in(self.trade_in)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScenariosConfig {
    #[serde(default)]
    pub scenarios: Vec<ScenarioDefinition>,
}

impl ScenariosConfig {
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileNotFound(format!("{}: {}", path.as_ref().display(), e)))?;
        Self::from_yaml_str(&content)
    }

    pub fn get(&self, id: &str) -> Option<&ScenarioDefinition> {
        self.scenarios.iter().find(|s| s.id == id)
    }

    pub fn all(&self) -> &[ScenarioDefinition] {
        &self.scenarios
    }
}
