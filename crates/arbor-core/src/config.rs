//! Engine configuration

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Tunables for a `VisualizationState`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Re-check every invariant end-to-end after each mutating call.
    /// On by default in debug builds only.
    pub validate_invariants: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            validate_invariants: cfg!(debug_assertions),
        }
    }
}

impl EngineConfig {
    /// Configuration with the invariant re-check forced on.
    pub fn checked() -> Self {
        EngineConfig {
            validate_invariants: true,
        }
    }

    pub fn from_toml_str(source: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(source)
    }

    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = Self::from_toml_str(&source)
            .with_context(|| format!("parsing config {}", path.display()))?;
        tracing::debug!("Loaded engine config from {}: {:?}", path.display(), config);
        Ok(config)
    }
}
