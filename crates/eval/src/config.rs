//! Engine configuration.
//!
//! Read from an optional TOML file:
//!
//! ```toml
//! [engine]
//! combination = "signed_mycin"   # or "simple_positive"
//! policy = "partial"             # or "exact_subset"
//! ```
//!
//! Omitted keys take their defaults. The chosen combination and policy
//! apply to a whole knowledge base and are recorded in its metadata.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::certainty::Combination;
use crate::error::EngineError;

/// When a rule is allowed to fire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicy {
    /// Fire on any overlap, weighted by the matched fraction of conditions.
    #[default]
    Partial,
    /// Fire only when every condition is observed, at full rule certainty.
    ExactSubset,
}

impl MatchPolicy {
    pub fn name(self) -> &'static str {
        match self {
            MatchPolicy::Partial => "partial",
            MatchPolicy::ExactSubset => "exact_subset",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub combination: Combination,
    pub policy: MatchPolicy,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    engine: EngineConfig,
}

impl EngineConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, EngineError> {
        let file: ConfigFile = toml::from_str(content).map_err(|e| EngineError::Config {
            message: e.to_string(),
        })?;
        Ok(file.engine)
    }
}

/// Read an engine config file. A missing file yields the defaults.
pub fn read_config(path: &Path) -> Result<EngineConfig, EngineError> {
    if !path.exists() {
        return Ok(EngineConfig::default());
    }
    let content = std::fs::read_to_string(path).map_err(|e| EngineError::Config {
        message: format!("could not read '{}': {}", path.display(), e),
    })?;
    EngineConfig::from_toml_str(&content)
}
