// SPDX-License-Identifier: MIT OR Apache-2.0
//! Engine configuration.

use crate::persist::PersistError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default number of passes a tick may run before reporting `Unstable`
pub const DEFAULT_MAX_SETTLE_PASSES: usize = 64;

/// Default minimum layer width before evaluation fans out to worker threads
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 4;

/// Settings for evaluating a package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Passes per tick before giving up on convergence
    pub max_settle_passes: usize,
    /// Evaluate independent nodes of a layer on the rayon pool
    pub parallel: bool,
    /// Minimum layer width for parallel evaluation
    pub parallel_threshold: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_settle_passes: DEFAULT_MAX_SETTLE_PASSES,
            parallel: true,
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
        }
    }
}

impl EngineConfig {
    /// Parse from RON; missing fields take their defaults
    pub fn from_ron(s: &str) -> Result<Self, PersistError> {
        Ok(ron::from_str(s)?)
    }

    /// Serialize to RON format
    pub fn to_ron(&self) -> Result<String, PersistError> {
        Ok(ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?)
    }

    /// Load from a RON file
    pub fn load(path: &Path) -> Result<Self, PersistError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron(&contents)
    }
}
