use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CalcError, CalcResult};
use crate::reduction::context::Strategy;

/// Resource bounds and fallback policy for the engine.
///
/// Every field has a default, so a TOML file only needs to name the values it changes:
///
/// ```toml
/// arena_capacity = 4096
/// fallback = ["approximate_to_float"]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Maximum arena size in bytes.
    pub arena_capacity: usize,
    /// Number of handle slots.
    pub handle_capacity: usize,
    /// Candidate evaluations allowed per advanced reduction.
    pub max_advanced_steps: usize,
    /// Longest sequence of directions explored by advanced reduction.
    pub max_path_length: usize,
    /// Distinct intermediate states remembered by advanced reduction.
    pub max_visited_states: usize,
    /// Largest integer exponent expanded by `(a + b)^n`.
    pub max_expanded_power: u32,
    /// Strategies tried, in order, after the requested one fails recoverably.
    pub fallback: Vec<Strategy>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            arena_capacity: 16 * 1024,
            handle_capacity: 128,
            max_advanced_steps: 1024,
            max_path_length: 12,
            max_visited_states: 128,
            max_expanded_power: 4,
            fallback: vec![Strategy::NumbersToFloat, Strategy::ApproximateToFloat],
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(source: &str) -> CalcResult<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Load the configuration from a TOML file.
    pub fn load_from_toml(path: &Path) -> CalcResult<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    pub fn to_toml_string(&self) -> CalcResult<String> {
        toml::to_string(self).map_err(|e| CalcError::ConfigSerialize(e.to_string()))
    }
}
