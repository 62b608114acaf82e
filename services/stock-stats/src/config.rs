//! Stock statistics configuration

use crate::aggregators::{SnapshotOrder, WeightingPolicy, ZeroWeightPolicy};
use crate::error::{StatsError, StatsResult};
use crate::resolver::{KeyField, Timeframe};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default number of state shards in the driver service
pub const DEFAULT_SHARDS: usize = 8;

/// Stock statistics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StatsConfig {
    /// Window granularity
    pub timeframe: Timeframe,

    /// Tick fields forming the grouping key, in order
    pub key_fields: Vec<KeyField>,

    /// Weighting rule per statistic
    pub weighting: WeightingPolicy,

    /// How first/last trades are chosen
    pub snapshot_order: SnapshotOrder,

    /// Whether zero-weight observations are accepted
    pub zero_weight: ZeroWeightPolicy,

    /// Number of independently locked state shards
    pub shards: usize,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            timeframe: Timeframe::D1,
            key_fields: vec![KeyField::Exchange, KeyField::Security],
            weighting: WeightingPolicy::default(),
            snapshot_order: SnapshotOrder::EventTime,
            zero_weight: ZeroWeightPolicy::Accept,
            shards: DEFAULT_SHARDS,
        }
    }
}

impl StatsConfig {
    /// Load and validate configuration from a JSON file
    pub fn from_json_file(path: &Path) -> StatsResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| StatsError::Config {
            message: format!("cannot read {}: {e}", path.display()),
        })?;
        Self::from_json_str(&raw)
    }

    /// Parse and validate configuration from JSON text
    pub fn from_json_str(raw: &str) -> StatsResult<Self> {
        let config: Self = serde_json::from_str(raw).map_err(|e| StatsError::Config {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject inconsistent settings
    pub fn validate(&self) -> StatsResult<()> {
        if self.key_fields.is_empty() {
            return Err(StatsError::Config {
                message: "keyFields must name at least one field".to_string(),
            });
        }
        for (i, field) in self.key_fields.iter().enumerate() {
            if self.key_fields[..i].contains(field) {
                return Err(StatsError::Config {
                    message: format!("keyFields lists {field} twice"),
                });
            }
        }
        if self.shards == 0 {
            return Err(StatsError::Config {
                message: "shards must be positive".to_string(),
            });
        }
        Ok(())
    }
}
