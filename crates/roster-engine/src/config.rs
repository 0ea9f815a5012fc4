//! Engine tunables.

use serde::{Deserialize, Serialize};

/// Thresholds used by conflict detection and hour flagging.
///
/// Every field has a default, so a partial JSON document such as
/// `{"min_conflict_overlap_minutes": 10}` is a valid configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Overlaps of this many minutes or fewer are tolerated.
    pub min_conflict_overlap_minutes: i64,
    /// Weekly totals above this are flagged as overtime (39h).
    pub overtime_threshold_minutes: i64,
    /// Non-zero weekly totals below this are flagged as undertime (15h).
    pub undertime_threshold_minutes: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_conflict_overlap_minutes: 5,
            overtime_threshold_minutes: 39 * 60,
            undertime_threshold_minutes: 15 * 60,
        }
    }
}

impl EngineConfig {
    /// Parse a configuration document; missing fields keep their defaults.
    pub fn from_json(json: &str) -> crate::error::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
