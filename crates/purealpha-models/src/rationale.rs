//! Human-readable allocation rationale.
//!
//! Derived, never hand-edited. The regime is always the top-level
//! explanatory frame; ranked causal drivers follow.

use serde::{Deserialize, Serialize};

use crate::regime::{LsiStatus, RegimeLabel};

/// One ranked explanatory driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RationaleEntry {
    /// 1-based rank by realized contribution.
    pub rank: u32,
    /// Short driver label (e.g. "DXY → GLD").
    pub driver: String,
    /// Transmission mechanism and direction, human-readable.
    pub detail: String,
    /// Absolute realized contribution to the expected-return shift,
    /// weighted by the target asset's final allocation.
    pub contribution: f64,
}

/// Ordered explanation of one allocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rationale {
    /// The regime frame: why this allocation, given this market state.
    pub regime: RegimeLabel,
    pub regime_confidence: f64,
    pub lsi_status: LsiStatus,
    /// Causal drivers ranked by realized contribution, descending.
    pub entries: Vec<RationaleEntry>,
    /// Rendered multi-line summary for end users.
    pub summary: String,
}

impl Rationale {
    /// Drivers in rank order (sanity accessor for tests and the API layer).
    pub fn ranked_drivers(&self) -> impl Iterator<Item = &RationaleEntry> {
        self.entries.iter()
    }
}
