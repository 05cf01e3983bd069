//! Regime records and the Liquidity Stress Index.
//!
//! `Regime` is produced fresh on every analysis request and never mutated;
//! it is tagged with the snapshot it was derived from so the provenance
//! ledger can bind classification to inputs.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Closed enumeration of market regimes. The set and its semantics are a
/// fixed, versioned table (`regime_rules_v1` in the detector crate); adding
/// or renaming a label is a new table version, never an in-place edit.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegimeLabel {
    Goldilocks,
    Recession,
    Crisis,
    Stagflation,
    MeltUp,
    Recovery,
    TaperTantrum,
    GeopoliticalShock,
    TechDisruption,
    Deglobalization,
}

impl RegimeLabel {
    /// All labels, in canonical table order.
    pub const ALL: [RegimeLabel; 10] = [
        RegimeLabel::Goldilocks,
        RegimeLabel::Recession,
        RegimeLabel::Crisis,
        RegimeLabel::Stagflation,
        RegimeLabel::MeltUp,
        RegimeLabel::Recovery,
        RegimeLabel::TaperTantrum,
        RegimeLabel::GeopoliticalShock,
        RegimeLabel::TechDisruption,
        RegimeLabel::Deglobalization,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RegimeLabel::Goldilocks => "GOLDILOCKS",
            RegimeLabel::Recession => "RECESSION",
            RegimeLabel::Crisis => "CRISIS",
            RegimeLabel::Stagflation => "STAGFLATION",
            RegimeLabel::MeltUp => "MELT_UP",
            RegimeLabel::Recovery => "RECOVERY",
            RegimeLabel::TaperTantrum => "TAPER_TANTRUM",
            RegimeLabel::GeopoliticalShock => "GEOPOLITICAL_SHOCK",
            RegimeLabel::TechDisruption => "TECH_DISRUPTION",
            RegimeLabel::Deglobalization => "DEGLOBALIZATION",
        }
    }
}

impl fmt::Display for RegimeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Liquidity Stress Index status bands (cut points 30 / 50 / 75).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LsiStatus {
    Normal,
    ModerateStress,
    SevereStress,
    CriticalLiquidityShock,
}

impl LsiStatus {
    pub fn from_score(score: f64) -> Self {
        if score >= 75.0 {
            LsiStatus::CriticalLiquidityShock
        } else if score >= 50.0 {
            LsiStatus::SevereStress
        } else if score >= 30.0 {
            LsiStatus::ModerateStress
        } else {
            LsiStatus::Normal
        }
    }
}

/// Per-component LSI breakdown. A `None` component means its input feature
/// was unavailable and the remaining weights were renormalized; absence is
/// recorded, never papered over with a neutral value.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LsiComponents {
    pub vix: Option<f64>,
    pub credit_spread: Option<f64>,
    pub dollar_stress: Option<f64>,
    pub baseline: f64,
}

/// Liquidity/Stress Index in [0, 100].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Lsi {
    pub score: f64,
    pub status: LsiStatus,
    pub components: LsiComponents,
}

/// Immutable result of one regime classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Regime {
    pub label: RegimeLabel,
    /// Normalized top-1 vs top-2 margin, in [0, 1].
    pub confidence: f64,
    pub lsi: Lsi,
    /// Raw rule-match score per label, kept for audit.
    pub scores: BTreeMap<RegimeLabel, f64>,
    /// True when hysteresis retained the previous label despite a different
    /// raw top score on this snapshot.
    pub hysteresis_hold: bool,
    /// Version of the rule table that produced this record.
    pub rules_version: String,
    /// Snapshot this regime was derived from.
    pub snapshot_as_of: DateTime<Utc>,
}

impl Regime {
    /// Raw rule-match score for a label (0.0 when the label was unscored).
    pub fn score_of(&self, label: RegimeLabel) -> f64 {
        self.scores.get(&label).copied().unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lsi_status_bands() {
        assert_eq!(LsiStatus::from_score(12.0), LsiStatus::Normal);
        assert_eq!(LsiStatus::from_score(30.0), LsiStatus::ModerateStress);
        assert_eq!(LsiStatus::from_score(64.9), LsiStatus::SevereStress);
        assert_eq!(LsiStatus::from_score(80.0), LsiStatus::CriticalLiquidityShock);
    }

    #[test]
    fn labels_are_stable_strings() {
        assert_eq!(RegimeLabel::Goldilocks.as_str(), "GOLDILOCKS");
        assert_eq!(RegimeLabel::MeltUp.as_str(), "MELT_UP");
        assert_eq!(RegimeLabel::ALL.len(), 10);
    }
}
