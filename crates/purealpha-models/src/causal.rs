//! Causal hypotheses and effect estimates.
//!
//! Hypotheses are supplied as versioned, read-only configuration; the
//! engine never invents edges. Estimates are produced fresh per analysis
//! and are immutable once built. Every hypothesis yields an estimate, even
//! when it is screened out, so callers can audit why an edge was excluded.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::feature::FeatureId;
use crate::regime::RegimeLabel;
use crate::universe::AssetId;

/// Identifier of a declared causal edge (e.g. `dxy_to_gld`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HypothesisId(String);

impl HypothesisId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HypothesisId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for HypothesisId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A declared confounder in a hypothesis' adjustment set. When the feature
/// is available, `loading × z(confounder)` is subtracted from the cause
/// signal; when it is not, the estimate's confidence is penalized instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Confounder {
    pub feature: FeatureId,
    /// Fraction of the cause signal attributable to this confounder.
    pub loading: f64,
    /// Baseline used to z-score the confounder value.
    pub baseline: f64,
    /// Scale (one standard deviation) used to z-score the confounder value.
    pub scale: f64,
}

/// A declared directed edge: cause feature → effect asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CausalHypothesis {
    pub id: HypothesisId,
    pub cause: FeatureId,
    pub effect: AssetId,
    /// Signed expected-return shift (annualized) per one standard deviation
    /// of cause deviation, after confounder adjustment.
    pub prior_strength: f64,
    /// Confidence ceiling from the knowledge base, in [0, 1].
    pub prior_confidence: f64,
    /// Baseline value of the cause feature (center of its normal range).
    pub baseline: f64,
    /// One standard deviation of the cause feature.
    pub scale: f64,
    /// Confounders to adjust for; may be empty.
    #[serde(default)]
    pub adjustment_set: Vec<Confounder>,
    /// Regimes in which this edge is hypothesized to operate.
    pub applicable_regimes: BTreeSet<RegimeLabel>,
    /// Human-readable transmission mechanism, from the knowledge base.
    pub mechanism: String,
}

/// Why an estimate ended up validated or screened out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimateDisposition {
    /// Passed the confidence threshold; contributes to optimization.
    Validated,
    /// Estimated, but confidence fell below the configured minimum.
    BelowThreshold,
    /// The detected regime is outside the hypothesis' applicable set.
    RegimeInapplicable,
    /// The cause feature was unavailable in the snapshot.
    MissingCause,
}

/// Immutable per-analysis estimate for one hypothesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CausalEffectEstimate {
    pub hypothesis: HypothesisId,
    pub cause: FeatureId,
    pub effect_asset: AssetId,
    /// Signed expected-return shift. Exactly 0.0 for screened-out edges.
    pub effect: f64,
    /// Validity confidence in [0, 1].
    pub confidence: f64,
    pub validated: bool,
    pub disposition: EstimateDisposition,
}

impl CausalEffectEstimate {
    /// A screened-out estimate: zero effect, zero confidence, auditable
    /// disposition.
    pub fn screened(hypothesis: &CausalHypothesis, disposition: EstimateDisposition) -> Self {
        debug_assert!(disposition != EstimateDisposition::Validated);
        Self {
            hypothesis: hypothesis.id.clone(),
            cause: hypothesis.cause.clone(),
            effect_asset: hypothesis.effect.clone(),
            effect: 0.0,
            confidence: 0.0,
            validated: false,
            disposition,
        }
    }
}
