//! Regime classification with transition hysteresis.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;
use tracing::{debug, info};

use purealpha_models::{FeatureId, FeatureSnapshot, Regime, RegimeLabel};

use crate::lsi::compute_lsi;
use crate::rules::{regime_rules, required_features, RegimeRule, REGIME_RULES_VERSION};

#[derive(Debug, Error)]
pub enum RegimeError {
    #[error(
        "insufficient data: {missing} of {required} regime features unavailable \
         (fraction {fraction:.2} exceeds limit {max_fraction:.2})"
    )]
    InsufficientData {
        missing: usize,
        required: usize,
        fraction: f64,
        max_fraction: f64,
    },
}

/// Operator-tunable detector thresholds.
#[derive(Debug, Clone)]
pub struct RegimeDetectorConfig {
    /// Maximum tolerated fraction of unavailable rule features.
    pub max_missing_fraction: f64,
    /// Minimum confidence required to adopt a label that differs from the
    /// previous regime.
    pub hysteresis_threshold: f64,
    /// The differing label's score must exceed the previous label's
    /// current score by at least this much to switch.
    pub switch_margin: f64,
}

impl Default for RegimeDetectorConfig {
    fn default() -> Self {
        Self {
            max_missing_fraction: 0.5,
            hysteresis_threshold: 0.60,
            switch_margin: 0.10,
        }
    }
}

/// Scores a snapshot against the rule table and applies hysteresis.
#[derive(Debug, Clone)]
pub struct RegimeDetector {
    config: RegimeDetectorConfig,
    rules: Vec<RegimeRule>,
    required: BTreeSet<FeatureId>,
}

impl RegimeDetector {
    pub fn new(config: RegimeDetectorConfig) -> Self {
        let rules = regime_rules();
        let required = required_features(&rules);
        Self {
            config,
            rules,
            required,
        }
    }

    pub fn rules(&self) -> &[RegimeRule] {
        &self.rules
    }

    /// Features the rule table depends on.
    pub fn required_features(&self) -> &BTreeSet<FeatureId> {
        &self.required
    }

    /// Classify the snapshot. With `previous` supplied, a differing top
    /// label is adopted only when the margin is decisive; otherwise the
    /// previous label is retained with `hysteresis_hold = true`.
    pub fn detect(
        &self,
        snapshot: &FeatureSnapshot,
        previous: Option<&Regime>,
    ) -> Result<Regime, RegimeError> {
        self.check_coverage(snapshot)?;

        let scores = self.score_all(snapshot);
        let (top_label, top_score) = top_of(&scores);
        let runner_up = best_excluding(&scores, top_label);
        let confidence = normalized_margin(top_score, runner_up);

        let mut label = top_label;
        let mut hysteresis_hold = false;

        if let Some(prev) = previous {
            if top_label != prev.label {
                let prev_score = scores.get(&prev.label).copied().unwrap_or(0.0);
                let decisive = confidence >= self.config.hysteresis_threshold
                    && top_score - prev_score >= self.config.switch_margin;
                if !decisive {
                    label = prev.label;
                    hysteresis_hold = true;
                    debug!(
                        candidate = %top_label,
                        held = %prev.label,
                        confidence,
                        "regime transition held by hysteresis"
                    );
                }
            }
        }

        let confidence = if hysteresis_hold {
            let own = scores.get(&label).copied().unwrap_or(0.0);
            normalized_margin(own, best_excluding(&scores, label))
        } else {
            confidence
        };

        let lsi = compute_lsi(snapshot);
        info!(
            regime = %label,
            confidence = format!("{confidence:.3}").as_str(),
            lsi = format!("{:.1}", lsi.score).as_str(),
            hysteresis_hold,
            "regime detected"
        );

        Ok(Regime {
            label,
            confidence,
            lsi,
            scores,
            hysteresis_hold,
            rules_version: REGIME_RULES_VERSION.to_string(),
            snapshot_as_of: snapshot.as_of,
        })
    }

    fn check_coverage(&self, snapshot: &FeatureSnapshot) -> Result<(), RegimeError> {
        let missing = self
            .required
            .iter()
            .filter(|id| snapshot.is_unavailable(id))
            .count();
        let fraction = missing as f64 / self.required.len() as f64;
        if fraction > self.config.max_missing_fraction {
            return Err(RegimeError::InsufficientData {
                missing,
                required: self.required.len(),
                fraction,
                max_fraction: self.config.max_missing_fraction,
            });
        }
        Ok(())
    }

    /// Rule-match score per label: matched conditions / total conditions.
    /// A condition on an unavailable feature counts as unmatched.
    fn score_all(&self, snapshot: &FeatureSnapshot) -> BTreeMap<RegimeLabel, f64> {
        self.rules
            .iter()
            .map(|rule| {
                let matched = rule
                    .conditions
                    .iter()
                    .filter(|c| {
                        snapshot
                            .value_of(&c.feature)
                            .map(|v| c.matches(v))
                            .unwrap_or(false)
                    })
                    .count();
                (rule.label, matched as f64 / rule.conditions.len() as f64)
            })
            .collect()
    }
}

/// Highest-scoring label; ties resolve to canonical table order.
fn top_of(scores: &BTreeMap<RegimeLabel, f64>) -> (RegimeLabel, f64) {
    let mut best = (RegimeLabel::ALL[0], f64::NEG_INFINITY);
    for label in RegimeLabel::ALL {
        let score = scores.get(&label).copied().unwrap_or(0.0);
        if score > best.1 {
            best = (label, score);
        }
    }
    best
}

fn best_excluding(scores: &BTreeMap<RegimeLabel, f64>, excluded: RegimeLabel) -> f64 {
    RegimeLabel::ALL
        .into_iter()
        .filter(|l| *l != excluded)
        .map(|l| scores.get(&l).copied().unwrap_or(0.0))
        .fold(0.0, f64::max)
}

/// Affine map of the top-1 vs top-2 margin into [0, 1]: ties give 0.5, a
/// unique full match against silence gives 1.0.
fn normalized_margin(top: f64, runner_up: f64) -> f64 {
    ((1.0 + top - runner_up) / 2.0).clamp(0.0, 1.0)
}
