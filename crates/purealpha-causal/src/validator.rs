//! Intervention-style screening of declared causal edges.
//!
//! For each applicable hypothesis the validator z-scores the cause feature
//! against its declared baseline, subtracts the declared confounder
//! loadings (the adjustment set), and scales the hypothesis' prior
//! strength by the adjusted deviation. Confidence starts at the prior
//! ceiling and is penalized per unavailable confounder; it never recovers
//! above the prior. Edges are marked validated only above the configured
//! minimum confidence.

use thiserror::Error;
use tracing::{debug, info};

use purealpha_models::{
    AssetUniverse, CausalEffectEstimate, CausalHypothesis, EstimateDisposition, FeatureCatalog,
    FeatureSnapshot, Regime,
};

#[derive(Debug, Error)]
pub enum CausalError {
    #[error("hypothesis {hypothesis}: unknown cause feature '{feature}'")]
    DanglingFeature { hypothesis: String, feature: String },

    #[error("hypothesis {hypothesis}: unknown confounder feature '{feature}'")]
    DanglingConfounder { hypothesis: String, feature: String },

    #[error("hypothesis {hypothesis}: unknown effect asset '{asset}'")]
    DanglingAsset { hypothesis: String, asset: String },

    #[error("hypothesis {hypothesis}: {message}")]
    InvalidHypothesis { hypothesis: String, message: String },
}

/// Operator-tunable validation thresholds.
#[derive(Debug, Clone)]
pub struct CausalValidatorConfig {
    /// Minimum confidence for `validated = true`.
    pub min_confidence: f64,
    /// Multiplicative confidence penalty per unavailable confounder.
    pub missing_confounder_penalty: f64,
    /// Clamp on the adjusted cause deviation, in standard deviations.
    pub max_abs_z: f64,
}

impl Default for CausalValidatorConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.55,
            missing_confounder_penalty: 0.7,
            max_abs_z: 3.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CausalValidator {
    config: CausalValidatorConfig,
}

impl CausalValidator {
    pub fn new(config: CausalValidatorConfig) -> Self {
        Self { config }
    }

    /// Screen the full hypothesis set. Output preserves input order and
    /// has exactly one estimate per hypothesis.
    pub fn validate(
        &self,
        snapshot: &FeatureSnapshot,
        regime: &Regime,
        hypotheses: &[CausalHypothesis],
        catalog: &FeatureCatalog,
        universe: &AssetUniverse,
    ) -> Result<Vec<CausalEffectEstimate>, CausalError> {
        self.check_integrity(hypotheses, catalog, universe)?;

        let estimates: Vec<CausalEffectEstimate> = hypotheses
            .iter()
            .map(|hyp| self.estimate_one(snapshot, regime, hyp))
            .collect();

        let validated = estimates.iter().filter(|e| e.validated).count();
        info!(
            total = estimates.len(),
            validated,
            regime = %regime.label,
            "causal screening complete"
        );

        Ok(estimates)
    }

    /// Fail-fast structural pass over the whole set: dangling references
    /// and malformed scales abort the analysis before any estimation.
    fn check_integrity(
        &self,
        hypotheses: &[CausalHypothesis],
        catalog: &FeatureCatalog,
        universe: &AssetUniverse,
    ) -> Result<(), CausalError> {
        for hyp in hypotheses {
            if !catalog.resolves(&hyp.cause) {
                return Err(CausalError::DanglingFeature {
                    hypothesis: hyp.id.to_string(),
                    feature: hyp.cause.to_string(),
                });
            }
            for confounder in &hyp.adjustment_set {
                if !catalog.resolves(&confounder.feature) {
                    return Err(CausalError::DanglingConfounder {
                        hypothesis: hyp.id.to_string(),
                        feature: confounder.feature.to_string(),
                    });
                }
            }
            if !universe.contains(&hyp.effect) {
                return Err(CausalError::DanglingAsset {
                    hypothesis: hyp.id.to_string(),
                    asset: hyp.effect.to_string(),
                });
            }
            if hyp.scale <= 0.0 {
                return Err(CausalError::InvalidHypothesis {
                    hypothesis: hyp.id.to_string(),
                    message: format!("cause scale must be positive, got {}", hyp.scale),
                });
            }
            if !(0.0..=1.0).contains(&hyp.prior_confidence) {
                return Err(CausalError::InvalidHypothesis {
                    hypothesis: hyp.id.to_string(),
                    message: format!(
                        "prior confidence must lie in [0, 1], got {}",
                        hyp.prior_confidence
                    ),
                });
            }
        }
        Ok(())
    }

    fn estimate_one(
        &self,
        snapshot: &FeatureSnapshot,
        regime: &Regime,
        hyp: &CausalHypothesis,
    ) -> CausalEffectEstimate {
        if !hyp.applicable_regimes.contains(&regime.label) {
            debug!(hypothesis = %hyp.id, regime = %regime.label, "regime inapplicable");
            return CausalEffectEstimate::screened(hyp, EstimateDisposition::RegimeInapplicable);
        }

        let Some(cause_value) = snapshot.value_of(&hyp.cause) else {
            debug!(hypothesis = %hyp.id, cause = %hyp.cause, "cause feature unavailable");
            return CausalEffectEstimate::screened(hyp, EstimateDisposition::MissingCause);
        };

        // Intervention-style adjustment: remove the declared confounder
        // shares from the raw cause deviation before scaling the prior.
        let raw_z = (cause_value - hyp.baseline) / hyp.scale;
        let mut adjusted_z = raw_z;
        let mut missing_confounders = 0u32;
        for confounder in &hyp.adjustment_set {
            match snapshot.value_of(&confounder.feature) {
                Some(value) if confounder.scale > 0.0 => {
                    let confounder_z = (value - confounder.baseline) / confounder.scale;
                    adjusted_z -= confounder.loading * confounder_z;
                }
                _ => missing_confounders += 1,
            }
        }
        let adjusted_z = adjusted_z.clamp(-self.config.max_abs_z, self.config.max_abs_z);

        let effect = hyp.prior_strength * adjusted_z;
        let confidence = (hyp.prior_confidence
            * self
                .config
                .missing_confounder_penalty
                .powi(missing_confounders as i32))
        .clamp(0.0, 1.0);

        let validated = effect.is_finite() && confidence >= self.config.min_confidence;
        let disposition = if validated {
            EstimateDisposition::Validated
        } else {
            EstimateDisposition::BelowThreshold
        };

        CausalEffectEstimate {
            hypothesis: hyp.id.clone(),
            cause: hyp.cause.clone(),
            effect_asset: hyp.effect.clone(),
            effect,
            confidence,
            validated,
            disposition,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use purealpha_models::{
        AssetClass, AssetId, AssetProfile, Confounder, FeatureId, FeatureObservation, HypothesisId,
        Lsi, LsiComponents, LsiStatus, RegimeLabel, SourceTag,
    };
    use std::collections::BTreeMap;

    fn ts() -> DateTime<Utc> {
        "2026-08-01T00:00:00Z".parse().unwrap()
    }

    fn snapshot(values: &[(&str, f64)]) -> FeatureSnapshot {
        let mut snap = FeatureSnapshot::new(ts(), "catalog_v1");
        for (id, v) in values {
            snap.insert(
                FeatureId::from(*id),
                FeatureObservation::present(*v, ts(), SourceTag::Market),
            );
        }
        snap
    }

    fn regime(label: RegimeLabel) -> Regime {
        Regime {
            label,
            confidence: 0.8,
            lsi: Lsi {
                score: 20.0,
                status: LsiStatus::Normal,
                components: LsiComponents::default(),
            },
            scores: BTreeMap::new(),
            hysteresis_hold: false,
            rules_version: "regime_rules_v1".to_string(),
            snapshot_as_of: ts(),
        }
    }

    fn universe() -> AssetUniverse {
        AssetUniverse::new(
            "universe_v1",
            vec![AssetProfile {
                id: AssetId::from("GLD"),
                name: "Gold".to_string(),
                class: AssetClass::Gold,
                expected_return: 0.05,
                volatility: 0.14,
                min_weight: 0.0,
                max_weight: 1.0,
            }],
            BTreeMap::new(),
        )
    }

    fn catalog() -> FeatureCatalog {
        FeatureCatalog::new(
            "catalog_v1",
            ["dxy", "fed_rate", "vix"].into_iter().map(FeatureId::from),
        )
    }

    fn dxy_gold_hypothesis() -> CausalHypothesis {
        CausalHypothesis {
            id: HypothesisId::from("dxy_to_gld"),
            cause: FeatureId::from("dxy"),
            effect: AssetId::from("GLD"),
            prior_strength: -0.03,
            prior_confidence: 0.85,
            baseline: 100.0,
            scale: 5.0,
            adjustment_set: vec![Confounder {
                feature: FeatureId::from("fed_rate"),
                loading: 0.4,
                baseline: 0.03,
                scale: 0.015,
            }],
            applicable_regimes: [RegimeLabel::Goldilocks, RegimeLabel::GeopoliticalShock]
                .into_iter()
                .collect(),
            mechanism: "Dollar strength inverse to gold (gold priced in USD)".to_string(),
        }
    }

    #[test]
    fn applicable_edge_with_full_adjustment_set_validates() {
        let validator = CausalValidator::default();
        let snap = snapshot(&[("dxy", 107.5), ("fed_rate", 0.045)]);
        let hyps = vec![dxy_gold_hypothesis()];

        let estimates = validator
            .validate(&snap, &regime(RegimeLabel::Goldilocks), &hyps, &catalog(), &universe())
            .unwrap();

        assert_eq!(estimates.len(), 1);
        let est = &estimates[0];
        assert!(est.validated);
        assert_eq!(est.disposition, EstimateDisposition::Validated);
        assert!((est.confidence - 0.85).abs() < 1e-12);

        // z(dxy) = 1.5, z(fed_rate) = 1.0, adjusted = 1.5 - 0.4 = 1.1
        let expected_effect = -0.03 * 1.1;
        assert!((est.effect - expected_effect).abs() < 1e-12);
    }

    #[test]
    fn inapplicable_regime_yields_zero_effect_audit_row() {
        let validator = CausalValidator::default();
        let snap = snapshot(&[("dxy", 107.5), ("fed_rate", 0.045)]);
        let hyps = vec![dxy_gold_hypothesis()];

        let estimates = validator
            .validate(&snap, &regime(RegimeLabel::Crisis), &hyps, &catalog(), &universe())
            .unwrap();

        let est = &estimates[0];
        assert!(!est.validated);
        assert_eq!(est.effect, 0.0);
        assert_eq!(est.confidence, 0.0);
        assert_eq!(est.disposition, EstimateDisposition::RegimeInapplicable);
    }

    #[test]
    fn missing_confounder_penalizes_confidence_below_threshold() {
        let validator = CausalValidator::default();
        // fed_rate absent: confidence 0.85 * 0.7 = 0.595, still >= 0.55;
        // two penalties would fall below, so tighten the config instead.
        let strict = CausalValidator::new(CausalValidatorConfig {
            min_confidence: 0.60,
            ..CausalValidatorConfig::default()
        });
        let snap = snapshot(&[("dxy", 107.5)]);
        let hyps = vec![dxy_gold_hypothesis()];

        let lenient = validator
            .validate(&snap, &regime(RegimeLabel::Goldilocks), &hyps, &catalog(), &universe())
            .unwrap();
        assert!(lenient[0].validated);
        assert!((lenient[0].confidence - 0.595).abs() < 1e-12);

        let rejected = strict
            .validate(&snap, &regime(RegimeLabel::Goldilocks), &hyps, &catalog(), &universe())
            .unwrap();
        assert!(!rejected[0].validated);
        assert_eq!(rejected[0].disposition, EstimateDisposition::BelowThreshold);
        // The estimate itself survives for audit, unadjusted for fed_rate.
        assert!(rejected[0].effect.abs() > 0.0);
    }

    #[test]
    fn missing_cause_is_screened_not_failed() {
        let validator = CausalValidator::default();
        let snap = snapshot(&[("fed_rate", 0.045)]);
        let hyps = vec![dxy_gold_hypothesis()];

        let estimates = validator
            .validate(&snap, &regime(RegimeLabel::Goldilocks), &hyps, &catalog(), &universe())
            .unwrap();
        assert_eq!(estimates[0].disposition, EstimateDisposition::MissingCause);
        assert_eq!(estimates[0].effect, 0.0);
    }

    #[test]
    fn dangling_reference_fails_fast() {
        let validator = CausalValidator::default();
        let snap = snapshot(&[("dxy", 107.5)]);

        let mut dangling_cause = dxy_gold_hypothesis();
        dangling_cause.cause = FeatureId::from("not_a_feature");
        let err = validator
            .validate(
                &snap,
                &regime(RegimeLabel::Goldilocks),
                &[dangling_cause],
                &catalog(),
                &universe(),
            )
            .unwrap_err();
        assert!(matches!(err, CausalError::DanglingFeature { .. }));

        let mut dangling_asset = dxy_gold_hypothesis();
        dangling_asset.effect = AssetId::from("NOPE");
        let err = validator
            .validate(
                &snap,
                &regime(RegimeLabel::Goldilocks),
                &[dangling_asset],
                &catalog(),
                &universe(),
            )
            .unwrap_err();
        assert!(matches!(err, CausalError::DanglingAsset { .. }));
    }

    #[test]
    fn output_is_deterministic_and_order_preserving() {
        let validator = CausalValidator::default();
        let snap = snapshot(&[("dxy", 107.5), ("fed_rate", 0.045), ("vix", 18.0)]);

        let mut second = dxy_gold_hypothesis();
        second.id = HypothesisId::from("vix_to_gld");
        second.cause = FeatureId::from("vix");
        second.baseline = 18.0;
        second.scale = 8.0;
        let hyps = vec![dxy_gold_hypothesis(), second];

        let a = validator
            .validate(&snap, &regime(RegimeLabel::Goldilocks), &hyps, &catalog(), &universe())
            .unwrap();
        let b = validator
            .validate(&snap, &regime(RegimeLabel::Goldilocks), &hyps, &catalog(), &universe())
            .unwrap();

        assert_eq!(a, b);
        assert_eq!(a[0].hypothesis, HypothesisId::from("dxy_to_gld"));
        assert_eq!(a[1].hypothesis, HypothesisId::from("vix_to_gld"));
    }
}
