//! Versioned, read-only configuration store.
//!
//! Loads the feature catalog, asset universe, and causal hypothesis set
//! from JSON files and cross-validates every reference before the engine
//! accepts them. A dangling reference is a deployment defect: it fails the
//! load loudly instead of surfacing mid-analysis.

use std::path::Path;

use tracing::{error, info};

use purealpha_models::{AssetUniverse, CausalHypothesis, FeatureCatalog};

use crate::error::EngineError;

pub const FEATURE_CATALOG_FILE: &str = "feature_catalog.json";
pub const ASSET_UNIVERSE_FILE: &str = "asset_universe.json";
pub const CAUSAL_HYPOTHESES_FILE: &str = "causal_hypotheses.json";

/// The three read-only configuration inputs of one engine instance.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    pub catalog: FeatureCatalog,
    pub universe: AssetUniverse,
    pub hypotheses: Vec<CausalHypothesis>,
}

impl ConfigStore {
    /// Assemble from already-built parts (tests, embedded config) and
    /// cross-validate.
    pub fn new(
        catalog: FeatureCatalog,
        universe: AssetUniverse,
        hypotheses: Vec<CausalHypothesis>,
    ) -> Result<Self, EngineError> {
        let store = Self {
            catalog,
            universe,
            hypotheses,
        };
        store.cross_validate()?;
        Ok(store)
    }

    /// Load `feature_catalog.json`, `asset_universe.json`, and
    /// `causal_hypotheses.json` from a directory.
    pub fn load(dir: &Path) -> Result<Self, EngineError> {
        let catalog: FeatureCatalog = read_json(&dir.join(FEATURE_CATALOG_FILE))?;
        let universe: AssetUniverse = read_json(&dir.join(ASSET_UNIVERSE_FILE))?;
        let hypotheses: Vec<CausalHypothesis> = read_json(&dir.join(CAUSAL_HYPOTHESES_FILE))?;

        let store = Self::new(catalog, universe, hypotheses)?;
        info!(
            catalog_version = store.catalog.version.as_str(),
            universe_version = store.universe.version.as_str(),
            hypotheses = store.hypotheses.len(),
            "configuration loaded"
        );
        Ok(store)
    }

    fn cross_validate(&self) -> Result<(), EngineError> {
        if let Err(e) = self.universe.validate() {
            error!(error = %e, "asset universe failed validation");
            return Err(EngineError::Configuration(e.to_string()));
        }

        for hyp in &self.hypotheses {
            if !self.catalog.resolves(&hyp.cause) {
                let msg = format!(
                    "hypothesis {}: cause feature '{}' not in catalog {}",
                    hyp.id, hyp.cause, self.catalog.version
                );
                error!(error = msg.as_str(), "hypothesis cross-validation failed");
                return Err(EngineError::Configuration(msg));
            }
            for confounder in &hyp.adjustment_set {
                if !self.catalog.resolves(&confounder.feature) {
                    let msg = format!(
                        "hypothesis {}: confounder '{}' not in catalog {}",
                        hyp.id, confounder.feature, self.catalog.version
                    );
                    error!(error = msg.as_str(), "hypothesis cross-validation failed");
                    return Err(EngineError::Configuration(msg));
                }
            }
            if !self.universe.contains(&hyp.effect) {
                let msg = format!(
                    "hypothesis {}: effect asset '{}' not in universe {}",
                    hyp.id, hyp.effect, self.universe.version
                );
                error!(error = msg.as_str(), "hypothesis cross-validation failed");
                return Err(EngineError::Configuration(msg));
            }
        }
        Ok(())
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, EngineError> {
    let bytes = std::fs::read(path).map_err(|e| {
        EngineError::Configuration(format!("read {}: {e}", path.display()))
    })?;
    serde_json::from_slice(&bytes).map_err(|e| {
        EngineError::Configuration(format!("parse {}: {e}", path.display()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use purealpha_models::{
        AssetClass, AssetId, AssetProfile, FeatureId, HypothesisId, RegimeLabel,
    };
    use std::collections::BTreeMap;

    fn catalog() -> FeatureCatalog {
        FeatureCatalog::new("catalog_v1", [FeatureId::from("vix")])
    }

    fn universe() -> AssetUniverse {
        AssetUniverse::new(
            "universe_v1",
            vec![AssetProfile {
                id: AssetId::from("VTI"),
                name: "Total Stock Market".to_string(),
                class: AssetClass::Equity,
                expected_return: 0.08,
                volatility: 0.17,
                min_weight: 0.0,
                max_weight: 1.0,
            }],
            BTreeMap::new(),
        )
    }

    fn hypothesis(cause: &str, effect: &str) -> CausalHypothesis {
        CausalHypothesis {
            id: HypothesisId::from("h1"),
            cause: FeatureId::from(cause),
            effect: AssetId::from(effect),
            prior_strength: -0.02,
            prior_confidence: 0.8,
            baseline: 18.0,
            scale: 8.0,
            adjustment_set: vec![],
            applicable_regimes: [RegimeLabel::Goldilocks].into_iter().collect(),
            mechanism: "Volatility spike triggers risk-off selling".to_string(),
        }
    }

    #[test]
    fn valid_store_passes_cross_validation() {
        let store = ConfigStore::new(catalog(), universe(), vec![hypothesis("vix", "VTI")]);
        assert!(store.is_ok());
    }

    #[test]
    fn dangling_cause_is_a_configuration_error() {
        let err = ConfigStore::new(catalog(), universe(), vec![hypothesis("nope", "VTI")])
            .unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }

    #[test]
    fn dangling_effect_is_a_configuration_error() {
        let err = ConfigStore::new(catalog(), universe(), vec![hypothesis("vix", "NOPE")])
            .unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }
}
