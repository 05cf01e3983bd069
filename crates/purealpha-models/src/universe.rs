//! Investable asset universe with per-asset constraints.
//!
//! Read-only configuration at analysis time. Order matters: the optimizer
//! iterates assets in universe order, so the universe is a `Vec`, not a map.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Asset identifier (ticker-style, e.g. "VTI", "GLD", "CASH").
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(String);

impl AssetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssetId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Asset class, used for concentration caps and correlation blocks.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
    Equity,
    Bond,
    Gold,
    Commodity,
    Cash,
}

/// One investable asset with baseline estimates and weight bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetProfile {
    pub id: AssetId,
    pub name: String,
    pub class: AssetClass,
    /// Baseline annualized expected return (before regime/causal shifts).
    pub expected_return: f64,
    /// Baseline annualized volatility. Must be > 0 except for cash-like
    /// assets, where a small floor is applied by consumers.
    pub volatility: f64,
    /// Minimum portfolio weight, in [0, 1].
    pub min_weight: f64,
    /// Maximum portfolio weight, in [0, 1].
    pub max_weight: f64,
}

#[derive(Debug, Error)]
pub enum UniverseError {
    #[error("asset universe is empty")]
    Empty,

    #[error("duplicate asset id: {0}")]
    DuplicateAsset(AssetId),

    #[error("asset {id}: invalid weight bounds [{min}, {max}]")]
    InvalidBounds { id: AssetId, min: f64, max: f64 },

    #[error("asset {id}: volatility must be non-negative, got {volatility}")]
    NegativeVolatility { id: AssetId, volatility: f64 },

    #[error("class cap for {class:?} must lie in (0, 1], got {cap}")]
    InvalidClassCap { class: AssetClass, cap: f64 },
}

/// Ordered set of investable assets plus optional per-class caps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetUniverse {
    pub version: String,
    assets: Vec<AssetProfile>,
    /// Optional concentration caps: total weight per asset class.
    #[serde(default)]
    class_caps: BTreeMap<AssetClass, f64>,
}

impl AssetUniverse {
    pub fn new(
        version: impl Into<String>,
        assets: Vec<AssetProfile>,
        class_caps: BTreeMap<AssetClass, f64>,
    ) -> Self {
        Self {
            version: version.into(),
            assets,
            class_caps,
        }
    }

    /// Structural validation: non-empty, unique ids, sane bounds and caps.
    ///
    /// Feasibility of the bounds as a whole (e.g. max weights summing below
    /// 1) is the optimizer's concern, not a structural defect.
    pub fn validate(&self) -> Result<(), UniverseError> {
        if self.assets.is_empty() {
            return Err(UniverseError::Empty);
        }

        let mut seen = BTreeSet::new();
        for asset in &self.assets {
            if !seen.insert(asset.id.clone()) {
                return Err(UniverseError::DuplicateAsset(asset.id.clone()));
            }
            let bounds_ok = (0.0..=1.0).contains(&asset.min_weight)
                && (0.0..=1.0).contains(&asset.max_weight)
                && asset.min_weight <= asset.max_weight;
            if !bounds_ok {
                return Err(UniverseError::InvalidBounds {
                    id: asset.id.clone(),
                    min: asset.min_weight,
                    max: asset.max_weight,
                });
            }
            if asset.volatility < 0.0 {
                return Err(UniverseError::NegativeVolatility {
                    id: asset.id.clone(),
                    volatility: asset.volatility,
                });
            }
        }

        for (class, cap) in &self.class_caps {
            if !(*cap > 0.0 && *cap <= 1.0) {
                return Err(UniverseError::InvalidClassCap {
                    class: *class,
                    cap: *cap,
                });
            }
        }

        Ok(())
    }

    pub fn assets(&self) -> &[AssetProfile] {
        &self.assets
    }

    pub fn get(&self, id: &AssetId) -> Option<&AssetProfile> {
        self.assets.iter().find(|a| &a.id == id)
    }

    pub fn contains(&self, id: &AssetId) -> bool {
        self.get(id).is_some()
    }

    pub fn class_cap(&self, class: AssetClass) -> Option<f64> {
        self.class_caps.get(&class).copied()
    }

    pub fn class_caps(&self) -> &BTreeMap<AssetClass, f64> {
        &self.class_caps
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(id: &str, class: AssetClass, min: f64, max: f64) -> AssetProfile {
        AssetProfile {
            id: AssetId::from(id),
            name: id.to_string(),
            class,
            expected_return: 0.07,
            volatility: 0.15,
            min_weight: min,
            max_weight: max,
        }
    }

    #[test]
    fn validate_accepts_plain_universe() {
        let universe = AssetUniverse::new(
            "universe_v1",
            vec![
                asset("VTI", AssetClass::Equity, 0.0, 0.8),
                asset("BND", AssetClass::Bond, 0.0, 0.8),
            ],
            BTreeMap::new(),
        );
        assert!(universe.validate().is_ok());
    }

    #[test]
    fn validate_rejects_duplicates_and_bad_bounds() {
        let dup = AssetUniverse::new(
            "universe_v1",
            vec![
                asset("VTI", AssetClass::Equity, 0.0, 0.8),
                asset("VTI", AssetClass::Equity, 0.0, 0.8),
            ],
            BTreeMap::new(),
        );
        assert!(matches!(
            dup.validate(),
            Err(UniverseError::DuplicateAsset(_))
        ));

        let inverted = AssetUniverse::new(
            "universe_v1",
            vec![asset("GLD", AssetClass::Gold, 0.5, 0.2)],
            BTreeMap::new(),
        );
        assert!(matches!(
            inverted.validate(),
            Err(UniverseError::InvalidBounds { .. })
        ));
    }

    #[test]
    fn validate_rejects_zero_class_cap() {
        let mut caps = BTreeMap::new();
        caps.insert(AssetClass::Equity, 0.0);
        let universe = AssetUniverse::new(
            "universe_v1",
            vec![asset("VTI", AssetClass::Equity, 0.0, 1.0)],
            caps,
        );
        assert!(matches!(
            universe.validate(),
            Err(UniverseError::InvalidClassCap { .. })
        ));
    }
}
