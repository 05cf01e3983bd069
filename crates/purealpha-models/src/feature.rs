//! Feature snapshot types with explicit missing-value tracking.
//!
//! Distinguishes "feed sent a value", "feed explicitly reported missing",
//! and "feature absent from the snapshot entirely". A missing feature is
//! never a silent zero: every consumer must decide what absence means for
//! it (skip, penalize, or fail).

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a single indicator (e.g. `gdp_growth`, `vix`,
/// `btc_exchange_netflow`). Ids are opaque strings validated against the
/// versioned [`FeatureCatalog`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureId(String);

impl FeatureId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FeatureId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Origin class of a feature, carried for audit and staleness policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceTag {
    Macro,
    Market,
    OnChain,
    Sentiment,
}

/// A feature value or an explicit missing marker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum FeatureValue {
    /// Feed delivered a numeric value.
    Present(f64),
    /// Feed explicitly reported the feature as unavailable.
    Missing,
}

impl FeatureValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FeatureValue::Present(v) => Some(*v),
            FeatureValue::Missing => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, FeatureValue::Missing)
    }
}

/// One observed indicator: value plus freshness and provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureObservation {
    pub value: FeatureValue,
    /// Freshness timestamp of the underlying observation.
    pub as_of: DateTime<Utc>,
    pub source: SourceTag,
}

impl FeatureObservation {
    pub fn present(value: f64, as_of: DateTime<Utc>, source: SourceTag) -> Self {
        Self {
            value: FeatureValue::Present(value),
            as_of,
            source,
        }
    }

    pub fn missing(as_of: DateTime<Utc>, source: SourceTag) -> Self {
        Self {
            value: FeatureValue::Missing,
            as_of,
            source,
        }
    }
}

/// Typed bundle of the latest indicator values for one analysis request.
///
/// The map is ordered (`BTreeMap`) so serialization is canonical and the
/// snapshot can participate in content hashing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSnapshot {
    /// Snapshot timestamp (the analysis "as of" time).
    pub as_of: DateTime<Utc>,
    /// Version of the feature catalog this snapshot was built against.
    pub catalog_version: String,
    features: BTreeMap<FeatureId, FeatureObservation>,
}

impl FeatureSnapshot {
    pub fn new(as_of: DateTime<Utc>, catalog_version: impl Into<String>) -> Self {
        Self {
            as_of,
            catalog_version: catalog_version.into(),
            features: BTreeMap::new(),
        }
    }

    /// Insert an observation, replacing any prior one for the same id.
    pub fn insert(&mut self, id: FeatureId, obs: FeatureObservation) {
        self.features.insert(id, obs);
    }

    pub fn get(&self, id: &FeatureId) -> Option<&FeatureObservation> {
        self.features.get(id)
    }

    /// Numeric value of a feature, `None` when absent or explicitly missing.
    pub fn value_of(&self, id: &FeatureId) -> Option<f64> {
        self.features.get(id).and_then(|obs| obs.value.as_f64())
    }

    /// True when the feature is absent from the snapshot or carries an
    /// explicit missing marker.
    pub fn is_unavailable(&self, id: &FeatureId) -> bool {
        self.value_of(id).is_none()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FeatureId, &FeatureObservation)> {
        self.features.iter()
    }

    /// Fraction of `required` ids that are unavailable in this snapshot.
    /// Returns 0.0 for an empty requirement set.
    pub fn missing_fraction(&self, required: &BTreeSet<FeatureId>) -> f64 {
        if required.is_empty() {
            return 0.0;
        }
        let missing = required
            .iter()
            .filter(|id| self.is_unavailable(id))
            .count();
        missing as f64 / required.len() as f64
    }
}

/// Versioned closed set of known feature ids.
///
/// Every feature id referenced by a regime rule or causal hypothesis must
/// resolve against the catalog; a dangling reference is a configuration
/// defect, not a data gap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCatalog {
    pub version: String,
    entries: BTreeSet<FeatureId>,
}

impl FeatureCatalog {
    pub fn new(version: impl Into<String>, entries: impl IntoIterator<Item = FeatureId>) -> Self {
        Self {
            version: version.into(),
            entries: entries.into_iter().collect(),
        }
    }

    pub fn resolves(&self, id: &FeatureId) -> bool {
        self.entries.contains(id)
    }

    /// Ids from `ids` that do not resolve against the catalog.
    pub fn unresolved<'a>(&self, ids: impl Iterator<Item = &'a FeatureId>) -> Vec<FeatureId> {
        ids.filter(|id| !self.resolves(id)).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
