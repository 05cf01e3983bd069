//! # PureAlpha Models
//!
//! Platform-wide canonical data model for the causal-regime portfolio
//! engine. Every type here is immutable once produced and serializes
//! deterministically (ordered maps only), so downstream content hashing
//! and replay stay bit-for-bit reproducible.
//!
//! ## Type Groups
//! - `feature` - Feature ids, observations with explicit missing markers,
//!   snapshots, and the versioned feature catalog
//! - `regime` - The closed 10-label regime table, regime records, LSI
//! - `causal` - Causal hypotheses (supplied config) and effect estimates
//! - `universe` - Investable asset universe with per-asset constraints
//! - `portfolio` - Allocations and derived risk metrics
//! - `rationale` - Ranked, human-readable allocation rationale

pub mod causal;
pub mod feature;
pub mod portfolio;
pub mod rationale;
pub mod regime;
pub mod universe;

pub use causal::{
    CausalEffectEstimate, CausalHypothesis, Confounder, EstimateDisposition, HypothesisId,
};
pub use feature::{
    FeatureCatalog, FeatureId, FeatureObservation, FeatureSnapshot, FeatureValue, SourceTag,
};
pub use portfolio::{PortfolioAllocation, ReturnScenarios, RiskLevel, RiskMetrics};
pub use rationale::{Rationale, RationaleEntry};
pub use regime::{Lsi, LsiComponents, LsiStatus, Regime, RegimeLabel};
pub use universe::{AssetClass, AssetId, AssetProfile, AssetUniverse, UniverseError};
