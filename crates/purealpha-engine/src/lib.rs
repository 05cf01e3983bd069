//! # PureAlpha Engine
//!
//! The causal-regime portfolio pipeline: turns a feature snapshot into a
//! validated, explainable, provenance-committed allocation.
//!
//! ## Stages
//! 1. Snapshot from the [`provider::SnapshotProvider`] collaborator
//! 2. Regime classification with hysteresis (`purealpha-regime`)
//! 3. Causal hypothesis screening (`purealpha-causal`)
//! 4. CVaR-constrained optimization (`purealpha-portfolio`)
//! 5. Rationale construction ([`explain`])
//! 6. Provenance commit (`purealpha-ledger`)
//!
//! Failures surface as one of four structured kinds at the boundary;
//! success is always a fully populated [`pipeline::AnalysisReport`].

pub mod config;
pub mod error;
pub mod explain;
pub mod pipeline;
pub mod provider;

pub use config::ConfigStore;
pub use error::{AnalysisFailure, EngineError, FailureKind};
pub use explain::build_rationale;
pub use pipeline::{AnalysisEngine, AnalysisQuery, AnalysisReport, RegimeSummary};
pub use provider::{ProviderError, SnapshotProvider, StaticSnapshotProvider};
