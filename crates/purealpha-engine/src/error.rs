//! Pipeline error taxonomy and the structured failure boundary.
//!
//! Every component error is folded into one of four kinds. The boundary
//! never returns a partial result: a failure carries its kind, a
//! user-facing message, and the operator-facing detail.

use serde::Serialize;
use thiserror::Error;

use purealpha_causal::CausalError;
use purealpha_ledger::LedgerError;
use purealpha_portfolio::OptimizerError;
use purealpha_regime::RegimeError;

use crate::provider::ProviderError;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Too much of the input is missing to classify or estimate.
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    /// Malformed hypothesis/universe/catalog configuration. Indicates a
    /// deployment defect; fatal for the request and logged loudly.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// No allocation satisfies the constraints, even after relaxation.
    #[error("infeasible portfolio: {0}")]
    InfeasiblePortfolio(String),

    /// Ledger contention or persistence failure.
    #[error("ledger failure: {0}")]
    ChainIntegrity(String),
}

impl EngineError {
    pub fn kind(&self) -> FailureKind {
        match self {
            EngineError::InsufficientData(_) => FailureKind::InsufficientData,
            EngineError::Configuration(_) => FailureKind::Configuration,
            EngineError::InfeasiblePortfolio(_) => FailureKind::InfeasiblePortfolio,
            EngineError::ChainIntegrity(_) => FailureKind::ChainIntegrity,
        }
    }

    /// The message shown to end users; the raw detail stays operator-side.
    pub fn user_message(&self) -> &'static str {
        match self {
            EngineError::InsufficientData(_) => {
                "Market data is currently incomplete. Try again later or check the data feed."
            }
            EngineError::Configuration(_) => {
                "The analysis configuration is invalid. This is a deployment defect; contact the operator."
            }
            EngineError::InfeasiblePortfolio(_) => {
                "No allocation satisfies the current constraints. Consider loosening the risk level."
            }
            EngineError::ChainIntegrity(_) => {
                "The audit ledger was briefly contended. Please retry the request."
            }
        }
    }

    pub fn into_failure(self) -> AnalysisFailure {
        AnalysisFailure {
            kind: self.kind(),
            message: self.user_message().to_string(),
            detail: self.to_string(),
        }
    }
}

impl From<RegimeError> for EngineError {
    fn from(err: RegimeError) -> Self {
        EngineError::InsufficientData(err.to_string())
    }
}

impl From<ProviderError> for EngineError {
    fn from(err: ProviderError) -> Self {
        EngineError::InsufficientData(err.to_string())
    }
}

impl From<CausalError> for EngineError {
    fn from(err: CausalError) -> Self {
        EngineError::Configuration(err.to_string())
    }
}

impl From<OptimizerError> for EngineError {
    fn from(err: OptimizerError) -> Self {
        match err {
            OptimizerError::Infeasible { .. } => EngineError::InfeasiblePortfolio(err.to_string()),
            OptimizerError::Configuration(msg) => EngineError::Configuration(msg),
        }
    }
}

impl From<LedgerError> for EngineError {
    fn from(err: LedgerError) -> Self {
        EngineError::ChainIntegrity(err.to_string())
    }
}

/// The four failure kinds exposed at the pipeline boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureKind {
    InsufficientData,
    Configuration,
    InfeasiblePortfolio,
    ChainIntegrity,
}

/// Structured failure result; the only alternative to a fully populated
/// report.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisFailure {
    pub kind: FailureKind,
    /// User-facing guidance.
    pub message: String,
    /// Operator-facing detail.
    pub detail: String,
}

impl std::fmt::Display for AnalysisFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {} ({})", self.kind, self.message, self.detail)
    }
}
