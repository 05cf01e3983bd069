//! End-to-end analysis pipeline.
//!
//! Snapshot → regime → causal screen → optimization → rationale →
//! provenance commit. Each stage is a pure function over immutable inputs;
//! the only shared mutable state is the ledger's chain, which serializes
//! its own commits. Previous-regime state is threaded explicitly by the
//! caller, never held in a process-wide singleton.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use purealpha_causal::{CausalValidator, CausalValidatorConfig};
use purealpha_ledger::{CommitPayload, LedgerError, ProvenanceLedger, ProvenanceRecord};
use purealpha_models::{
    AssetId, CausalEffectEstimate, Lsi, PortfolioAllocation, Rationale, Regime, RegimeLabel,
    RiskLevel, RiskMetrics,
};
use purealpha_portfolio::{OptimizerConfig, PortfolioOptimizer};
use purealpha_regime::{RegimeDetector, RegimeDetectorConfig};

use crate::config::ConfigStore;
use crate::error::{AnalysisFailure, EngineError};
use crate::explain::build_rationale;
use crate::provider::SnapshotProvider;

/// One analysis request.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisQuery {
    /// Investment capital in USD.
    pub capital: f64,
    /// Investment horizon in years.
    pub horizon_years: u32,
    pub risk_level: RiskLevel,
}

impl AnalysisQuery {
    /// Caller-input bounds: $1..=$10M capital, 1..=30 year horizon.
    pub fn validate(&self) -> Result<(), EngineError> {
        if !(self.capital > 0.0 && self.capital <= 10_000_000.0) {
            return Err(EngineError::Configuration(format!(
                "capital must lie in (0, 10000000], got {}",
                self.capital
            )));
        }
        if !(1..=30).contains(&self.horizon_years) {
            return Err(EngineError::Configuration(format!(
                "horizon must lie in [1, 30] years, got {}",
                self.horizon_years
            )));
        }
        Ok(())
    }
}

/// Regime section of the report.
#[derive(Debug, Clone, Serialize)]
pub struct RegimeSummary {
    pub label: RegimeLabel,
    pub confidence: f64,
    pub description: String,
    pub lsi: Lsi,
    pub hysteresis_hold: bool,
}

/// A fully populated analysis result. Never partially constructed: any
/// stage failure aborts the whole request.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub query_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub regime: RegimeSummary,
    /// Full regime record as committed to the ledger. Auditors need it
    /// (with the snapshot and the fields below) to re-derive the receipt's
    /// content hash.
    pub regime_record: Regime,
    /// Portfolio weights (sum to 1).
    pub weights: PortfolioAllocation,
    /// Dollar allocation scaled to the requested capital.
    pub allocation: BTreeMap<AssetId, f64>,
    pub metrics: RiskMetrics,
    /// Full causal audit: one estimate per configured hypothesis.
    pub causal_estimates: Vec<CausalEffectEstimate>,
    pub rationale: Rationale,
    /// Provenance receipt for external verification.
    pub receipt: ProvenanceRecord,
    pub warnings: Vec<String>,
}

/// The causal-regime portfolio engine.
pub struct AnalysisEngine<P: SnapshotProvider> {
    provider: P,
    store: ConfigStore,
    detector: RegimeDetector,
    validator: CausalValidator,
    optimizer: PortfolioOptimizer,
    ledger: ProvenanceLedger,
}

impl<P: SnapshotProvider> AnalysisEngine<P> {
    pub fn new(provider: P, store: ConfigStore, ledger: ProvenanceLedger) -> Self {
        Self {
            provider,
            store,
            detector: RegimeDetector::new(RegimeDetectorConfig::default()),
            validator: CausalValidator::default(),
            optimizer: PortfolioOptimizer::default(),
            ledger,
        }
    }

    pub fn with_detector_config(mut self, config: RegimeDetectorConfig) -> Self {
        self.detector = RegimeDetector::new(config);
        self
    }

    pub fn with_validator_config(mut self, config: CausalValidatorConfig) -> Self {
        self.validator = CausalValidator::new(config);
        self
    }

    pub fn with_optimizer_config(mut self, config: OptimizerConfig) -> Self {
        self.optimizer = PortfolioOptimizer::new(config);
        self
    }

    pub fn ledger(&self) -> &ProvenanceLedger {
        &self.ledger
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    /// Run one analysis. `previous_regime` is the caller's last accepted
    /// regime record, threaded explicitly for hysteresis.
    pub fn analyze(
        &self,
        query: &AnalysisQuery,
        previous_regime: Option<&Regime>,
    ) -> Result<AnalysisReport, EngineError> {
        query.validate()?;
        let query_id = Uuid::new_v4();
        info!(
            %query_id,
            capital = query.capital,
            risk_level = query.risk_level.as_str(),
            "analysis started"
        );

        let snapshot = self.provider.latest()?;
        let regime = self.detector.detect(&snapshot, previous_regime)?;
        let estimates = self.validator.validate(
            &snapshot,
            &regime,
            &self.store.hypotheses,
            &self.store.catalog,
            &self.store.universe,
        )?;
        let (weights, metrics) =
            self.optimizer
                .optimize(&self.store.universe, &estimates, &regime, query.risk_level)?;
        let rationale = build_rationale(&weights, &metrics, &estimates, &regime, &self.store, query);

        let payload = CommitPayload {
            snapshot: &snapshot,
            regime: &regime,
            effects: &estimates,
            allocation: &weights,
            rationale: &rationale,
        };
        let receipt = self.commit_with_retry(&payload)?;

        let warnings = collect_warnings(&regime);
        let description = self
            .detector
            .rules()
            .iter()
            .find(|r| r.label == regime.label)
            .map(|r| r.description.clone())
            .unwrap_or_default();

        let report = AnalysisReport {
            query_id,
            generated_at: Utc::now(),
            regime: RegimeSummary {
                label: regime.label,
                confidence: regime.confidence,
                description,
                lsi: regime.lsi,
                hysteresis_hold: regime.hysteresis_hold,
            },
            regime_record: regime,
            allocation: weights.scaled_to(query.capital),
            weights,
            metrics,
            causal_estimates: estimates,
            rationale,
            receipt,
            warnings,
        };

        info!(%query_id, sequence = report.receipt.sequence, "analysis complete");
        Ok(report)
    }

    /// Pipeline boundary: fold any stage error into the structured failure
    /// result. No partial report ever escapes.
    pub fn run(
        &self,
        query: &AnalysisQuery,
        previous_regime: Option<&Regime>,
    ) -> Result<AnalysisReport, AnalysisFailure> {
        self.analyze(query, previous_regime).map_err(|err| {
            match &err {
                EngineError::Configuration(detail) => {
                    error!(detail = detail.as_str(), "analysis failed on configuration")
                }
                other => warn!(error = %other, "analysis failed"),
            }
            err.into_failure()
        })
    }

    /// Commit under compare-and-swap; one internal retry on contention.
    fn commit_with_retry(
        &self,
        payload: &CommitPayload<'_>,
    ) -> Result<ProvenanceRecord, EngineError> {
        let head = self.ledger.head();
        match self.ledger.commit_at_head(payload, &head) {
            Ok(record) => Ok(record),
            Err(LedgerError::ChainIntegrity { .. }) => {
                warn!("ledger head moved during commit; retrying once");
                let fresh = self.ledger.head();
                Ok(self.ledger.commit_at_head(payload, &fresh)?)
            }
            Err(other) => Err(other.into()),
        }
    }
}

fn collect_warnings(regime: &Regime) -> Vec<String> {
    let mut warnings = Vec::new();
    if regime.lsi.score > 75.0 {
        warnings.push("Critical liquidity stress detected (LSI > 75)".to_string());
    } else if regime.lsi.score > 50.0 {
        warnings.push("Severe liquidity stress detected (LSI > 50)".to_string());
    }
    if regime.confidence < 0.5 {
        warnings.push("Low regime confidence - market transition possible".to_string());
    }
    if regime.hysteresis_hold {
        warnings.push("Regime held by hysteresis; raw top score differed".to_string());
    }
    warnings
}
