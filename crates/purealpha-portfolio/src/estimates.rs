//! Regime-conditioned return and covariance estimates.
//!
//! Baseline per-asset estimates come from the universe configuration; the
//! regime outlook table scales them per asset class, and validated causal
//! effects shift the expected returns of their target assets. Non-validated
//! edges contribute exactly nothing.

use nalgebra::{DMatrix, DVector};
use tracing::debug;

use purealpha_models::{AssetClass, AssetId, AssetUniverse, CausalEffectEstimate, Regime, RegimeLabel};

/// Version tag of the outlook table.
pub const REGIME_OUTLOOK_VERSION: &str = "regime_outlook_v1";

/// Volatility floor applied to cash-like assets so the covariance matrix
/// stays positive definite.
const VOL_FLOOR: f64 = 1e-4;

/// Per-regime scaling of baseline class returns and volatilities.
#[derive(Debug, Clone, Copy)]
pub struct RegimeOutlook {
    pub label: RegimeLabel,
    pub equity_scale: f64,
    pub bond_scale: f64,
    pub gold_scale: f64,
    pub commodity_scale: f64,
    pub cash_scale: f64,
    pub vol_scale: f64,
}

impl RegimeOutlook {
    pub fn return_scale(&self, class: AssetClass) -> f64 {
        match class {
            AssetClass::Equity => self.equity_scale,
            AssetClass::Bond => self.bond_scale,
            AssetClass::Gold => self.gold_scale,
            AssetClass::Commodity => self.commodity_scale,
            AssetClass::Cash => self.cash_scale,
        }
    }
}

/// Outlook for a regime label, from the fixed versioned table.
pub fn outlook_for(label: RegimeLabel) -> RegimeOutlook {
    let (equity, bond, gold, commodity, cash, vol) = match label {
        RegimeLabel::Goldilocks => (1.2, 1.0, 0.8, 0.9, 1.0, 0.9),
        RegimeLabel::Recession => (0.4, 1.3, 1.1, 0.7, 1.0, 1.2),
        RegimeLabel::Crisis => (0.0, 1.1, 1.4, 0.6, 1.0, 1.6),
        RegimeLabel::Stagflation => (0.5, 0.7, 1.4, 1.5, 1.0, 1.25),
        RegimeLabel::MeltUp => (1.6, 0.8, 0.9, 1.1, 1.0, 1.3),
        RegimeLabel::Recovery => (1.1, 1.1, 0.9, 1.0, 1.0, 1.0),
        RegimeLabel::TaperTantrum => (0.6, 0.6, 1.1, 0.9, 1.1, 1.15),
        RegimeLabel::GeopoliticalShock => (0.5, 1.0, 1.5, 1.3, 1.0, 1.4),
        RegimeLabel::TechDisruption => (1.4, 0.9, 0.8, 0.8, 1.0, 1.05),
        RegimeLabel::Deglobalization => (0.8, 0.8, 1.2, 1.4, 1.0, 1.1),
    };
    RegimeOutlook {
        label,
        equity_scale: equity,
        bond_scale: bond,
        gold_scale: gold,
        commodity_scale: commodity,
        cash_scale: cash,
        vol_scale: vol,
    }
}

/// Pairwise correlation by asset-class block.
fn class_correlation(a: AssetClass, b: AssetClass) -> f64 {
    use AssetClass::*;
    if a == b {
        return match a {
            Equity => 0.85,
            Bond => 0.90,
            Gold => 1.0,
            Commodity => 0.70,
            Cash => 1.0,
        };
    }
    match (a.min(b), a.max(b)) {
        (Equity, Bond) => -0.20,
        (Equity, Gold) => 0.05,
        (Equity, Commodity) => 0.30,
        (Equity, Cash) => 0.0,
        (Bond, Gold) => 0.20,
        (Bond, Commodity) => -0.10,
        (Bond, Cash) => 0.0,
        (Gold, Commodity) => 0.35,
        (Gold, Cash) => 0.0,
        (Commodity, Cash) => 0.0,
        _ => 0.0,
    }
}

/// μ and Σ over the universe, in universe order.
#[derive(Debug, Clone)]
pub struct AssetEstimates {
    /// Asset ids, in universe order (the row/column order of μ and Σ).
    pub ids: Vec<AssetId>,
    pub mu: DVector<f64>,
    pub cov: DMatrix<f64>,
}

/// Build regime-conditioned estimates shifted by validated causal effects.
///
/// `causal_shift_scale` lets operators attenuate the causal channel
/// without editing the knowledge base (1.0 = take effects at face value).
pub fn build_estimates(
    universe: &AssetUniverse,
    regime: &Regime,
    effects: &[CausalEffectEstimate],
    causal_shift_scale: f64,
) -> AssetEstimates {
    let outlook = outlook_for(regime.label);
    let n = universe.len();

    let ids: Vec<AssetId> = universe.assets().iter().map(|a| a.id.clone()).collect();

    let mut mu = DVector::zeros(n);
    for (i, asset) in universe.assets().iter().enumerate() {
        let base = asset.expected_return * outlook.return_scale(asset.class);
        let shift: f64 = effects
            .iter()
            .filter(|e| e.validated && e.effect_asset == asset.id)
            .map(|e| e.effect * e.confidence)
            .sum();
        mu[i] = base + causal_shift_scale * shift;
    }

    let vols: Vec<f64> = universe
        .assets()
        .iter()
        .map(|a| (a.volatility * outlook.vol_scale).max(VOL_FLOOR))
        .collect();

    let mut cov = DMatrix::zeros(n, n);
    for i in 0..n {
        for j in 0..n {
            let rho = if i == j {
                1.0
            } else {
                class_correlation(universe.assets()[i].class, universe.assets()[j].class)
            };
            cov[(i, j)] = rho * vols[i] * vols[j];
        }
    }

    debug!(
        regime = %regime.label,
        assets = n,
        outlook_version = REGIME_OUTLOOK_VERSION,
        "built asset estimates"
    );

    AssetEstimates { ids, mu, cov }
}
