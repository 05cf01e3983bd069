//! Portfolio allocations and derived risk metrics.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::universe::AssetId;

/// Weight-sum tolerance for a valid allocation.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Risk tolerance preset selected by the caller. Maps to a CVaR budget and
/// a volatility cap in the optimizer configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
        }
    }
}

/// Long-only portfolio weights summing to 1 within tolerance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioAllocation {
    weights: BTreeMap<AssetId, f64>,
}

impl PortfolioAllocation {
    pub fn new(weights: BTreeMap<AssetId, f64>) -> Self {
        Self { weights }
    }

    pub fn weight(&self, id: &AssetId) -> f64 {
        self.weights.get(id).copied().unwrap_or(0.0)
    }

    pub fn weights(&self) -> &BTreeMap<AssetId, f64> {
        &self.weights
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AssetId, f64)> {
        self.weights.iter().map(|(id, w)| (id, *w))
    }

    pub fn sum(&self) -> f64 {
        self.weights.values().sum()
    }

    /// Weights non-negative and summing to 1 within tolerance.
    pub fn is_normalized(&self) -> bool {
        self.weights.values().all(|w| *w >= -WEIGHT_SUM_TOLERANCE)
            && (self.sum() - 1.0).abs() <= WEIGHT_SUM_TOLERANCE
    }

    /// Assets with a strictly positive weight, in id order.
    pub fn held_assets(&self) -> Vec<&AssetId> {
        self.weights
            .iter()
            .filter(|(_, w)| **w > 0.0)
            .map(|(id, _)| id)
            .collect()
    }

    /// Scale weights to dollar amounts summing exactly to `capital` (cents
    /// precision). Rounding remainder lands on the largest position so the
    /// total always reconciles.
    pub fn scaled_to(&self, capital: f64) -> BTreeMap<AssetId, f64> {
        let mut dollars: BTreeMap<AssetId, f64> = self
            .weights
            .iter()
            .map(|(id, w)| (id.clone(), round_cents(w * capital)))
            .collect();

        let allocated: f64 = dollars.values().sum();
        let remainder = round_cents(capital - allocated);
        if remainder != 0.0 {
            if let Some(largest) = self
                .weights
                .iter()
                .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
                .map(|(id, _)| id.clone())
            {
                if let Some(v) = dollars.get_mut(&largest) {
                    *v = round_cents(*v + remainder);
                }
            }
        }

        dollars
    }
}

fn round_cents(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// One-year return scenarios at fixed percentiles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReturnScenarios {
    /// ~95th percentile outcome.
    pub best_case: f64,
    /// Median outcome.
    pub base_case: f64,
    /// ~5th percentile outcome.
    pub worst_case: f64,
}

/// Derived risk metrics, recomputed from realized weights whenever the
/// allocation changes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskMetrics {
    /// Annualized expected portfolio return.
    pub expected_return: f64,
    /// Annualized portfolio volatility.
    pub volatility: f64,
    /// Conditional Value-at-Risk of the one-year return, as a positive loss
    /// magnitude, at `cvar_confidence`.
    pub cvar: f64,
    /// Tail confidence level the CVaR was computed at (e.g. 0.95).
    pub cvar_confidence: f64,
    pub sharpe_ratio: f64,
    pub scenarios: ReturnScenarios,
}
