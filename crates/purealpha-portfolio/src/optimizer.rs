//! CVaR-constrained long-only allocation.
//!
//! Maximizes expected return subject to a CVaR budget, a volatility cap,
//! per-asset weight bounds, class concentration caps, and full investment.
//! The feasible set is convex and both risk constraints are convex in the
//! weights, so the solve walks the segment between the minimum-variance
//! point and the maximum-return vertex: every convex combination respects
//! bounds and caps, and feasibility along the segment is monotone, which
//! makes a bisection on the blend exact.
//!
//! When the budget is unreachable the optimizer relaxes it by a bounded
//! multiplicative step a fixed number of times, then fails with the reason
//! attached; callers always receive a diagnosable failure.

use nalgebra::{DMatrix, DVector};
use thiserror::Error;
use tracing::{debug, info, warn};

use purealpha_models::{
    AssetClass, AssetUniverse, CausalEffectEstimate, PortfolioAllocation, Regime, ReturnScenarios,
    RiskLevel, RiskMetrics,
};

use crate::estimates::{build_estimates, AssetEstimates};
use crate::gaussian::cvar_gaussian;

const SUM_EPS: f64 = 1e-9;

#[derive(Debug, Error)]
pub enum OptimizerError {
    #[error("no feasible portfolio after {attempts} attempts: {reason}")]
    Infeasible { attempts: u32, reason: String },

    #[error("invalid universe configuration: {0}")]
    Configuration(String),
}

/// Risk budget for one risk level.
#[derive(Debug, Clone, Copy)]
pub struct RiskBudget {
    /// Maximum CVaR (positive loss magnitude) at the configured confidence.
    pub cvar_budget: f64,
    /// Maximum annualized portfolio volatility. Never relaxed.
    pub vol_cap: f64,
}

/// Operator-tunable optimizer settings.
#[derive(Debug, Clone)]
pub struct OptimizerConfig {
    /// Tail confidence level for the CVaR constraint and reported metrics.
    pub cvar_confidence: f64,
    pub low: RiskBudget,
    pub medium: RiskBudget,
    pub high: RiskBudget,
    /// Multiplicative CVaR-budget relaxation per retry.
    pub relaxation_step: f64,
    /// Retries after the initial attempt.
    pub max_relaxations: u32,
    pub risk_free_rate: f64,
    /// Attenuation of the validated causal return shifts (1.0 = at face value).
    pub causal_shift_scale: f64,
    /// Fixed projected-gradient iteration count for the min-variance point.
    pub min_variance_iterations: usize,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            cvar_confidence: 0.95,
            low: RiskBudget {
                cvar_budget: 0.12,
                vol_cap: 0.10,
            },
            medium: RiskBudget {
                cvar_budget: 0.20,
                vol_cap: 0.16,
            },
            high: RiskBudget {
                cvar_budget: 0.35,
                vol_cap: 0.25,
            },
            relaxation_step: 0.25,
            max_relaxations: 3,
            risk_free_rate: 0.045,
            causal_shift_scale: 1.0,
            min_variance_iterations: 300,
        }
    }
}

impl OptimizerConfig {
    pub fn budget_for(&self, level: RiskLevel) -> RiskBudget {
        match level {
            RiskLevel::Low => self.low,
            RiskLevel::Medium => self.medium,
            RiskLevel::High => self.high,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PortfolioOptimizer {
    config: OptimizerConfig,
}

impl PortfolioOptimizer {
    pub fn new(config: OptimizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Solve the allocation for the given regime, validated causal effects,
    /// and risk level.
    pub fn optimize(
        &self,
        universe: &AssetUniverse,
        effects: &[CausalEffectEstimate],
        regime: &Regime,
        risk_level: RiskLevel,
    ) -> Result<(PortfolioAllocation, RiskMetrics), OptimizerError> {
        universe
            .validate()
            .map_err(|e| OptimizerError::Configuration(e.to_string()))?;

        let est = build_estimates(universe, regime, effects, self.config.causal_shift_scale);
        let budget = self.config.budget_for(risk_level);

        let mut last_reason = String::new();
        for attempt in 0..=self.config.max_relaxations {
            let relaxed_cvar =
                budget.cvar_budget * (1.0 + self.config.relaxation_step).powi(attempt as i32);
            match self.solve(universe, &est, relaxed_cvar, budget.vol_cap) {
                Ok(weights) => {
                    if attempt > 0 {
                        warn!(
                            attempt,
                            relaxed_cvar = format!("{relaxed_cvar:.4}").as_str(),
                            "allocation found under relaxed CVaR budget"
                        );
                    }
                    let (allocation, metrics) = self.finish(&est, weights);
                    info!(
                        risk_level = risk_level.as_str(),
                        expected_return = format!("{:.4}", metrics.expected_return).as_str(),
                        volatility = format!("{:.4}", metrics.volatility).as_str(),
                        cvar = format!("{:.4}", metrics.cvar).as_str(),
                        "portfolio optimized"
                    );
                    return Ok((allocation, metrics));
                }
                Err(reason) => {
                    debug!(attempt, reason = reason.as_str(), "solve attempt infeasible");
                    last_reason = reason;
                }
            }
        }

        Err(OptimizerError::Infeasible {
            attempts: self.config.max_relaxations + 1,
            reason: last_reason,
        })
    }

    /// One solve attempt at a fixed CVaR budget. Returns an internal
    /// infeasibility reason on failure.
    fn solve(
        &self,
        universe: &AssetUniverse,
        est: &AssetEstimates,
        cvar_budget: f64,
        vol_cap: f64,
    ) -> Result<DVector<f64>, String> {
        let lo: Vec<f64> = universe.assets().iter().map(|a| a.min_weight).collect();
        let hi: Vec<f64> = universe.assets().iter().map(|a| a.max_weight).collect();

        let lo_sum: f64 = lo.iter().sum();
        let hi_sum: f64 = hi.iter().sum();
        if lo_sum > 1.0 + SUM_EPS {
            return Err(format!(
                "asset weight bounds cannot sum to 1: minimum weights total {lo_sum:.4}"
            ));
        }
        if hi_sum < 1.0 - SUM_EPS {
            return Err(format!(
                "asset weight bounds cannot sum to 1: maximum weights total {hi_sum:.4}"
            ));
        }
        self.check_cap_capacity(universe, &lo, &hi)?;

        let w_max = self.max_return_vertex(universe, est, &lo, &hi)?;
        let w_min = self.min_variance_point(universe, est, &lo, &hi);

        let alpha = self.config.cvar_confidence;
        let min_vol = portfolio_vol(&w_min, &est.cov);
        if min_vol > vol_cap + SUM_EPS {
            return Err(format!(
                "volatility cap unreachable: minimum-variance portfolio vol {min_vol:.4} exceeds cap {vol_cap:.4}"
            ));
        }
        let min_cvar = cvar_gaussian(est.mu.dot(&w_min), min_vol, alpha);
        if min_cvar > cvar_budget + SUM_EPS {
            return Err(format!(
                "CVaR budget unreachable: minimum-risk CVaR {min_cvar:.4} exceeds budget {cvar_budget:.4}"
            ));
        }

        // Both endpoints satisfy bounds and caps; any blend does too, so the
        // bisection only has to watch the two risk constraints.
        let risk_ok = |w: &DVector<f64>| {
            let vol = portfolio_vol(w, &est.cov);
            vol <= vol_cap + SUM_EPS
                && cvar_gaussian(est.mu.dot(w), vol, alpha) <= cvar_budget + SUM_EPS
        };

        if risk_ok(&w_max) {
            return Ok(w_max);
        }

        let mut feasible = 0.0f64;
        let mut infeasible = 1.0f64;
        for _ in 0..60 {
            let mid = 0.5 * (feasible + infeasible);
            let w = &w_min * (1.0 - mid) + &w_max * mid;
            if risk_ok(&w) {
                feasible = mid;
            } else {
                infeasible = mid;
            }
        }

        Ok(&w_min * (1.0 - feasible) + &w_max * feasible)
    }

    /// Caps must leave room for a fully invested portfolio.
    fn check_cap_capacity(
        &self,
        universe: &AssetUniverse,
        lo: &[f64],
        hi: &[f64],
    ) -> Result<(), String> {
        let mut capacity = 0.0;
        for class in [
            AssetClass::Equity,
            AssetClass::Bond,
            AssetClass::Gold,
            AssetClass::Commodity,
            AssetClass::Cash,
        ] {
            let class_hi: f64 = universe
                .assets()
                .iter()
                .zip(hi)
                .filter(|(a, _)| a.class == class)
                .map(|(_, h)| *h)
                .sum();
            let class_lo: f64 = universe
                .assets()
                .iter()
                .zip(lo)
                .filter(|(a, _)| a.class == class)
                .map(|(_, l)| *l)
                .sum();
            match universe.class_cap(class) {
                Some(cap) => {
                    if class_lo > cap + SUM_EPS {
                        return Err(format!(
                            "class cap for {class:?} ({cap:.2}) is below the class minimum weights ({class_lo:.2})"
                        ));
                    }
                    capacity += cap.min(class_hi);
                }
                None => capacity += class_hi,
            }
        }
        if capacity < 1.0 - SUM_EPS {
            return Err(format!(
                "class concentration caps leave only {capacity:.4} of investable capacity"
            ));
        }
        Ok(())
    }

    /// Greedy maximum-expected-return vertex: fill from the highest-μ asset
    /// down, respecting per-asset headroom and class caps. Deterministic
    /// tie-break by asset id.
    fn max_return_vertex(
        &self,
        universe: &AssetUniverse,
        est: &AssetEstimates,
        lo: &[f64],
        hi: &[f64],
    ) -> Result<DVector<f64>, String> {
        let n = universe.len();
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| {
            est.mu[b]
                .partial_cmp(&est.mu[a])
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| est.ids[a].cmp(&est.ids[b]))
        });

        let mut w = DVector::from_column_slice(lo);
        let mut class_used: Vec<(AssetClass, f64)> = Vec::new();
        for (i, asset) in universe.assets().iter().enumerate() {
            bump_class(&mut class_used, asset.class, w[i]);
        }

        let mut remaining = 1.0 - w.sum();
        for &i in &order {
            if remaining <= SUM_EPS {
                break;
            }
            let class = universe.assets()[i].class;
            let class_headroom = match universe.class_cap(class) {
                Some(cap) => (cap - class_weight(&class_used, class)).max(0.0),
                None => f64::INFINITY,
            };
            let add = (hi[i] - lo[i]).min(class_headroom).min(remaining);
            if add > 0.0 {
                w[i] += add;
                remaining -= add;
                bump_class(&mut class_used, class, add);
            }
        }

        if remaining > SUM_EPS {
            return Err(format!(
                "bounds and class caps leave {remaining:.4} of capital unallocatable"
            ));
        }
        Ok(w)
    }

    /// Minimum-variance point via fixed-step projected gradient descent,
    /// then class-cap repair. Iteration count and step are fixed, so the
    /// result is deterministic.
    fn min_variance_point(
        &self,
        universe: &AssetUniverse,
        est: &AssetEstimates,
        lo: &[f64],
        hi: &[f64],
    ) -> DVector<f64> {
        let n = universe.len();
        let start = DVector::from_element(n, 1.0 / n as f64);
        let mut w = project_box_simplex(&start, lo, hi);

        // Step from the Lipschitz bound of ∇(wᵀΣw) = 2Σw.
        let row_bound = (0..n)
            .map(|i| (0..n).map(|j| est.cov[(i, j)].abs()).sum::<f64>())
            .fold(0.0f64, f64::max);
        let step = if row_bound > 0.0 { 0.5 / row_bound } else { 0.1 };

        for _ in 0..self.config.min_variance_iterations {
            let grad = &est.cov * &w * 2.0;
            let candidate = &w - grad * step;
            w = project_box_simplex(&candidate, lo, hi);
        }

        self.repair_class_caps(universe, w, lo, hi)
    }

    /// Push class totals back under their caps, moving excess to assets
    /// with headroom. Weight sum is conserved. If caps cannot be satisfied
    /// the result simply fails the later feasibility checks.
    fn repair_class_caps(
        &self,
        universe: &AssetUniverse,
        mut w: DVector<f64>,
        lo: &[f64],
        hi: &[f64],
    ) -> DVector<f64> {
        if universe.class_caps().is_empty() {
            return w;
        }

        for _ in 0..16 {
            let mut violated: Option<(AssetClass, f64)> = None;
            for (class, cap) in universe.class_caps() {
                let total: f64 = universe
                    .assets()
                    .iter()
                    .enumerate()
                    .filter(|(_, a)| a.class == *class)
                    .map(|(i, _)| w[i])
                    .sum();
                if total > *cap + 1e-12 {
                    violated = Some((*class, total - *cap));
                    break;
                }
            }
            let Some((class, excess)) = violated else {
                break;
            };

            let reducible: f64 = universe
                .assets()
                .iter()
                .enumerate()
                .filter(|(i, a)| a.class == class && w[*i] > lo[*i])
                .map(|(i, _)| w[i] - lo[i])
                .sum();
            if reducible <= 0.0 {
                break;
            }
            let take = excess.min(reducible);
            for (i, asset) in universe.assets().iter().enumerate() {
                if asset.class == class && w[i] > lo[i] {
                    w[i] -= take * (w[i] - lo[i]) / reducible;
                }
            }

            let receivable: f64 = universe
                .assets()
                .iter()
                .enumerate()
                .filter(|(i, a)| a.class != class && w[*i] < hi[*i])
                .map(|(i, _)| hi[i] - w[i])
                .sum();
            if receivable <= 0.0 {
                break;
            }
            let give = take.min(receivable);
            for (i, asset) in universe.assets().iter().enumerate() {
                if asset.class != class && w[i] < hi[i] {
                    w[i] += give * (hi[i] - w[i]) / receivable;
                }
            }
        }

        w
    }

    /// Final cleanup, allocation record, and metrics from realized weights.
    fn finish(
        &self,
        est: &AssetEstimates,
        mut w: DVector<f64>,
    ) -> (PortfolioAllocation, RiskMetrics) {
        for v in w.iter_mut() {
            if *v < 0.0 && *v > -1e-9 {
                *v = 0.0;
            }
        }
        let sum = w.sum();
        if sum > 0.0 {
            w /= sum;
        }

        let weights = est
            .ids
            .iter()
            .cloned()
            .zip(w.iter().copied())
            .collect();
        let allocation = PortfolioAllocation::new(weights);

        let mu_p = est.mu.dot(&w);
        let vol = portfolio_vol(&w, &est.cov);
        let cvar = cvar_gaussian(mu_p, vol, self.config.cvar_confidence);
        let sharpe = if vol > 0.0 {
            (mu_p - self.config.risk_free_rate) / vol
        } else {
            0.0
        };
        let metrics = RiskMetrics {
            expected_return: mu_p,
            volatility: vol,
            cvar,
            cvar_confidence: self.config.cvar_confidence,
            sharpe_ratio: sharpe,
            scenarios: ReturnScenarios {
                best_case: mu_p + 2.0 * vol,
                base_case: mu_p,
                worst_case: mu_p - 2.0 * vol,
            },
        };

        (allocation, metrics)
    }
}

fn portfolio_vol(w: &DVector<f64>, cov: &DMatrix<f64>) -> f64 {
    let var = (cov * w).dot(w);
    var.max(0.0).sqrt()
}

fn class_weight(used: &[(AssetClass, f64)], class: AssetClass) -> f64 {
    used.iter()
        .find(|(c, _)| *c == class)
        .map(|(_, v)| *v)
        .unwrap_or(0.0)
}

fn bump_class(used: &mut Vec<(AssetClass, f64)>, class: AssetClass, amount: f64) {
    if let Some(entry) = used.iter_mut().find(|(c, _)| *c == class) {
        entry.1 += amount;
    } else {
        used.push((class, amount));
    }
}

/// Euclidean projection onto `{ w : lo ≤ w ≤ hi, Σw = 1 }` by bisecting the
/// simplex shift. Requires `Σlo ≤ 1 ≤ Σhi` (checked by the caller).
fn project_box_simplex(v: &DVector<f64>, lo: &[f64], hi: &[f64]) -> DVector<f64> {
    let n = v.len();
    let mut tau_lo = (0..n)
        .map(|i| v[i] - hi[i])
        .fold(f64::INFINITY, f64::min)
        - 1.0;
    let mut tau_hi = (0..n)
        .map(|i| v[i] - lo[i])
        .fold(f64::NEG_INFINITY, f64::max)
        + 1.0;

    let clipped_sum = |tau: f64| -> f64 {
        (0..n).map(|i| (v[i] - tau).clamp(lo[i], hi[i])).sum()
    };

    for _ in 0..100 {
        let mid = 0.5 * (tau_lo + tau_hi);
        if clipped_sum(mid) > 1.0 {
            tau_lo = mid;
        } else {
            tau_hi = mid;
        }
    }

    let tau = 0.5 * (tau_lo + tau_hi);
    DVector::from_iterator(n, (0..n).map(|i| (v[i] - tau).clamp(lo[i], hi[i])))
}
