//! # PureAlpha Portfolio
//!
//! Tail-risk-aware allocation: regime-conditioned return and covariance
//! estimates, shifted by validated causal effects, optimized under a CVaR
//! budget with per-asset bounds and class concentration caps.
//!
//! ## Pipeline
//! 1. `estimates` - build μ and Σ from the universe baselines, the regime
//!    outlook table, and validated causal shifts
//! 2. `gaussian` - closed-form normal tail math (no sampling, no RNG)
//! 3. `optimizer` - maximize expected return over the convex feasible set,
//!    with bounded CVaR-budget relaxation before declaring infeasibility

pub mod estimates;
pub mod gaussian;
pub mod optimizer;

pub use estimates::{build_estimates, AssetEstimates, RegimeOutlook, REGIME_OUTLOOK_VERSION};
pub use gaussian::{cvar_gaussian, norm_cdf, norm_pdf, norm_ppf};
pub use optimizer::{OptimizerConfig, OptimizerError, PortfolioOptimizer, RiskBudget};
