//! # PureAlpha Regime
//!
//! Classifies a feature snapshot into one of the 10 market regimes, with
//! transition hysteresis and the Liquidity Stress Index.
//!
//! ## Guarantees
//! - Pure: `detect` is a function of (snapshot, previous regime, config)
//!   only; no hidden state, no clock reads
//! - Stable: a differing top label is adopted only on a decisive margin,
//!   so single-sample noise never flips the regime
//! - Honest about gaps: too many unavailable rule features fail the
//!   request with `RegimeError::InsufficientData` instead of classifying
//!   from thin air

pub mod detector;
pub mod lsi;
pub mod rules;

pub use detector::{RegimeDetector, RegimeDetectorConfig, RegimeError};
pub use lsi::compute_lsi;
pub use rules::{Condition, RegimeRule, regime_rules, REGIME_RULES_VERSION};
