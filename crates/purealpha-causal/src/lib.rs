//! # PureAlpha Causal
//!
//! Screens the supplied causal hypothesis set against the current snapshot
//! and detected regime, producing one auditable effect estimate per
//! hypothesis.
//!
//! ## Hard Laws
//! - Read-only: never mutates the snapshot, regime, or hypothesis set
//! - Deterministic: identical inputs produce bit-for-bit identical output
//! - Total: every hypothesis yields an estimate; screening reasons are
//!   explicit dispositions, never silent drops
//! - Fail-fast on config defects: a dangling feature or asset reference
//!   aborts the whole analysis before any estimation

pub mod validator;

pub use validator::{CausalError, CausalValidator, CausalValidatorConfig};
