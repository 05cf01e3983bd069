//! Pluggable external anchoring.
//!
//! The chain never depends on any particular ledger technology: anchoring
//! is a narrow capability (submit a hash, poll its status) behind a trait.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnchorError {
    #[error("anchor submission failed: {0}")]
    Submission(String),

    #[error("anchor unreachable: {0}")]
    Unreachable(String),
}

/// Status of a previously submitted anchor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnchorState {
    Pending,
    Confirmed,
    Unknown,
}

/// External anchoring capability.
#[async_trait]
pub trait AnchorProvider: Send + Sync {
    /// Submit a content hash; returns the provider's anchor id.
    async fn submit_hash(&self, content_hash: &str) -> Result<String, AnchorError>;

    /// Poll a previously submitted anchor.
    async fn poll_status(&self, anchor_id: &str) -> Result<AnchorState, AnchorError>;
}

/// No-op provider: accepts every hash and confirms it immediately. Used
/// when external anchoring is configured off, and as a test double.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAnchor;

#[async_trait]
impl AnchorProvider for NullAnchor {
    async fn submit_hash(&self, content_hash: &str) -> Result<String, AnchorError> {
        Ok(format!("null:{content_hash}"))
    }

    async fn poll_status(&self, _anchor_id: &str) -> Result<AnchorState, AnchorError> {
        Ok(AnchorState::Confirmed)
    }
}
