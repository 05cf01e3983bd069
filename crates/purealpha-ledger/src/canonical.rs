//! Canonical serialization and content hashing.
//!
//! Every map in the data model is a `BTreeMap`, so `serde_json` output is
//! already canonical: same inputs, same bytes, same hash.

use serde::Serialize;
use sha2::{Digest, Sha256};

use purealpha_models::{
    CausalEffectEstimate, FeatureSnapshot, PortfolioAllocation, Rationale, Regime,
};

/// Compute SHA-256 hash as lowercase hex string.
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Borrowed canonical view of the five inputs a provenance record attests
/// to. Hashing this is the single definition of "what was committed";
/// `verify` re-serializes the same shape.
#[derive(Debug, Clone, Serialize)]
pub struct CommitPayload<'a> {
    pub snapshot: &'a FeatureSnapshot,
    pub regime: &'a Regime,
    pub effects: &'a [CausalEffectEstimate],
    pub allocation: &'a PortfolioAllocation,
    pub rationale: &'a Rationale,
}

impl CommitPayload<'_> {
    /// Content hash over the canonical JSON bytes.
    pub fn content_hash(&self) -> Result<String, serde_json::Error> {
        let bytes = serde_json::to_vec(self)?;
        Ok(sha256_hex(&bytes))
    }
}
