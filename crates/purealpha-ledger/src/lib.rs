//! # PureAlpha Ledger
//!
//! Append-only, tamper-evident provenance for analysis results.
//!
//! Each commit hashes a canonical serialization of (snapshot, regime,
//! causal estimates, allocation, rationale) and links it to the previous
//! record's hash, forming a verifiable chain. Optionally every record is
//! journaled to JSONL and its content hash submitted to an external anchor.
//!
//! ## Hard Laws
//! - Single writer: "read head, hash, append" is one atomic unit
//! - Records are never mutated or deleted once written
//! - Anchoring is fire-and-forget with a bounded timeout; a slow or dead
//!   anchor degrades to `anchor_pending = true`, never a blocked commit
//! - `verify` needs only the record and the claimed inputs, no engine
//!   internals

pub mod anchor;
pub mod canonical;
pub mod chain;

pub use anchor::{AnchorError, AnchorProvider, AnchorState, NullAnchor};
pub use canonical::{sha256_hex, CommitPayload};
pub use chain::{
    record_hash, verify_chain, verify_record, AnchorOutcome, LedgerError, ProvenanceLedger,
    ProvenanceRecord, GENESIS_HASH,
};
