//! The append-only provenance hash chain.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::anchor::{AnchorError, AnchorProvider, AnchorState};
use crate::canonical::CommitPayload;

/// Previous-hash of the first record.
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("chain integrity violation: expected head {expected}, found {actual}")]
    ChainIntegrity { expected: String, actual: String },

    #[error("canonical serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("journal write failed: {0}")]
    Journal(#[from] std::io::Error),
}

/// One committed provenance record. Never mutated once written; the
/// asynchronous anchor outcome lives in a side table keyed by sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceRecord {
    /// Position in the chain, starting at 0.
    pub sequence: u64,
    /// SHA-256 over the canonical serialization of the committed inputs.
    pub content_hash: String,
    /// Record hash of the immediately preceding record (GENESIS_HASH for
    /// the first).
    pub prev_hash: String,
    pub timestamp: DateTime<Utc>,
    /// True when an external anchor was configured and its confirmation
    /// had not landed at commit time.
    pub anchor_pending: bool,
}

/// Record hash: what the next record's `prev_hash` links to. Covers every
/// field of the record, so editing any of them breaks all descendants.
pub fn record_hash(record: &ProvenanceRecord) -> String {
    let mut hasher = Sha256::new();
    hasher.update(record.sequence.to_le_bytes());
    hasher.update((record.content_hash.len() as u32).to_le_bytes());
    hasher.update(record.content_hash.as_bytes());
    hasher.update((record.prev_hash.len() as u32).to_le_bytes());
    hasher.update(record.prev_hash.as_bytes());
    let ts = record.timestamp.to_rfc3339();
    hasher.update((ts.len() as u32).to_le_bytes());
    hasher.update(ts.as_bytes());
    hasher.update([record.anchor_pending as u8]);
    hex::encode(hasher.finalize())
}

/// Recompute the content hash from the claimed inputs and compare.
/// External auditors need nothing else from the engine.
pub fn verify_record(record: &ProvenanceRecord, payload: &CommitPayload<'_>) -> bool {
    match payload.content_hash() {
        Ok(hash) => hash == record.content_hash,
        Err(_) => false,
    }
}

/// Walk the chain links. Returns the index of the first broken record
/// (bad sequence or bad previous-hash link) or `Ok(())` for an intact
/// chain. Tampering with record `i` breaks `i + 1` (or fails
/// `verify_record` at `i` itself when the content was edited).
pub fn verify_chain(records: &[ProvenanceRecord]) -> Result<(), usize> {
    let mut expected_prev = GENESIS_HASH.to_string();
    for (i, record) in records.iter().enumerate() {
        if record.sequence != i as u64 || record.prev_hash != expected_prev {
            return Err(i);
        }
        expected_prev = record_hash(record);
    }
    Ok(())
}

/// Result of an asynchronous anchor submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnchorOutcome {
    Anchored { anchor_id: String },
    Failed { reason: String },
    TimedOut,
}

#[derive(Debug, Default)]
struct ChainState {
    records: Vec<ProvenanceRecord>,
    /// Record hash of the last record, or GENESIS_HASH when empty.
    head: Option<String>,
}

impl ChainState {
    fn head(&self) -> String {
        self.head
            .clone()
            .unwrap_or_else(|| GENESIS_HASH.to_string())
    }
}

/// The provenance ledger. Exclusively owns the chain; commits serialize
/// through one mutex so "read head, hash, append" is atomic under
/// concurrent analysis requests.
pub struct ProvenanceLedger {
    state: Mutex<ChainState>,
    anchor_outcomes: Arc<Mutex<BTreeMap<u64, AnchorOutcome>>>,
    journal_path: Option<PathBuf>,
    anchor: Option<Arc<dyn AnchorProvider>>,
    anchor_timeout: Duration,
}

impl std::fmt::Debug for ProvenanceLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProvenanceLedger")
            .field("journal_path", &self.journal_path)
            .field("anchoring", &self.anchor.is_some())
            .finish()
    }
}

impl Default for ProvenanceLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl ProvenanceLedger {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ChainState::default()),
            anchor_outcomes: Arc::new(Mutex::new(BTreeMap::new())),
            journal_path: None,
            anchor: None,
            anchor_timeout: Duration::from_secs(5),
        }
    }

    /// Journal every committed record as one JSONL line.
    pub fn with_journal(mut self, path: impl Into<PathBuf>) -> Self {
        self.journal_path = Some(path.into());
        self
    }

    /// Enable external anchoring with a bounded per-submission timeout.
    pub fn with_anchor(mut self, provider: Arc<dyn AnchorProvider>, timeout: Duration) -> Self {
        self.anchor = Some(provider);
        self.anchor_timeout = timeout;
        self
    }

    /// Current chain head (record hash of the last record). Callers doing
    /// compare-and-swap commits observe this before computing.
    pub fn head(&self) -> String {
        self.lock_state().head()
    }

    pub fn len(&self) -> usize {
        self.lock_state().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_state().records.is_empty()
    }

    /// Snapshot of the chain for audit.
    pub fn records(&self) -> Vec<ProvenanceRecord> {
        self.lock_state().records.clone()
    }

    /// Outcome of the asynchronous anchor submission for a record, if it
    /// has landed.
    pub fn anchor_outcome(&self, sequence: u64) -> Option<AnchorOutcome> {
        self.anchor_outcomes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&sequence)
            .cloned()
    }

    /// Append a record for the payload, linking to whatever the head is at
    /// append time.
    pub fn commit(&self, payload: &CommitPayload<'_>) -> Result<ProvenanceRecord, LedgerError> {
        self.commit_inner(payload, None)
    }

    /// Compare-and-swap append: fails with `ChainIntegrity` when the head
    /// moved past `expected_head` since the caller observed it.
    pub fn commit_at_head(
        &self,
        payload: &CommitPayload<'_>,
        expected_head: &str,
    ) -> Result<ProvenanceRecord, LedgerError> {
        self.commit_inner(payload, Some(expected_head))
    }

    fn commit_inner(
        &self,
        payload: &CommitPayload<'_>,
        expected_head: Option<&str>,
    ) -> Result<ProvenanceRecord, LedgerError> {
        let content_hash = payload.content_hash()?;

        let mut state = self.lock_state();
        let head = state.head();
        if let Some(expected) = expected_head {
            if head != expected {
                return Err(LedgerError::ChainIntegrity {
                    expected: expected.to_string(),
                    actual: head,
                });
            }
        }

        let record = ProvenanceRecord {
            sequence: state.records.len() as u64,
            content_hash,
            prev_hash: head,
            timestamp: Utc::now(),
            anchor_pending: self.anchor.is_some(),
        };

        // Journal before adopting the record so a failed write never
        // leaves the in-memory chain ahead of the journal.
        if let Some(path) = &self.journal_path {
            append_journal_line(path, &record)?;
        }

        state.head = Some(record_hash(&record));
        state.records.push(record.clone());
        drop(state);

        info!(
            sequence = record.sequence,
            content_hash = record.content_hash.as_str(),
            "provenance record committed"
        );

        if let Some(provider) = &self.anchor {
            self.spawn_anchor_submission(provider.clone(), record.sequence, &record.content_hash);
        }

        Ok(record)
    }

    fn spawn_anchor_submission(
        &self,
        provider: Arc<dyn AnchorProvider>,
        sequence: u64,
        content_hash: &str,
    ) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!(sequence, "no async runtime; anchor submission stays pending");
            return;
        };
        let outcomes = Arc::clone(&self.anchor_outcomes);
        let hash = content_hash.to_string();
        let timeout = self.anchor_timeout;
        handle.spawn(async move {
            let outcome = submit_with_timeout(provider, &hash, timeout).await;
            debug!(sequence, ?outcome, "anchor submission resolved");
            outcomes
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .insert(sequence, outcome);
        });
    }

    /// Direct anchor submission for one record. The commit path spawns
    /// this; exposed so callers (and tests) can drive it deterministically.
    pub async fn submit_anchor(&self, sequence: u64, content_hash: &str) -> AnchorOutcome {
        let Some(provider) = self.anchor.clone() else {
            return AnchorOutcome::Failed {
                reason: "no anchor provider configured".to_string(),
            };
        };
        let outcome = submit_with_timeout(provider, content_hash, self.anchor_timeout).await;
        self.anchor_outcomes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(sequence, outcome.clone());
        outcome
    }

    /// Poll the configured external anchor for a previously submitted id,
    /// bounded by the same timeout as submissions.
    pub async fn poll_anchor(&self, anchor_id: &str) -> Result<AnchorState, AnchorError> {
        let Some(provider) = self.anchor.clone() else {
            return Err(AnchorError::Unreachable(
                "no anchor provider configured".to_string(),
            ));
        };
        match tokio::time::timeout(self.anchor_timeout, provider.poll_status(anchor_id)).await {
            Ok(result) => result,
            Err(_) => Err(AnchorError::Unreachable("poll timed out".to_string())),
        }
    }

    /// Verify the chain persisted in a journal file.
    pub fn verify_journal(path: &Path) -> Result<(), LedgerError> {
        let contents = std::fs::read_to_string(path)?;
        let mut records = Vec::new();
        for line in contents.lines().filter(|l| !l.trim().is_empty()) {
            records.push(serde_json::from_str::<ProvenanceRecord>(line)?);
        }
        match verify_chain(&records) {
            Ok(()) => Ok(()),
            Err(index) => Err(LedgerError::ChainIntegrity {
                expected: if index == 0 {
                    GENESIS_HASH.to_string()
                } else {
                    record_hash(&records[index - 1])
                },
                actual: records[index].prev_hash.clone(),
            }),
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, ChainState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

async fn submit_with_timeout(
    provider: Arc<dyn AnchorProvider>,
    content_hash: &str,
    timeout: Duration,
) -> AnchorOutcome {
    match tokio::time::timeout(timeout, provider.submit_hash(content_hash)).await {
        Ok(Ok(anchor_id)) => AnchorOutcome::Anchored { anchor_id },
        Ok(Err(err)) => AnchorOutcome::Failed {
            reason: err.to_string(),
        },
        Err(_) => AnchorOutcome::TimedOut,
    }
}

fn append_journal_line(path: &Path, record: &ProvenanceRecord) -> Result<(), LedgerError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut line = serde_json::to_vec(record)?;
    line.push(b'\n');
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    file.write_all(&line)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchor::NullAnchor;
    use chrono::Utc;
    use purealpha_models::{
        FeatureSnapshot, Lsi, LsiComponents, LsiStatus, PortfolioAllocation, Rationale, Regime,
        RegimeLabel,
    };
    use std::collections::BTreeMap;

    fn sample_inputs() -> (FeatureSnapshot, Regime, PortfolioAllocation, Rationale) {
        let ts = Utc::now();
        let snapshot = FeatureSnapshot::new(ts, "catalog_v1");
        let regime = Regime {
            label: RegimeLabel::Goldilocks,
            confidence: 0.7,
            lsi: Lsi {
                score: 18.0,
                status: LsiStatus::Normal,
                components: LsiComponents::default(),
            },
            scores: BTreeMap::new(),
            hysteresis_hold: false,
            rules_version: "regime_rules_v1".to_string(),
            snapshot_as_of: ts,
        };
        let allocation = PortfolioAllocation::new(
            [
                (purealpha_models::AssetId::new("VTI"), 0.6),
                (purealpha_models::AssetId::new("BND"), 0.4),
            ]
            .into_iter()
            .collect(),
        );
        let rationale = Rationale {
            regime: RegimeLabel::Goldilocks,
            regime_confidence: 0.7,
            lsi_status: LsiStatus::Normal,
            entries: vec![],
            summary: "test".to_string(),
        };
        (snapshot, regime, allocation, rationale)
    }

    fn payload<'a>(
        inputs: &'a (FeatureSnapshot, Regime, PortfolioAllocation, Rationale),
    ) -> CommitPayload<'a> {
        CommitPayload {
            snapshot: &inputs.0,
            regime: &inputs.1,
            effects: &[],
            allocation: &inputs.2,
            rationale: &inputs.3,
        }
    }

    #[test]
    fn sequential_commits_form_linked_chain() {
        let ledger = ProvenanceLedger::new();
        let inputs = sample_inputs();

        for _ in 0..5 {
            ledger.commit(&payload(&inputs)).unwrap();
        }

        let records = ledger.records();
        assert_eq!(records.len(), 5);
        assert_eq!(records[0].prev_hash, GENESIS_HASH);
        for i in 1..5 {
            assert_eq!(records[i].prev_hash, record_hash(&records[i - 1]));
        }
        assert!(verify_chain(&records).is_ok());
        assert_eq!(ledger.head(), record_hash(&records[4]));
    }

    #[test]
    fn tampering_breaks_verification_for_descendants() {
        let ledger = ProvenanceLedger::new();
        let inputs = sample_inputs();
        for _ in 0..4 {
            ledger.commit(&payload(&inputs)).unwrap();
        }

        let mut records = ledger.records();
        records[1].content_hash = "deadbeef".repeat(8);

        // The edited record's descendant no longer links.
        assert_eq!(verify_chain(&records), Err(2));
        // And the edited record itself fails input verification.
        assert!(!verify_record(&records[1], &payload(&inputs)));
        // Untouched prefix still verifies.
        assert!(verify_record(&records[0], &payload(&inputs)));
    }

    #[test]
    fn verify_record_accepts_true_inputs_and_rejects_altered_ones() {
        let ledger = ProvenanceLedger::new();
        let inputs = sample_inputs();
        let record = ledger.commit(&payload(&inputs)).unwrap();

        assert!(verify_record(&record, &payload(&inputs)));

        let mut altered = sample_inputs();
        altered.2 = PortfolioAllocation::new(
            [(purealpha_models::AssetId::new("VTI"), 1.0)].into_iter().collect(),
        );
        assert!(!verify_record(&record, &payload(&altered)));
    }

    #[test]
    fn cas_commit_detects_stale_head() {
        let ledger = ProvenanceLedger::new();
        let inputs = sample_inputs();

        let observed = ledger.head();
        assert_eq!(observed, GENESIS_HASH);

        // An interleaved writer moves the head.
        ledger.commit(&payload(&inputs)).unwrap();

        let err = ledger.commit_at_head(&payload(&inputs), &observed).unwrap_err();
        assert!(matches!(err, LedgerError::ChainIntegrity { .. }));

        // Retry with the refreshed head succeeds.
        let fresh = ledger.head();
        assert!(ledger.commit_at_head(&payload(&inputs), &fresh).is_ok());
    }

    #[test]
    fn journal_persists_a_verifiable_chain() {
        let dir = tempfile::tempdir().unwrap();
        let journal = dir.path().join("provenance.jsonl");
        let ledger = ProvenanceLedger::new().with_journal(&journal);
        let inputs = sample_inputs();

        for _ in 0..3 {
            ledger.commit(&payload(&inputs)).unwrap();
        }

        assert!(ProvenanceLedger::verify_journal(&journal).is_ok());

        // Corrupt the middle line and the journal stops verifying.
        let text = std::fs::read_to_string(&journal).unwrap();
        let mut lines: Vec<String> = text.lines().map(String::from).collect();
        let mut record: ProvenanceRecord = serde_json::from_str(&lines[1]).unwrap();
        record.content_hash = "00".repeat(32);
        lines[1] = serde_json::to_string(&record).unwrap();
        std::fs::write(&journal, lines.join("\n")).unwrap();

        assert!(ProvenanceLedger::verify_journal(&journal).is_err());
    }

    #[tokio::test]
    async fn anchor_submission_resolves_out_of_band() {
        let ledger = ProvenanceLedger::new()
            .with_anchor(Arc::new(NullAnchor), Duration::from_millis(200));
        let inputs = sample_inputs();

        let record = ledger.commit(&payload(&inputs)).unwrap();
        // The receipt never waits on the anchor.
        assert!(record.anchor_pending);

        let outcome = ledger.submit_anchor(record.sequence, &record.content_hash).await;
        match outcome {
            AnchorOutcome::Anchored { anchor_id } => {
                assert!(anchor_id.starts_with("null:"));
            }
            other => panic!("expected Anchored, got {other:?}"),
        }
        assert_eq!(
            ledger.anchor_outcome(record.sequence),
            Some(AnchorOutcome::Anchored {
                anchor_id: format!("null:{}", record.content_hash)
            })
        );
    }

    #[tokio::test]
    async fn poll_anchor_reports_confirmation() {
        let ledger = ProvenanceLedger::new()
            .with_anchor(Arc::new(NullAnchor), Duration::from_millis(200));
        let state = ledger.poll_anchor("null:abc").await.unwrap();
        assert_eq!(state, AnchorState::Confirmed);
    }

    #[test]
    fn content_hash_is_deterministic() {
        let inputs = sample_inputs();
        let a = payload(&inputs).content_hash().unwrap();
        let b = payload(&inputs).content_hash().unwrap();
        assert_eq!(a, b);
    }
}
