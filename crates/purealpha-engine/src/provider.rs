//! Feature-data collaborator contract.
//!
//! The engine never fetches anything itself; a provider hands it a
//! complete snapshot with explicit missing markers (never silent zeros).

use thiserror::Error;

use purealpha_models::FeatureSnapshot;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("feature feed unavailable: {0}")]
    Unavailable(String),
}

/// Supplies the latest feature snapshot for an analysis request.
pub trait SnapshotProvider {
    fn latest(&self) -> Result<FeatureSnapshot, ProviderError>;
}

/// Fixed-snapshot provider for tests, replays, and the CLI.
#[derive(Debug, Clone)]
pub struct StaticSnapshotProvider {
    snapshot: FeatureSnapshot,
}

impl StaticSnapshotProvider {
    pub fn new(snapshot: FeatureSnapshot) -> Self {
        Self { snapshot }
    }
}

impl SnapshotProvider for StaticSnapshotProvider {
    fn latest(&self) -> Result<FeatureSnapshot, ProviderError> {
        Ok(self.snapshot.clone())
    }
}
