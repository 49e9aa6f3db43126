//! Model artifacts and their load-or-train lifecycle

mod manager;
mod store;

pub use manager::{ArtifactSource, LoadOutcome, ManagedArtifact, ModelArtifactManager};
pub use store::{compute_checksum, ArtifactStore, FORMAT_VERSION};

use crate::error::PersistenceError;
use crate::models::ModelKind;
use crate::predictor::{expected_estimator, Estimator, FeatureSchema};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How an artifact was produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingMetadata {
    pub seed: u64,
    pub n_samples: usize,
    pub n_train: usize,
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub created_at: DateTime<Utc>,
    pub trainer_version: String,
}

/// A fitted estimator together with the schema it was fitted on.
/// Written and read as one unit, never mutated after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub kind: ModelKind,
    pub schema: FeatureSchema,
    pub estimator: Estimator,
    pub metadata: TrainingMetadata,
}

impl ModelArtifact {
    /// Check estimator type, width and tree structure against the schema
    pub fn validate(&self) -> Result<(), PersistenceError> {
        let expected = expected_estimator(self.kind);
        if self.estimator.type_name() != expected {
            return Err(PersistenceError::Inconsistent(format!(
                "'{}' artifact holds a {}, expected a {}",
                self.kind,
                self.estimator.type_name(),
                expected
            )));
        }
        if self.estimator.n_features() != self.schema.len() {
            return Err(PersistenceError::Inconsistent(format!(
                "estimator expects {} features but schema has {} columns",
                self.estimator.n_features(),
                self.schema.len()
            )));
        }
        self.estimator.check().map_err(PersistenceError::Inconsistent)
    }
}
