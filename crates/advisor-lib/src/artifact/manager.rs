//! Load-or-train lifecycle for one model kind
//!
//! Any load failure counts as "no artifact" and triggers synthetic training;
//! the trained artifact is then saved for later starts. The manager is
//! consumed by [`ModelArtifactManager::load_or_initialize`], so a process
//! writes each artifact at most once.

use super::{ArtifactStore, ModelArtifact};
use crate::error::{InitializationError, PersistenceError};
use crate::models::ModelKind;
use crate::observability::{AdvisorMetrics, StructuredLogger};
use crate::training::{EvaluationReport, SyntheticTrainer, TrainerConfig};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Where a serving artifact came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactSource {
    Loaded,
    Trained,
}

impl ArtifactSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactSource::Loaded => "loaded",
            ArtifactSource::Trained => "trained",
        }
    }
}

impl fmt::Display for ArtifactSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of the startup load/train decision
#[derive(Debug)]
pub enum LoadOutcome {
    /// A persisted artifact was read and verified
    Loaded(ModelArtifact),
    /// No usable artifact; a synthetic model was trained instead
    TrainFallback {
        artifact: ModelArtifact,
        evaluation: EvaluationReport,
        /// Why the persisted artifact was not used
        reason: PersistenceError,
        /// Whether the trained artifact was saved
        persisted: bool,
    },
    /// Neither loading nor training produced a model
    Fatal(InitializationError),
}

/// A serving artifact plus its provenance
#[derive(Debug, Clone)]
pub struct ManagedArtifact {
    pub artifact: Arc<ModelArtifact>,
    pub source: ArtifactSource,
    pub persisted: bool,
    /// Held-out evaluation, present when the artifact was trained this run
    pub evaluation: Option<EvaluationReport>,
}

/// Owns the artifact location and fallback trainer for one model kind
pub struct ModelArtifactManager {
    kind: ModelKind,
    store: ArtifactStore,
    trainer: SyntheticTrainer,
    logger: StructuredLogger,
    metrics: AdvisorMetrics,
}

impl ModelArtifactManager {
    pub fn new(
        kind: ModelKind,
        path: impl AsRef<Path>,
        trainer_config: TrainerConfig,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            kind,
            store: ArtifactStore::new(path.as_ref()),
            trainer: SyntheticTrainer::new(trainer_config),
            logger,
            metrics: AdvisorMetrics::new(),
        }
    }

    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    pub fn path(&self) -> &Path {
        self.store.path()
    }

    /// Decide between the persisted artifact and fallback training
    pub fn resolve(self) -> LoadOutcome {
        let reason = match self.store.load(self.kind) {
            Ok(artifact) => {
                self.logger
                    .log_artifact_loaded(self.kind, self.store.path(), artifact.schema.len());
                return LoadOutcome::Loaded(artifact);
            }
            Err(reason) => reason,
        };

        self.logger
            .log_fallback_training(self.kind, self.store.path(), &reason.to_string());

        let outcome = match self.trainer.train(self.kind) {
            Ok(outcome) => outcome,
            Err(source) => {
                let err = InitializationError {
                    kind: self.kind,
                    source,
                };
                self.logger
                    .log_initialization_failed(self.kind, &err.to_string());
                return LoadOutcome::Fatal(err);
            }
        };

        self.metrics
            .set_training_duration(self.kind, outcome.duration.as_secs_f64());
        self.logger.log_model_trained(
            self.kind,
            outcome.artifact.schema.len(),
            &outcome.evaluation.to_string(),
            outcome.duration.as_millis() as u64,
        );

        let persisted = match self.store.save(&outcome.artifact) {
            Ok(()) => true,
            Err(e) => {
                self.logger
                    .log_persist_failed(self.kind, self.store.path(), &e.to_string());
                false
            }
        };

        LoadOutcome::TrainFallback {
            artifact: outcome.artifact,
            evaluation: outcome.evaluation,
            reason,
            persisted,
        }
    }

    /// Produce the serving artifact, or fail if the model cannot exist at all
    pub fn load_or_initialize(self) -> Result<ManagedArtifact, InitializationError> {
        let kind = self.kind;
        let managed = match self.resolve() {
            LoadOutcome::Loaded(artifact) => ManagedArtifact {
                artifact: Arc::new(artifact),
                source: ArtifactSource::Loaded,
                persisted: true,
                evaluation: None,
            },
            LoadOutcome::TrainFallback {
                artifact,
                evaluation,
                persisted,
                ..
            } => ManagedArtifact {
                artifact: Arc::new(artifact),
                source: ArtifactSource::Trained,
                persisted,
                evaluation: Some(evaluation),
            },
            LoadOutcome::Fatal(err) => return Err(err),
        };

        AdvisorMetrics::new().set_model_info(
            kind,
            managed.source.as_str(),
            managed.artifact.schema.len(),
        );
        Ok(managed)
    }
}
