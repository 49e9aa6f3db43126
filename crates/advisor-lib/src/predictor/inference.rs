//! Artifact-backed inference
//!
//! A predictor owns a shared handle to one immutable model artifact. Each
//! call encodes the raw record against the artifact's schema and evaluates the
//! forest; nothing is locked on the request path.

use super::features::{FeatureEncoder, FeatureRecord};
use super::Predictor;
use crate::artifact::ModelArtifact;
use crate::error::{EstimatorError, ServiceError};
use crate::models::{MaintenanceFeatures, ModelKind, PredictionResult, RangeFeatures};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Inference latency above which a warning is logged
const MAX_INFERENCE_MS: u128 = 5;

/// A raw record type served by exactly one model kind
pub trait ModelInput: FeatureRecord + Send + Sync {
    const KIND: ModelKind;
}

impl ModelInput for RangeFeatures {
    const KIND: ModelKind = ModelKind::Range;
}

impl ModelInput for MaintenanceFeatures {
    const KIND: ModelKind = ModelKind::Maintenance;
}

/// Estimator type each model kind must carry
pub fn expected_estimator(kind: ModelKind) -> &'static str {
    match kind {
        ModelKind::Range => "regressor",
        ModelKind::Maintenance => "classifier",
    }
}

/// Predictor over a shared model artifact
pub struct ArtifactPredictor<R> {
    artifact: Arc<ModelArtifact>,
    inference_count: AtomicU64,
    slow_inference_count: AtomicU64,
    _input: PhantomData<fn(&R)>,
}

pub type RangePredictor = ArtifactPredictor<RangeFeatures>;
pub type MaintenancePredictor = ArtifactPredictor<MaintenanceFeatures>;

impl<R: ModelInput> ArtifactPredictor<R> {
    /// Wrap an artifact, checking it serves this record type
    pub fn new(artifact: Arc<ModelArtifact>) -> Result<Self, EstimatorError> {
        let expected = expected_estimator(R::KIND);
        if artifact.kind != R::KIND || artifact.estimator.type_name() != expected {
            return Err(EstimatorError::WrongEstimator {
                kind: artifact.kind,
                expected,
            });
        }
        Ok(Self {
            artifact,
            inference_count: AtomicU64::new(0),
            slow_inference_count: AtomicU64::new(0),
            _input: PhantomData,
        })
    }

    pub fn artifact(&self) -> &Arc<ModelArtifact> {
        &self.artifact
    }

    pub fn stats(&self) -> InferenceStats {
        InferenceStats {
            total_inferences: self.inference_count.load(Ordering::Relaxed),
            slow_inferences: self.slow_inference_count.load(Ordering::Relaxed),
        }
    }
}

impl<R: ModelInput> Predictor for ArtifactPredictor<R> {
    type Input = R;

    fn predict(&self, input: &R) -> Result<PredictionResult, ServiceError> {
        let start = Instant::now();

        let encoded = FeatureEncoder::new(&self.artifact.schema).encode(input)?;
        let result = self.artifact.estimator.predict(encoded.as_slice())?;

        let elapsed = start.elapsed();
        self.inference_count.fetch_add(1, Ordering::Relaxed);

        if elapsed.as_millis() > MAX_INFERENCE_MS {
            self.slow_inference_count.fetch_add(1, Ordering::Relaxed);
            warn!(
                model = %R::KIND,
                elapsed_ms = elapsed.as_millis() as u64,
                "Inference exceeded {}ms target",
                MAX_INFERENCE_MS
            );
        } else {
            debug!(model = %R::KIND, elapsed_us = elapsed.as_micros() as u64, "Inference completed");
        }

        Ok(result)
    }

    fn model_kind(&self) -> ModelKind {
        R::KIND
    }
}

/// Inference statistics
#[derive(Debug, Clone)]
pub struct InferenceStats {
    pub total_inferences: u64,
    pub slow_inferences: u64,
}
