//! Serving facade
//!
//! Validates a request, runs the matching predictor and hands the raw output
//! to the decision engine. Models are optional: a kind that failed to
//! initialize answers every request with [`ServiceError::ModelUnavailable`].

use crate::artifact::ModelArtifact;
use crate::error::{EstimatorError, ServiceError};
use crate::models::{
    MaintenanceRequest, MaintenanceResponse, ModelKind, PredictionResult, RangeRequest,
    RangeResponse,
};
use crate::observability::{AdvisorMetrics, StructuredLogger};
use crate::predictor::{
    ChargingPolicy, MaintenancePolicy, MaintenancePredictor, Predictor, RangePredictor,
};
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Instant;

/// Request-path entry point shared by all handlers
pub struct AdvisorService {
    range: Option<RangePredictor>,
    maintenance: Option<MaintenancePredictor>,
    charging: ChargingPolicy,
    maintenance_policy: MaintenancePolicy,
    metrics: AdvisorMetrics,
    logger: StructuredLogger,
}

impl AdvisorService {
    /// A service with no models and default policies
    pub fn new(logger: StructuredLogger) -> Self {
        Self {
            range: None,
            maintenance: None,
            charging: ChargingPolicy::new(),
            maintenance_policy: MaintenancePolicy::new(),
            metrics: AdvisorMetrics::new(),
            logger,
        }
    }

    pub fn with_range_artifact(mut self, artifact: Arc<ModelArtifact>) -> Result<Self, EstimatorError> {
        self.range = Some(RangePredictor::new(artifact)?);
        Ok(self)
    }

    pub fn with_maintenance_artifact(
        mut self,
        artifact: Arc<ModelArtifact>,
    ) -> Result<Self, EstimatorError> {
        self.maintenance = Some(MaintenancePredictor::new(artifact)?);
        Ok(self)
    }

    /// Install an artifact for the kind it declares, replacing any previous one
    pub fn attach(&mut self, artifact: Arc<ModelArtifact>) -> Result<(), EstimatorError> {
        match artifact.kind {
            ModelKind::Range => self.range = Some(RangePredictor::new(artifact)?),
            ModelKind::Maintenance => self.maintenance = Some(MaintenancePredictor::new(artifact)?),
        }
        Ok(())
    }

    pub fn with_policies(mut self, charging: ChargingPolicy, maintenance: MaintenancePolicy) -> Self {
        self.charging = charging;
        self.maintenance_policy = maintenance;
        self
    }

    pub fn has_model(&self, kind: ModelKind) -> bool {
        self.artifact(kind).is_some()
    }

    pub fn artifact(&self, kind: ModelKind) -> Option<&Arc<ModelArtifact>> {
        match kind {
            ModelKind::Range => self.range.as_ref().map(|p| p.artifact()),
            ModelKind::Maintenance => self.maintenance.as_ref().map(|p| p.artifact()),
        }
    }

    /// Predicted range plus a charging suggestion when a trip distance is given
    pub fn predict_range(&self, request: &RangeRequest) -> Result<RangeResponse, ServiceError> {
        self.observed(ModelKind::Range, || self.range_response(request))
    }

    /// Failure label and maintenance projection relative to `today`
    pub fn predict_maintenance(
        &self,
        request: &MaintenanceRequest,
        today: NaiveDate,
    ) -> Result<MaintenanceResponse, ServiceError> {
        self.observed(ModelKind::Maintenance, || {
            self.maintenance_response(request, today)
        })
    }

    fn observed<T>(
        &self,
        kind: ModelKind,
        f: impl FnOnce() -> Result<T, ServiceError>,
    ) -> Result<T, ServiceError> {
        let start = Instant::now();
        let result = f();
        match &result {
            Ok(_) => {
                self.metrics.inc_predictions(kind);
                self.metrics
                    .observe_prediction_latency(kind, start.elapsed().as_secs_f64());
            }
            Err(e) => self.metrics.record_error(kind, e),
        }
        result
    }

    fn range_response(&self, request: &RangeRequest) -> Result<RangeResponse, ServiceError> {
        let (features, context) = request.validate()?;
        let predictor = self
            .range
            .as_ref()
            .ok_or(ServiceError::ModelUnavailable(ModelKind::Range))?;

        let range = match predictor.predict(&features)? {
            PredictionResult::Range(range) => range,
            PredictionResult::Failure { .. } => {
                return Err(EstimatorError::WrongEstimator {
                    kind: ModelKind::Range,
                    expected: "regressor",
                }
                .into())
            }
        };
        let suggestion = self.charging.recommend(range, &context)?;

        let response = RangeResponse {
            predicted_range: round_to_cents(range),
            charging_suggestion: suggestion.map(|s| s.to_string()),
        };
        self.logger.log_range_prediction(
            response.predicted_range,
            response.charging_suggestion.as_deref(),
        );
        Ok(response)
    }

    fn maintenance_response(
        &self,
        request: &MaintenanceRequest,
        today: NaiveDate,
    ) -> Result<MaintenanceResponse, ServiceError> {
        let features = request.validate()?;
        let predictor = self
            .maintenance
            .as_ref()
            .ok_or(ServiceError::ModelUnavailable(ModelKind::Maintenance))?;

        let (label, probability) = match predictor.predict(&features)? {
            PredictionResult::Failure { label, probability } => (label, probability),
            PredictionResult::Range(_) => {
                return Err(EstimatorError::WrongEstimator {
                    kind: ModelKind::Maintenance,
                    expected: "classifier",
                }
                .into())
            }
        };
        let projection = self.maintenance_policy.project(probability, label, today)?;

        self.logger.log_maintenance_prediction(
            projection.label,
            projection.probability,
            projection.days_to_maintenance,
        );
        Ok(projection.into_response())
    }
}

/// Round half away from zero to two decimals
fn round_to_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
