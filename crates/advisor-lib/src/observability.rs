//! Observability infrastructure for the vehicle advisor
//!
//! Provides:
//! - Prometheus metrics (prediction latency and counts per model, error counters, model info)
//! - Structured JSON logging of lifecycle and prediction events with tracing

use crate::error::ServiceError;
use crate::models::ModelKind;
use prometheus::{
    register_gauge_vec, register_histogram_vec, register_int_counter_vec, Encoder, GaugeVec,
    HistogramVec, IntCounterVec, TextEncoder,
};
use std::path::Path;
use std::sync::OnceLock;
use tracing::{error, info, warn};

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.00005, 0.0001, 0.00025, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<AdvisorMetricsInner> = OnceLock::new();

struct AdvisorMetricsInner {
    prediction_latency_seconds: HistogramVec,
    predictions_total: IntCounterVec,
    validation_errors_total: IntCounterVec,
    domain_errors_total: IntCounterVec,
    estimator_errors_total: IntCounterVec,
    unavailable_total: IntCounterVec,
    model_info: GaugeVec,
    training_duration_seconds: GaugeVec,
}

impl AdvisorMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram_vec!(
                "vehicle_advisor_prediction_latency_seconds",
                "Time spent encoding, evaluating and post-processing a prediction",
                &["model"],
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            predictions_total: register_int_counter_vec!(
                "vehicle_advisor_predictions_total",
                "Total number of successful predictions",
                &["model"]
            )
            .expect("Failed to register predictions_total"),

            validation_errors_total: register_int_counter_vec!(
                "vehicle_advisor_validation_errors_total",
                "Requests rejected by field validation",
                &["model"]
            )
            .expect("Failed to register validation_errors_total"),

            domain_errors_total: register_int_counter_vec!(
                "vehicle_advisor_domain_errors_total",
                "Predictions outside their physical bounds",
                &["model"]
            )
            .expect("Failed to register domain_errors_total"),

            estimator_errors_total: register_int_counter_vec!(
                "vehicle_advisor_estimator_errors_total",
                "Estimator invocation failures",
                &["model"]
            )
            .expect("Failed to register estimator_errors_total"),

            unavailable_total: register_int_counter_vec!(
                "vehicle_advisor_model_unavailable_total",
                "Requests for a model that failed to initialize",
                &["model"]
            )
            .expect("Failed to register model_unavailable_total"),

            model_info: register_gauge_vec!(
                "vehicle_advisor_model_info",
                "Information about the serving model artifacts",
                &["model", "source", "schema_width"]
            )
            .expect("Failed to register model_info"),

            training_duration_seconds: register_gauge_vec!(
                "vehicle_advisor_training_duration_seconds",
                "Duration of the last synthetic training run",
                &["model"]
            )
            .expect("Failed to register training_duration_seconds"),
        }
    }
}

/// Advisor metrics for Prometheus exposition
///
/// A lightweight handle to the global metrics instance; clones share it.
#[derive(Clone)]
pub struct AdvisorMetrics {
    _private: (),
}

impl Default for AdvisorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl AdvisorMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(AdvisorMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &AdvisorMetricsInner {
        GLOBAL_METRICS.get_or_init(AdvisorMetricsInner::new)
    }

    pub fn observe_prediction_latency(&self, kind: ModelKind, duration_secs: f64) {
        self.inner()
            .prediction_latency_seconds
            .with_label_values(&[kind.as_str()])
            .observe(duration_secs);
    }

    pub fn inc_predictions(&self, kind: ModelKind) {
        self.inner()
            .predictions_total
            .with_label_values(&[kind.as_str()])
            .inc();
    }

    /// Count a failed request under the counter matching its error class
    pub fn record_error(&self, kind: ModelKind, err: &ServiceError) {
        let inner = self.inner();
        let counter = match err {
            ServiceError::Validation(_) => &inner.validation_errors_total,
            ServiceError::Domain(_) => &inner.domain_errors_total,
            ServiceError::Estimator(_) => &inner.estimator_errors_total,
            ServiceError::ModelUnavailable(_) => &inner.unavailable_total,
        };
        counter.with_label_values(&[kind.as_str()]).inc();
    }

    /// Replace the info series for `kind`
    pub fn set_model_info(&self, kind: ModelKind, source: &str, schema_width: usize) {
        let info = &self.inner().model_info;
        let width = schema_width.to_string();
        for other in ["loaded", "trained"] {
            let _ = info.remove_label_values(&[kind.as_str(), other, width.as_str()]);
        }
        info.with_label_values(&[kind.as_str(), source, width.as_str()])
            .set(1.0);
    }

    pub fn set_training_duration(&self, kind: ModelKind, duration_secs: f64) {
        self.inner()
            .training_duration_seconds
            .with_label_values(&[kind.as_str()])
            .set(duration_secs);
    }

    pub fn predictions_count(&self, kind: ModelKind) -> u64 {
        self.inner()
            .predictions_total
            .with_label_values(&[kind.as_str()])
            .get()
    }

    /// Render the default registry in the Prometheus text format
    pub fn render() -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&prometheus::gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Structured logger for advisor events
///
/// Every event carries an `event` field and the instance name so JSON log
/// consumers can filter on them.
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    pub fn log_startup(&self, version: &str, bind: &str) {
        info!(
            event = "advisor_started",
            instance = %self.instance,
            advisor_version = %version,
            bind = %bind,
            "Vehicle advisor started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "advisor_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Vehicle advisor shutting down"
        );
    }

    pub fn log_artifact_loaded(&self, kind: ModelKind, path: &Path, schema_width: usize) {
        info!(
            event = "artifact_loaded",
            instance = %self.instance,
            model = %kind,
            path = %path.display(),
            schema_width = schema_width,
            "Loaded persisted model artifact"
        );
    }

    pub fn log_fallback_training(&self, kind: ModelKind, path: &Path, reason: &str) {
        warn!(
            event = "artifact_fallback_training",
            instance = %self.instance,
            model = %kind,
            path = %path.display(),
            reason = %reason,
            "No usable artifact, training synthetic model"
        );
    }

    pub fn log_model_trained(
        &self,
        kind: ModelKind,
        schema_width: usize,
        evaluation: &str,
        duration_ms: u64,
    ) {
        info!(
            event = "model_trained",
            instance = %self.instance,
            model = %kind,
            schema_width = schema_width,
            evaluation = %evaluation,
            duration_ms = duration_ms,
            "Synthetic model trained"
        );
    }

    pub fn log_persist_failed(&self, kind: ModelKind, path: &Path, error: &str) {
        warn!(
            event = "artifact_persist_failed",
            instance = %self.instance,
            model = %kind,
            path = %path.display(),
            error = %error,
            "Could not save trained artifact, serving from memory"
        );
    }

    pub fn log_initialization_failed(&self, kind: ModelKind, error: &str) {
        error!(
            event = "model_initialization_failed",
            instance = %self.instance,
            model = %kind,
            error = %error,
            "Model could be neither loaded nor trained"
        );
    }

    pub fn log_range_prediction(&self, predicted_range: f64, suggestion: Option<&str>) {
        info!(
            event = "range_predicted",
            instance = %self.instance,
            predicted_range = predicted_range,
            charging_suggestion = ?suggestion,
            "Predicted driving range"
        );
    }

    pub fn log_maintenance_prediction(
        &self,
        label: u8,
        probability: f64,
        days_to_maintenance: Option<u32>,
    ) {
        info!(
            event = "maintenance_predicted",
            instance = %self.instance,
            predicted_class = label,
            probability = probability,
            maintenance_due = days_to_maintenance.is_some(),
            days_to_maintenance = ?days_to_maintenance,
            "Predicted maintenance need"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;

    #[test]
    fn test_advisor_metrics_record() {
        let metrics = AdvisorMetrics::new();
        let before = metrics.predictions_count(ModelKind::Maintenance);

        metrics.observe_prediction_latency(ModelKind::Maintenance, 0.0004);
        metrics.inc_predictions(ModelKind::Maintenance);
        metrics.set_model_info(ModelKind::Maintenance, "trained", 12);
        metrics.set_training_duration(ModelKind::Maintenance, 1.5);
        metrics.record_error(
            ModelKind::Maintenance,
            &ServiceError::Validation(ValidationError::NotFinite {
                field: "mileage".to_string(),
            }),
        );

        assert!(metrics.predictions_count(ModelKind::Maintenance) > before);
    }

    #[test]
    fn test_render_includes_registered_metrics() {
        let metrics = AdvisorMetrics::new();
        metrics.inc_predictions(ModelKind::Range);
        let text = AdvisorMetrics::render().unwrap();
        assert!(text.contains("vehicle_advisor_predictions_total"));
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("test-advisor");
        assert_eq!(logger.instance(), "test-advisor");
    }
}
