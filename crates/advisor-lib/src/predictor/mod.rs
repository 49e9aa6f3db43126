//! Prediction engine: schema alignment, forests, inference and decisions

mod features;
mod forest;
mod inference;
mod output;
mod schema;

pub use features::{
    derive_schema, EncodedVector, FeatureEncoder, FeatureRecord, RawField, RawValue,
};
pub use forest::{
    Criterion, DecisionTree, Estimator, Forest, ForestClassifier, ForestConfig, ForestRegressor,
    DEFAULT_MAX_DEPTH, DEFAULT_N_ESTIMATORS,
};
pub use inference::{
    expected_estimator, ArtifactPredictor, InferenceStats, MaintenancePredictor, ModelInput,
    RangePredictor,
};
pub use output::{
    check_range, ChargingConfig, ChargingPolicy, ChargingSuggestion, EngineCondition,
    MaintenanceConfig, MaintenancePolicy, MaintenanceProjection, DATE_FORMAT,
    MAINTENANCE_HORIZON_DAYS, MAINTENANCE_THRESHOLD,
};
pub use schema::{indicator_column, FeatureSchema};

use crate::error::ServiceError;
use crate::models::{ModelKind, PredictionResult};

/// Trait for prediction implementations
pub trait Predictor: Send + Sync {
    /// Raw record accepted by this predictor
    type Input;

    /// Encode `input` and evaluate the estimator
    fn predict(&self, input: &Self::Input) -> Result<PredictionResult, ServiceError>;

    /// Model kind this predictor serves
    fn model_kind(&self) -> ModelKind;
}
