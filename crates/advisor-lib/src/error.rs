//! Error taxonomy for the advisor core
//!
//! Each failure class maps to a distinct caller-facing outcome: validation
//! errors are the client's fault, initialization errors mean a model cannot
//! serve at all, domain errors flag an estimator producing impossible values,
//! and persistence errors cover artifact I/O.

use crate::models::ModelKind;
use std::path::PathBuf;
use thiserror::Error;

/// A request field was malformed or outside its declared domain
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("invalid value '{value}' for field '{field}', must be one of: {allowed}")]
    InvalidCategory {
        field: String,
        value: String,
        allowed: String,
    },

    #[error("field '{field}' must be a finite number")]
    NotFinite { field: String },

    #[error("flag field '{field}' must be 0 or 1, got {value}")]
    InvalidFlag { field: String, value: i64 },

    #[error("field '{field}' must not be negative, got {value}")]
    Negative { field: String, value: f64 },
}

impl ValidationError {
    /// Name of the offending field
    pub fn field(&self) -> &str {
        match self {
            ValidationError::InvalidCategory { field, .. }
            | ValidationError::NotFinite { field }
            | ValidationError::InvalidFlag { field, .. }
            | ValidationError::Negative { field, .. } => field,
        }
    }

    /// Offending value rendered as a string, when one exists
    pub fn value(&self) -> Option<String> {
        match self {
            ValidationError::InvalidCategory { value, .. } => Some(value.clone()),
            ValidationError::InvalidFlag { value, .. } => Some(value.to_string()),
            ValidationError::Negative { value, .. } => Some(value.to_string()),
            ValidationError::NotFinite { .. } => None,
        }
    }
}

/// A prediction fell outside its physically sensible range
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DomainError {
    #[error("predicted range must be a non-negative finite number, got {0}")]
    InvalidRange(f64),

    #[error("failure probability must lie in [0, 1], got {0}")]
    ProbabilityOutOfBounds(f64),

    #[error("maintenance date {days} days after {from} is not representable")]
    DateOutOfRange { from: chrono::NaiveDate, days: u32 },
}

/// The estimator could not be evaluated
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EstimatorError {
    #[error("estimator expects {expected} features, got {actual}")]
    FeatureCountMismatch { expected: usize, actual: usize },

    #[error("artifact for '{kind}' does not hold a {expected} estimator")]
    WrongEstimator {
        kind: ModelKind,
        expected: &'static str,
    },

    #[error("estimator has no trees")]
    EmptyEnsemble,
}

/// Synthetic training could not produce a model
#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("invalid trainer configuration: {0}")]
    InvalidConfig(String),

    #[error("training split is empty")]
    EmptyDataset,

    #[error("failed to encode synthetic sample: {0}")]
    Encoding(#[from] ValidationError),

    #[error("invalid feature schema: {0}")]
    Schema(#[from] SchemaError),

    #[error("held-out evaluation failed: {0}")]
    Evaluation(#[from] EstimatorError),
}

/// A feature schema could not be constructed
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("duplicate column '{0}' in feature schema")]
    DuplicateColumn(String),

    #[error("feature schema has no columns")]
    Empty,
}

/// Artifact read or write failure
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("artifact file {path:?} not found")]
    NotFound { path: PathBuf },

    #[error("I/O error on artifact {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode artifact: {0}")]
    Encode(#[source] bincode::Error),

    #[error("failed to decode artifact: {0}")]
    Decode(#[source] bincode::Error),

    #[error("artifact format version {found} is not supported (expected {expected})")]
    UnsupportedFormat { found: u32, expected: u32 },

    #[error("artifact holds a '{found}' model, expected '{expected}'")]
    KindMismatch { found: ModelKind, expected: ModelKind },

    #[error("artifact checksum mismatch: recorded {recorded}, computed {computed}")]
    ChecksumMismatch { recorded: String, computed: String },

    #[error("artifact is inconsistent: {0}")]
    Inconsistent(String),
}

/// A model could be neither loaded nor trained
#[derive(Debug, Error)]
#[error("failed to initialize '{kind}' model: {source}")]
pub struct InitializationError {
    pub kind: ModelKind,
    #[source]
    pub source: TrainingError,
}

/// Errors surfaced by the serving facade
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Estimator(#[from] EstimatorError),

    #[error("'{0}' model is not available")]
    ModelUnavailable(ModelKind),
}

impl ServiceError {
    /// True when the caller sent a bad request
    pub fn is_client_error(&self) -> bool {
        matches!(self, ServiceError::Validation(_))
    }

    /// Stable machine-readable code for the error body
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::Validation(_) => "validation_error",
            ServiceError::Domain(_) => "domain_error",
            ServiceError::Estimator(_) => "estimator_error",
            ServiceError::ModelUnavailable(_) => "model_unavailable",
        }
    }
}
