//! Core library for the vehicle advisor
//!
//! This crate provides:
//! - Feature schemas and schema-aligned encoding of raw requests
//! - Random-forest estimators with deterministic synthetic training
//! - The artifact load-or-train lifecycle
//! - The decision engine (charging suggestions, maintenance projections)
//! - Health checks and observability

pub mod artifact;
pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod predictor;
pub mod service;
pub mod training;

pub use artifact::{
    ArtifactSource, ArtifactStore, LoadOutcome, ManagedArtifact, ModelArtifact,
    ModelArtifactManager,
};
pub use error::{
    DomainError, EstimatorError, InitializationError, PersistenceError, ServiceError,
    TrainingError, ValidationError,
};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{AdvisorMetrics, StructuredLogger};
pub use service::AdvisorService;
pub use training::{EvaluationReport, SyntheticTrainer, TrainerConfig};
