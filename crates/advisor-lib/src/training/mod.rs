//! Deterministic synthetic training

mod dataset;
pub mod synthetic;
mod trainer;

pub use dataset::Dataset;
pub use trainer::{EvaluationReport, SyntheticTrainer, TrainerConfig, TrainingOutcome};
