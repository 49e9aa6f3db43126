//! Synthetic fallback trainer
//!
//! Generates a seeded dataset for one model kind, holds out a test split for
//! evaluation, derives the feature schema from the training split and fits a
//! random forest on the encoded matrix.

use super::dataset::Dataset;
use super::synthetic;
use crate::artifact::{ModelArtifact, TrainingMetadata};
use crate::error::TrainingError;
use crate::models::ModelKind;
use crate::predictor::{
    derive_schema, Estimator, FeatureEncoder, FeatureRecord, FeatureSchema, ForestClassifier,
    ForestConfig, ForestRegressor, DEFAULT_MAX_DEPTH, DEFAULT_N_ESTIMATORS,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::info;

/// Trainer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    pub n_samples: usize,
    pub test_fraction: f64,
    /// Seeds data generation, the split and every tree's bootstrap
    pub seed: u64,
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            n_samples: 10_000,
            test_fraction: 0.2,
            seed: 42,
            n_estimators: DEFAULT_N_ESTIMATORS,
            max_depth: Some(DEFAULT_MAX_DEPTH),
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }
}

impl TrainerConfig {
    /// Reduced configuration for tests and smoke runs
    pub fn small() -> Self {
        Self {
            n_samples: 600,
            n_estimators: 12,
            max_depth: Some(8),
            ..Self::default()
        }
    }

    pub fn forest_config(&self) -> ForestConfig {
        ForestConfig {
            n_estimators: self.n_estimators,
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
            seed: self.seed,
        }
    }

    fn validate(&self) -> Result<(), TrainingError> {
        if self.n_samples < 2 {
            return Err(TrainingError::InvalidConfig(format!(
                "n_samples must be at least 2, got {}",
                self.n_samples
            )));
        }
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(TrainingError::InvalidConfig(format!(
                "test_fraction must lie in (0, 1), got {}",
                self.test_fraction
            )));
        }
        Ok(())
    }
}

/// Held-out evaluation of a freshly trained model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "task", rename_all = "snake_case")]
pub enum EvaluationReport {
    Regression {
        test_samples: usize,
        mse: f64,
        r2: f64,
    },
    Classification {
        test_samples: usize,
        accuracy: f64,
        brier: f64,
    },
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvaluationReport::Regression { test_samples, mse, r2 } => {
                write!(f, "mse={:.4} r2={:.4} (n={})", mse, r2, test_samples)
            }
            EvaluationReport::Classification {
                test_samples,
                accuracy,
                brier,
            } => write!(f, "accuracy={:.4} brier={:.4} (n={})", accuracy, brier, test_samples),
        }
    }
}

/// A trained artifact with its evaluation. The evaluation is not persisted.
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub artifact: ModelArtifact,
    pub evaluation: EvaluationReport,
    pub duration: Duration,
}

/// Encoded train and test matrices sharing one schema
struct Prepared {
    schema: FeatureSchema,
    x_train: Vec<Vec<f64>>,
    y_train: Vec<f64>,
    x_test: Vec<Vec<f64>>,
    y_test: Vec<f64>,
}

fn prepare<R: FeatureRecord + Clone>(
    data: Dataset<R>,
    test_fraction: f64,
    rng: &mut StdRng,
) -> Result<Prepared, TrainingError> {
    let (train, test) = data.split(test_fraction, rng)?;
    let schema = derive_schema(&train.records)?;
    let encoder = FeatureEncoder::new(&schema);
    let x_train = encoder.encode_all(&train.records)?;
    let x_test = encoder.encode_all(&test.records)?;
    Ok(Prepared {
        schema,
        x_train,
        y_train: train.targets,
        x_test,
        y_test: test.targets,
    })
}

/// Deterministic synthetic trainer
pub struct SyntheticTrainer {
    config: TrainerConfig,
}

impl SyntheticTrainer {
    pub fn new(config: TrainerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Train a model of `kind` from scratch
    pub fn train(&self, kind: ModelKind) -> Result<TrainingOutcome, TrainingError> {
        self.config.validate()?;
        let start = Instant::now();
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let forest_config = self.config.forest_config();

        info!(
            model = %kind,
            samples = self.config.n_samples,
            trees = self.config.n_estimators,
            seed = self.config.seed,
            "Training synthetic model"
        );

        let (prepared, estimator, evaluation) = match kind {
            ModelKind::Range => {
                let data = synthetic::generate_range(self.config.n_samples, &mut rng);
                let p = prepare(data, self.config.test_fraction, &mut rng)?;
                let model = ForestRegressor::fit(&p.x_train, &p.y_train, &forest_config)?;
                let predictions = p
                    .x_test
                    .iter()
                    .map(|row| model.predict(row))
                    .collect::<Result<Vec<_>, _>>()?;
                let evaluation = regression_report(&predictions, &p.y_test);
                (p, Estimator::Regressor(model), evaluation)
            }
            ModelKind::Maintenance => {
                let data = synthetic::generate_maintenance(self.config.n_samples, &mut rng);
                let p = prepare(data, self.config.test_fraction, &mut rng)?;
                let labels: Vec<u8> = p.y_train.iter().map(|&y| u8::from(y > 0.5)).collect();
                let model = ForestClassifier::fit(&p.x_train, &labels, &forest_config)?;
                let probabilities = p
                    .x_test
                    .iter()
                    .map(|row| model.predict_proba(row))
                    .collect::<Result<Vec<_>, _>>()?;
                let evaluation = classification_report(&probabilities, &p.y_test);
                (p, Estimator::Classifier(model), evaluation)
            }
        };

        let metadata = TrainingMetadata {
            seed: self.config.seed,
            n_samples: self.config.n_samples,
            n_train: prepared.x_train.len(),
            n_estimators: self.config.n_estimators,
            max_depth: self.config.max_depth,
            created_at: chrono::Utc::now(),
            trainer_version: env!("CARGO_PKG_VERSION").to_string(),
        };
        let artifact = ModelArtifact {
            kind,
            schema: prepared.schema,
            estimator,
            metadata,
        };
        let duration = start.elapsed();

        info!(
            model = %kind,
            schema_width = artifact.schema.len(),
            duration_ms = duration.as_millis() as u64,
            evaluation = %evaluation,
            "Synthetic training complete"
        );

        Ok(TrainingOutcome {
            artifact,
            evaluation,
            duration,
        })
    }
}

fn regression_report(predictions: &[f64], targets: &[f64]) -> EvaluationReport {
    let n = targets.len() as f64;
    let ss_res: f64 = predictions
        .iter()
        .zip(targets)
        .map(|(p, y)| (p - y).powi(2))
        .sum();
    let mean = targets.iter().sum::<f64>() / n;
    let ss_tot: f64 = targets.iter().map(|y| (y - mean).powi(2)).sum();
    let r2 = if ss_tot > 0.0 {
        1.0 - ss_res / ss_tot
    } else if ss_res == 0.0 {
        1.0
    } else {
        0.0
    };
    EvaluationReport::Regression {
        test_samples: targets.len(),
        mse: ss_res / n,
        r2,
    }
}

fn classification_report(probabilities: &[f64], targets: &[f64]) -> EvaluationReport {
    let n = targets.len() as f64;
    let correct = probabilities
        .iter()
        .zip(targets)
        .filter(|(p, y)| (**p > 0.5) == (**y > 0.5))
        .count();
    let brier: f64 = probabilities
        .iter()
        .zip(targets)
        .map(|(p, y)| (p - y).powi(2))
        .sum::<f64>()
        / n;
    EvaluationReport::Classification {
        test_samples: targets.len(),
        accuracy: correct as f64 / n,
        brier,
    }
}
