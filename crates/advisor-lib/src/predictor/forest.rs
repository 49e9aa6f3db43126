//! Bagged decision-tree ensembles
//!
//! Trees are grown with exact-greedy CART splits on bootstrap samples. Each
//! tree owns an RNG seeded from `seed + tree_index`, so trees can be built in
//! parallel and the fitted forest is still identical from run to run.

use crate::error::{EstimatorError, TrainingError};
use crate::models::PredictionResult;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default number of trees per forest
pub const DEFAULT_N_ESTIMATORS: usize = 100;

/// Default depth cap per tree
pub const DEFAULT_MAX_DEPTH: usize = 14;

/// Split quality measure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Criterion {
    /// Sum of squared deviations from the node mean
    SquaredError,
    /// Gini impurity over binary labels
    Gini,
}

impl Criterion {
    /// Impurity of `n` samples with target sum `sum` and squared sum `sum_sq`,
    /// weighted by `n`
    fn weighted_impurity(&self, n: f64, sum: f64, sum_sq: f64) -> f64 {
        if n <= 0.0 {
            return 0.0;
        }
        match self {
            Criterion::SquaredError => (sum_sq - sum * sum / n).max(0.0),
            Criterion::Gini => {
                let p = sum / n;
                n * 2.0 * p * (1.0 - p)
            }
        }
    }
}

/// Forest hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestConfig {
    pub n_estimators: usize,
    /// `None` grows trees until leaves are pure or too small
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: DEFAULT_N_ESTIMATORS,
            max_depth: Some(DEFAULT_MAX_DEPTH),
            min_samples_split: 2,
            min_samples_leaf: 1,
            seed: 42,
        }
    }
}

impl ForestConfig {
    fn validate(&self) -> Result<(), TrainingError> {
        if self.n_estimators == 0 {
            return Err(TrainingError::InvalidConfig("n_estimators must be at least 1".into()));
        }
        if self.min_samples_leaf == 0 {
            return Err(TrainingError::InvalidConfig("min_samples_leaf must be at least 1".into()));
        }
        if self.min_samples_split < 2 {
            return Err(TrainingError::InvalidConfig("min_samples_split must be at least 2".into()));
        }
        if self.max_depth == Some(0) {
            return Err(TrainingError::InvalidConfig("max_depth must be at least 1".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

/// A single fitted tree stored as a node arena, root at index 0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    /// `x` must hold at least as many values as the forest was fitted on
    pub(crate) fn predict(&self, x: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if x[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match &nodes[idx] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        walk(&self.nodes, 0)
    }

    /// Check node links and feature indices, so a decoded tree cannot panic
    fn check(&self, n_features: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            if let Node::Split {
                feature, left, right, ..
            } = node
            {
                if *feature >= n_features {
                    return Err(format!("node {} splits on feature {} of {}", idx, feature, n_features));
                }
                // Children are always pushed after their parent
                if *left <= idx || *right <= idx || *left >= self.nodes.len() || *right >= self.nodes.len() {
                    return Err(format!("node {} has invalid children", idx));
                }
            }
        }
        Ok(())
    }
}

/// Grows one tree from a bootstrap sample
struct TreeBuilder<'a> {
    x: &'a [Vec<f64>],
    y: &'a [f64],
    criterion: Criterion,
    max_features: usize,
    config: &'a ForestConfig,
    rng: StdRng,
    nodes: Vec<Node>,
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    cost: f64,
}

impl<'a> TreeBuilder<'a> {
    fn build(mut self, mut indices: Vec<usize>) -> DecisionTree {
        self.grow(&mut indices, 0);
        DecisionTree { nodes: self.nodes }
    }

    fn grow(&mut self, indices: &mut [usize], depth: usize) -> usize {
        let node_idx = self.nodes.len();
        let n = indices.len() as f64;
        let (sum, sum_sq) = self.sums(indices);
        self.nodes.push(Node::Leaf { value: sum / n });

        let depth_reached = self.config.max_depth.map_or(false, |max| depth >= max);
        if depth_reached
            || indices.len() < self.config.min_samples_split
            || indices.len() < 2 * self.config.min_samples_leaf
            || self.criterion.weighted_impurity(n, sum, sum_sq) <= f64::EPSILON
        {
            return node_idx;
        }

        let Some(split) = self.find_best_split(indices) else {
            return node_idx;
        };

        let mid = partition(indices, |i| self.x[i][split.feature] <= split.threshold);
        let (left_indices, right_indices) = indices.split_at_mut(mid);
        let left = self.grow(left_indices, depth + 1);
        let right = self.grow(right_indices, depth + 1);

        self.nodes[node_idx] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        node_idx
    }

    fn sums(&self, indices: &[usize]) -> (f64, f64) {
        indices.iter().fold((0.0, 0.0), |(s, sq), &i| {
            let y = self.y[i];
            (s + y, sq + y * y)
        })
    }

    fn candidate_features(&mut self) -> Vec<usize> {
        let n_features = self.x[0].len();
        if self.max_features >= n_features {
            return (0..n_features).collect();
        }
        let mut picked = rand::seq::index::sample(&mut self.rng, n_features, self.max_features).into_vec();
        picked.sort_unstable();
        picked
    }

    fn find_best_split(&mut self, indices: &[usize]) -> Option<SplitCandidate> {
        let n = indices.len();
        let min_leaf = self.config.min_samples_leaf;
        let (total_sum, total_sq) = self.sums(indices);
        let mut best: Option<SplitCandidate> = None;
        let mut column: Vec<(f64, f64)> = Vec::with_capacity(n);

        for feature in self.candidate_features() {
            column.clear();
            column.extend(indices.iter().map(|&i| (self.x[i][feature], self.y[i])));
            column.sort_by(|a, b| a.0.total_cmp(&b.0));

            let (mut left_sum, mut left_sq) = (0.0, 0.0);
            for pos in 0..n - 1 {
                let (value, y) = column[pos];
                left_sum += y;
                left_sq += y * y;

                let next = column[pos + 1].0;
                if value == next {
                    continue;
                }
                let left_n = pos + 1;
                let right_n = n - left_n;
                if left_n < min_leaf || right_n < min_leaf {
                    continue;
                }

                let cost = self.criterion.weighted_impurity(left_n as f64, left_sum, left_sq)
                    + self.criterion.weighted_impurity(
                        right_n as f64,
                        total_sum - left_sum,
                        total_sq - left_sq,
                    );
                if best.as_ref().map_or(true, |b| cost < b.cost) {
                    let mut threshold = value + (next - value) / 2.0;
                    if threshold >= next {
                        threshold = value;
                    }
                    best = Some(SplitCandidate {
                        feature,
                        threshold,
                        cost,
                    });
                }
            }
        }

        best
    }
}

/// Stable in-place partition, returns the number of elements matching `pred`
fn partition(indices: &mut [usize], pred: impl Fn(usize) -> bool) -> usize {
    let (left, right): (Vec<usize>, Vec<usize>) = indices.iter().partition(|&&i| pred(i));
    let mid = left.len();
    indices[..mid].copy_from_slice(&left);
    indices[mid..].copy_from_slice(&right);
    mid
}

/// Ensemble of trees sharing one input width
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forest {
    trees: Vec<DecisionTree>,
    n_features: usize,
    criterion: Criterion,
}

impl Forest {
    fn fit(
        x: &[Vec<f64>],
        y: &[f64],
        criterion: Criterion,
        max_features: usize,
        config: &ForestConfig,
    ) -> Result<Self, TrainingError> {
        config.validate()?;
        if x.is_empty() || y.is_empty() {
            return Err(TrainingError::EmptyDataset);
        }
        if x.len() != y.len() {
            return Err(TrainingError::InvalidConfig(format!(
                "{} feature rows but {} targets",
                x.len(),
                y.len()
            )));
        }
        let n_features = x[0].len();
        if n_features == 0 || x.iter().any(|row| row.len() != n_features) {
            return Err(TrainingError::InvalidConfig("feature rows must share a non-zero width".into()));
        }

        let n = x.len();
        let trees: Vec<DecisionTree> = (0..config.n_estimators)
            .into_par_iter()
            .map(|tree_idx| {
                let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(tree_idx as u64));
                let bootstrap: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                let builder = TreeBuilder {
                    x,
                    y,
                    criterion,
                    max_features,
                    config,
                    rng,
                    nodes: Vec::new(),
                };
                builder.build(bootstrap)
            })
            .collect();

        debug!(
            trees = trees.len(),
            samples = n,
            features = n_features,
            criterion = ?criterion,
            "Fitted forest"
        );

        Ok(Self {
            trees,
            n_features,
            criterion,
        })
    }

    fn mean_output(&self, x: &[f64]) -> Result<f64, EstimatorError> {
        if x.len() != self.n_features {
            return Err(EstimatorError::FeatureCountMismatch {
                expected: self.n_features,
                actual: x.len(),
            });
        }
        if self.trees.is_empty() {
            return Err(EstimatorError::EmptyEnsemble);
        }
        let total: f64 = self.trees.iter().map(|tree| tree.predict(x)).sum();
        Ok(total / self.trees.len() as f64)
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    fn check(&self) -> Result<(), String> {
        if self.trees.is_empty() {
            return Err("forest has no trees".to_string());
        }
        self.trees
            .iter()
            .enumerate()
            .try_for_each(|(i, tree)| tree.check(self.n_features).map_err(|e| format!("tree {}: {}", i, e)))
    }
}

/// Random-forest regressor: mean of tree outputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestRegressor {
    forest: Forest,
}

impl ForestRegressor {
    /// Fit on all features at every split
    pub fn fit(x: &[Vec<f64>], y: &[f64], config: &ForestConfig) -> Result<Self, TrainingError> {
        let width = x.first().map_or(0, Vec::len);
        let forest = Forest::fit(x, y, Criterion::SquaredError, width, config)?;
        Ok(Self { forest })
    }

    pub fn predict(&self, x: &[f64]) -> Result<f64, EstimatorError> {
        self.forest.mean_output(x)
    }

    pub fn forest(&self) -> &Forest {
        &self.forest
    }
}

/// Random-forest binary classifier: mean of leaf positive-class fractions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestClassifier {
    forest: Forest,
}

impl ForestClassifier {
    /// Fit on `floor(sqrt(F))` randomly chosen features per split
    pub fn fit(x: &[Vec<f64>], labels: &[u8], config: &ForestConfig) -> Result<Self, TrainingError> {
        if let Some(bad) = labels.iter().find(|&&label| label > 1) {
            return Err(TrainingError::InvalidConfig(format!("label {} is not binary", bad)));
        }
        let width = x.first().map_or(0, Vec::len);
        let max_features = ((width as f64).sqrt() as usize).max(1);
        let y: Vec<f64> = labels.iter().map(|&label| f64::from(label)).collect();
        let forest = Forest::fit(x, &y, Criterion::Gini, max_features, config)?;
        Ok(Self { forest })
    }

    /// Probability of the positive (failure) class
    pub fn predict_proba(&self, x: &[f64]) -> Result<f64, EstimatorError> {
        self.forest.mean_output(x)
    }

    /// Label by majority probability; ties go to the negative class
    pub fn predict(&self, x: &[f64]) -> Result<u8, EstimatorError> {
        Ok(u8::from(self.predict_proba(x)? > 0.5))
    }

    pub fn forest(&self) -> &Forest {
        &self.forest
    }
}

/// The fitted estimator held by a model artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Estimator {
    Regressor(ForestRegressor),
    Classifier(ForestClassifier),
}

impl Estimator {
    pub fn predict(&self, x: &[f64]) -> Result<PredictionResult, EstimatorError> {
        match self {
            Estimator::Regressor(model) => model.predict(x).map(PredictionResult::Range),
            Estimator::Classifier(model) => {
                let probability = model.predict_proba(x)?;
                Ok(PredictionResult::Failure {
                    label: u8::from(probability > 0.5),
                    probability,
                })
            }
        }
    }

    pub fn forest(&self) -> &Forest {
        match self {
            Estimator::Regressor(model) => model.forest(),
            Estimator::Classifier(model) => model.forest(),
        }
    }

    pub fn n_features(&self) -> usize {
        self.forest().n_features()
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Estimator::Regressor(_) => "regressor",
            Estimator::Classifier(_) => "classifier",
        }
    }

    /// Structural check run on decoded estimators
    pub fn check(&self) -> Result<(), String> {
        self.forest().check()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config(n_estimators: usize) -> ForestConfig {
        ForestConfig {
            n_estimators,
            max_depth: Some(6),
            seed: 7,
            ..Default::default()
        }
    }

    fn step_data() -> (Vec<Vec<f64>>, Vec<f64>) {
        // y = 10 below x0 = 5, 20 above; x1 is noise
        let x: Vec<Vec<f64>> = (0..40).map(|i| vec![i as f64 / 4.0, ((i * 7) % 5) as f64]).collect();
        let y = x.iter().map(|row| if row[0] < 5.0 { 10.0 } else { 20.0 }).collect();
        (x, y)
    }

    #[test]
    fn test_single_tree_learns_step() {
        let (x, y) = step_data();
        let builder = TreeBuilder {
            x: &x,
            y: &y,
            criterion: Criterion::SquaredError,
            max_features: 2,
            config: &small_config(1),
            rng: StdRng::seed_from_u64(1),
            nodes: Vec::new(),
        };
        let tree = builder.build((0..x.len()).collect());

        assert_eq!(tree.predict(&[1.0, 0.0]), 10.0);
        assert_eq!(tree.predict(&[9.0, 0.0]), 20.0);
        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.node_count(), 3);
    }

    #[test]
    fn test_pure_node_is_leaf() {
        let x = vec![vec![1.0], vec![2.0], vec![3.0]];
        let y = vec![4.0, 4.0, 4.0];
        let builder = TreeBuilder {
            x: &x,
            y: &y,
            criterion: Criterion::SquaredError,
            max_features: 1,
            config: &small_config(1),
            rng: StdRng::seed_from_u64(1),
            nodes: Vec::new(),
        };
        let tree = builder.build(vec![0, 1, 2]);
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.predict(&[10.0]), 4.0);
    }

    #[test]
    fn test_regressor_fits_step() {
        let (x, y) = step_data();
        let model = ForestRegressor::fit(&x, &y, &small_config(15)).unwrap();
        assert!((model.predict(&[0.5, 1.0]).unwrap() - 10.0).abs() < 2.0);
        assert!((model.predict(&[9.5, 1.0]).unwrap() - 20.0).abs() < 2.0);
        assert_eq!(model.forest().n_trees(), 15);
    }

    #[test]
    fn test_fit_is_deterministic() {
        let (x, y) = step_data();
        let a = ForestRegressor::fit(&x, &y, &small_config(8)).unwrap();
        let b = ForestRegressor::fit(&x, &y, &small_config(8)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_seed_changes_bootstrap() {
        let (x, y) = step_data();
        let a = ForestRegressor::fit(&x, &y, &small_config(8)).unwrap();
        let mut config = small_config(8);
        config.seed = 8;
        let b = ForestRegressor::fit(&x, &y, &config).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_classifier_probability_bounds_and_label() {
        let x: Vec<Vec<f64>> = (0..60).map(|i| vec![i as f64, (i % 3) as f64]).collect();
        let labels: Vec<u8> = (0..60).map(|i| u8::from(i >= 30)).collect();
        let model = ForestClassifier::fit(&x, &labels, &small_config(20)).unwrap();

        let low = model.predict_proba(&[2.0, 0.0]).unwrap();
        let high = model.predict_proba(&[58.0, 0.0]).unwrap();
        assert!((0.0..=1.0).contains(&low));
        assert!((0.0..=1.0).contains(&high));
        assert!(high > low);
        assert_eq!(model.predict(&[58.0, 0.0]).unwrap(), 1);
        assert_eq!(model.predict(&[2.0, 0.0]).unwrap(), 0);
    }

    #[test]
    fn test_feature_count_mismatch() {
        let (x, y) = step_data();
        let model = ForestRegressor::fit(&x, &y, &small_config(2)).unwrap();
        assert_eq!(
            model.predict(&[1.0]).unwrap_err(),
            EstimatorError::FeatureCountMismatch { expected: 2, actual: 1 }
        );
    }

    #[test]
    fn test_short_input_is_rejected_by_every_entry_point() {
        let x: Vec<Vec<f64>> = (0..40).map(|i| vec![i as f64, (i % 4) as f64]).collect();
        let labels: Vec<u8> = (0..40).map(|i| u8::from(i >= 20)).collect();
        let classifier = ForestClassifier::fit(&x, &labels, &small_config(5)).unwrap();
        assert!(matches!(
            classifier.predict_proba(&[]),
            Err(EstimatorError::FeatureCountMismatch { expected: 2, actual: 0 })
        ));

        let estimator = Estimator::Classifier(classifier);
        assert!(matches!(
            estimator.predict(&[3.0]),
            Err(EstimatorError::FeatureCountMismatch { expected: 2, actual: 1 })
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let (x, y) = step_data();
        let config = ForestConfig {
            n_estimators: 0,
            ..Default::default()
        };
        assert!(matches!(
            ForestRegressor::fit(&x, &y, &config),
            Err(TrainingError::InvalidConfig(_))
        ));
        assert!(matches!(
            ForestRegressor::fit(&[], &[], &ForestConfig::default()),
            Err(TrainingError::EmptyDataset)
        ));
    }

    #[test]
    fn test_non_binary_labels_rejected() {
        let x = vec![vec![1.0], vec![2.0]];
        assert!(ForestClassifier::fit(&x, &[0, 2], &small_config(1)).is_err());
    }

    #[test]
    fn test_estimator_result_shapes() {
        let (x, y) = step_data();
        let regressor = Estimator::Regressor(ForestRegressor::fit(&x, &y, &small_config(3)).unwrap());
        assert!(matches!(regressor.predict(&[1.0, 1.0]).unwrap(), PredictionResult::Range(_)));
        assert_eq!(regressor.type_name(), "regressor");
        assert!(regressor.check().is_ok());
    }

    #[test]
    fn test_check_rejects_corrupt_tree() {
        let tree = DecisionTree {
            nodes: vec![Node::Split {
                feature: 0,
                threshold: 1.0,
                left: 0,
                right: 5,
            }],
        };
        assert!(tree.check(1).is_err());
        let tree = DecisionTree {
            nodes: vec![Node::Leaf { value: 1.0 }],
        };
        assert!(tree.check(1).is_ok());
    }
}
