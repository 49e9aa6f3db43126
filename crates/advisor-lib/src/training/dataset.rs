//! In-memory labelled dataset and the held-out split

use crate::error::TrainingError;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// Raw records paired with numeric targets
#[derive(Debug, Clone)]
pub struct Dataset<R> {
    pub records: Vec<R>,
    pub targets: Vec<f64>,
}

impl<R: Clone> Dataset<R> {
    pub fn new(records: Vec<R>, targets: Vec<f64>) -> Self {
        debug_assert_eq!(records.len(), targets.len());
        Self { records, targets }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Shuffle with `rng` and hold out `ceil(len * test_fraction)` rows.
    /// Returns `(train, test)`.
    pub fn split(&self, test_fraction: f64, rng: &mut StdRng) -> Result<(Self, Self), TrainingError> {
        if !(test_fraction > 0.0 && test_fraction < 1.0) {
            return Err(TrainingError::InvalidConfig(format!(
                "test_fraction must lie in (0, 1), got {}",
                test_fraction
            )));
        }

        let mut order: Vec<usize> = (0..self.len()).collect();
        order.shuffle(rng);

        let n_test = (self.len() as f64 * test_fraction).ceil() as usize;
        if n_test >= self.len() {
            return Err(TrainingError::EmptyDataset);
        }
        let (test_idx, train_idx) = order.split_at(n_test);
        Ok((self.select(train_idx), self.select(test_idx)))
    }

    fn select(&self, indices: &[usize]) -> Self {
        Self {
            records: indices.iter().map(|&i| self.records[i].clone()).collect(),
            targets: indices.iter().map(|&i| self.targets[i]).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn numbered(n: usize) -> Dataset<usize> {
        Dataset::new((0..n).collect(), (0..n).map(|i| i as f64).collect())
    }

    #[test]
    fn test_split_sizes() {
        let mut rng = StdRng::seed_from_u64(42);
        let (train, test) = numbered(10).split(0.2, &mut rng).unwrap();
        assert_eq!(train.len(), 8);
        assert_eq!(test.len(), 2);
    }

    #[test]
    fn test_split_partitions_rows() {
        let mut rng = StdRng::seed_from_u64(1);
        let (train, test) = numbered(25).split(0.2, &mut rng).unwrap();
        let mut all: Vec<usize> = train.records.iter().chain(test.records.iter()).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..25).collect::<Vec<_>>());
        // records and targets stay paired
        for (record, target) in train.records.iter().zip(&train.targets) {
            assert_eq!(*record as f64, *target);
        }
    }

    #[test]
    fn test_split_is_seeded() {
        let data = numbered(30);
        let (a, _) = data.split(0.2, &mut StdRng::seed_from_u64(3)).unwrap();
        let (b, _) = data.split(0.2, &mut StdRng::seed_from_u64(3)).unwrap();
        assert_eq!(a.records, b.records);
    }

    #[test]
    fn test_split_rejects_bad_fraction() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(numbered(10).split(1.0, &mut rng).is_err());
        assert!(matches!(
            numbered(10).split(0.0, &mut rng),
            Err(TrainingError::InvalidConfig(_))
        ));
        assert!(numbered(10).split(f64::NAN, &mut rng).is_err());
        assert!(numbered(10).split(-0.1, &mut rng).is_err());
        assert!(matches!(
            numbered(1).split(0.5, &mut rng),
            Err(TrainingError::EmptyDataset)
        ));
    }
}
