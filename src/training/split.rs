use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Configuration for the train/test split
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Held-out share of every class (0.0-1.0)
    pub test_fraction: f64,
    /// Random seed for reproducibility
    pub seed: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            seed: 42,
        }
    }
}

impl SplitConfig {
    pub fn validate(&self) -> Result<(), ModelError> {
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(ModelError::Training {
                reason: format!(
                    "test_fraction must be strictly between 0 and 1, got {}",
                    self.test_fraction
                ),
            });
        }
        Ok(())
    }
}

/// Row indices of each side of the split, ascending
#[derive(Debug, Clone, PartialEq)]
pub struct TrainTestSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Split rows so both sides keep the label proportions.
///
/// Each class is shuffled independently and `round(n * test_fraction)` of its
/// rows (at least one, never all) go to the test side.
pub fn stratified_split(
    labels: &[u8],
    config: &SplitConfig,
    rng: &mut StdRng,
) -> Result<TrainTestSplit, ModelError> {
    config.validate()?;

    let mut train = Vec::with_capacity(labels.len());
    let mut test = Vec::new();

    for class in [0u8, 1u8] {
        let mut members: Vec<usize> = labels
            .iter()
            .enumerate()
            .filter(|(_, &label)| label == class)
            .map(|(index, _)| index)
            .collect();

        if members.len() < 2 {
            return Err(ModelError::Training {
                reason: format!(
                    "stratified split needs at least 2 rows labeled {}, found {}",
                    class,
                    members.len()
                ),
            });
        }

        members.shuffle(rng);
        let n_test = ((members.len() as f64 * config.test_fraction).round() as usize)
            .clamp(1, members.len() - 1);

        test.extend_from_slice(&members[..n_test]);
        train.extend_from_slice(&members[n_test..]);
    }

    train.sort_unstable();
    test.sort_unstable();
    Ok(TrainTestSplit { train, test })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn labels(negatives: usize, positives: usize) -> Vec<u8> {
        let mut labels = vec![0u8; negatives];
        labels.extend(std::iter::repeat(1u8).take(positives));
        labels
    }

    #[test]
    fn test_split_keeps_class_proportions() {
        let labels = labels(70, 30);
        let mut rng = StdRng::seed_from_u64(42);
        let split = stratified_split(&labels, &SplitConfig::default(), &mut rng).unwrap();

        assert_eq!(split.test.len(), 20);
        assert_eq!(split.train.len(), 80);
        let test_positives = split.test.iter().filter(|&&i| labels[i] == 1).count();
        assert_eq!(test_positives, 6);

        let mut all: Vec<usize> = split.train.iter().chain(split.test.iter()).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_split_is_reproducible() {
        let labels = labels(40, 25);
        let config = SplitConfig::default();

        let first = stratified_split(&labels, &config, &mut StdRng::seed_from_u64(7)).unwrap();
        let second = stratified_split(&labels, &config, &mut StdRng::seed_from_u64(7)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_split_needs_both_classes() {
        let labels = labels(10, 1);
        let mut rng = StdRng::seed_from_u64(42);
        assert!(stratified_split(&labels, &SplitConfig::default(), &mut rng).is_err());
    }

    #[test]
    fn test_invalid_fraction() {
        let config = SplitConfig {
            test_fraction: 1.0,
            seed: 42,
        };
        assert!(config.validate().is_err());
    }
}
