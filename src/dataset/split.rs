//! Random splits and per-epoch batch ordering

use rand::seq::SliceRandom;
use rand::Rng;

use crate::utils::error::{DetectorError, Result};

/// Shuffle `items` and partition them into consecutive parts of `lengths`.
///
/// Items beyond `lengths.iter().sum()` are dropped.
pub fn random_split<T, R: Rng + ?Sized>(
    mut items: Vec<T>,
    lengths: &[usize],
    rng: &mut R,
) -> Result<Vec<Vec<T>>> {
    let requested: usize = lengths.iter().sum();
    if requested > items.len() {
        return Err(DetectorError::Dataset(format!(
            "split lengths sum to {} but only {} items are available",
            requested,
            items.len()
        )));
    }

    items.shuffle(rng);
    items.truncate(requested);

    let mut parts = Vec::with_capacity(lengths.len());
    let mut rest = items.into_iter();
    for &len in lengths {
        parts.push(rest.by_ref().take(len).collect());
    }
    Ok(parts)
}

/// `(train, validation)` lengths: `train = floor(n * train_fraction)`
pub fn train_validation_lengths(n: usize, train_fraction: f64) -> (usize, usize) {
    let train = subset_length(n, train_fraction);
    (train, n - train)
}

/// `floor(n * fraction)`, clamped to `n`
pub fn subset_length(n: usize, fraction: f64) -> usize {
    ((n as f64 * fraction.clamp(0.0, 1.0)).floor() as usize).min(n)
}

/// Shuffled index order for one epoch, served in fixed-size chunks
#[derive(Debug, Clone)]
pub struct BatchPlan {
    indices: Vec<usize>,
    batch_size: usize,
}

impl BatchPlan {
    /// Shuffle `0..len` and plan batches of `batch_size` (the last may be short)
    pub fn shuffled<R: Rng + ?Sized>(len: usize, batch_size: usize, rng: &mut R) -> Self {
        let mut indices: Vec<usize> = (0..len).collect();
        indices.shuffle(rng);
        Self {
            indices,
            batch_size: batch_size.max(1),
        }
    }

    /// In-order plan, used for evaluation
    pub fn sequential(len: usize, batch_size: usize) -> Self {
        Self {
            indices: (0..len).collect(),
            batch_size: batch_size.max(1),
        }
    }

    pub fn num_batches(&self) -> usize {
        self.indices.len().div_ceil(self.batch_size)
    }

    pub fn num_items(&self) -> usize {
        self.indices.len()
    }

    pub fn batches(&self) -> impl Iterator<Item = &[usize]> {
        self.indices.chunks(self.batch_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_train_validation_lengths_cover_all() {
        for n in [0, 1, 7, 10, 123] {
            let (train, val) = train_validation_lengths(n, 0.8);
            assert_eq!(train + val, n);
        }
        assert_eq!(train_validation_lengths(10, 0.8), (8, 2));
        assert_eq!(train_validation_lengths(7, 0.8), (5, 2));
    }

    #[test]
    fn test_subset_length_floors() {
        assert_eq!(subset_length(25, 0.1), 2);
        assert_eq!(subset_length(9, 0.1), 0);
        assert_eq!(subset_length(10, 1.5), 10);
    }

    #[test]
    fn test_random_split_partitions() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let parts = random_split((0..10).collect::<Vec<_>>(), &[8, 2], &mut rng).unwrap();

        assert_eq!(parts[0].len(), 8);
        assert_eq!(parts[1].len(), 2);

        let mut all: Vec<i32> = parts.concat();
        all.sort();
        assert_eq!(all, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_random_split_discards_remainder() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let parts = random_split((0..20).collect::<Vec<_>>(), &[2], &mut rng).unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].len(), 2);
    }

    #[test]
    fn test_random_split_rejects_oversized_lengths() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(random_split(vec![1, 2, 3], &[2, 2], &mut rng).is_err());
    }

    #[test]
    fn test_random_split_is_seeded() {
        let a = random_split((0..50).collect::<Vec<_>>(), &[40, 10], &mut ChaCha8Rng::seed_from_u64(7)).unwrap();
        let b = random_split((0..50).collect::<Vec<_>>(), &[40, 10], &mut ChaCha8Rng::seed_from_u64(7)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_batch_plan_covers_every_index_once() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let plan = BatchPlan::shuffled(10, 4, &mut rng);

        assert_eq!(plan.num_batches(), 3);
        let sizes: Vec<usize> = plan.batches().map(|b| b.len()).collect();
        assert_eq!(sizes, vec![4, 4, 2]);

        let mut seen: Vec<usize> = plan.batches().flatten().copied().collect();
        seen.sort();
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_empty_batch_plan() {
        let plan = BatchPlan::sequential(0, 16);
        assert_eq!(plan.num_batches(), 0);
        assert_eq!(plan.batches().count(), 0);
    }
}
