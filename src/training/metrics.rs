//! Running metrics reported during an epoch

use serde::{Deserialize, Serialize};

/// Loss smoothed as a pairwise mean: the first value as-is, then
/// `running = (running + loss) / 2`
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunningLoss {
    value: Option<f64>,
}

impl RunningLoss {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, loss: f64) -> f64 {
        let next = match self.value {
            Some(prev) => (prev + loss) / 2.0,
            None => loss,
        };
        self.value = Some(next);
        next
    }

    /// Current value, 0 before the first update
    pub fn value(&self) -> f64 {
        self.value.unwrap_or(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_none()
    }
}

/// Correct predictions over samples seen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunningAccuracy {
    pub correct: usize,
    pub seen: usize,
}

impl RunningAccuracy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, correct: usize, batch_len: usize) {
        self.correct += correct;
        self.seen += batch_len;
    }

    /// Accuracy in percent
    pub fn percent(&self) -> f64 {
        if self.seen == 0 {
            0.0
        } else {
            100.0 * self.correct as f64 / self.seen as f64
        }
    }
}

/// Whether batch `batch_idx` (0-based) falls on an every-`every` schedule.
/// The first batch always does.
pub fn on_schedule(batch_idx: usize, every: usize) -> bool {
    batch_idx % every.max(1) == 0
}

/// Batches between test sessions when `sessions` are wanted per epoch
pub fn test_session_stride(num_batches: usize, sessions: usize) -> usize {
    (num_batches / sessions.max(1)).max(1)
}

/// Summary of one epoch, stored in the training history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub epoch: usize,
    pub train_loss: f64,
    pub train_accuracy: f64,
    pub val_loss: f64,
    pub val_accuracy: f64,
    /// Accuracy of the last test session in the epoch, if one ran
    pub test_accuracy: Option<f64>,
    pub duration_secs: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_loss_recurrence() {
        let mut loss = RunningLoss::new();
        assert!(loss.is_empty());
        assert_eq!(loss.value(), 0.0);

        assert_eq!(loss.update(1.0), 1.0);
        assert_eq!(loss.update(0.5), 0.75);
        assert_eq!(loss.update(0.25), 0.5);
        assert_eq!(loss.value(), 0.5);
    }

    #[test]
    fn test_running_accuracy_counts_samples() {
        let mut acc = RunningAccuracy::new();
        assert_eq!(acc.percent(), 0.0);

        acc.update(3, 4);
        acc.update(1, 2);

        assert_eq!(acc.seen, 6);
        assert!((acc.percent() - 100.0 * 4.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_schedule_includes_first_batch() {
        let logged: Vec<usize> = (0..25).filter(|&i| on_schedule(i, 10)).collect();
        assert_eq!(logged, vec![0, 10, 20]);
        assert!(on_schedule(3, 0));
    }

    #[test]
    fn test_session_count_per_epoch() {
        let sessions = |num_batches: usize, interval: usize| {
            let stride = test_session_stride(num_batches, interval);
            (0..num_batches).filter(|&i| on_schedule(i, stride)).count()
        };
        assert_eq!(test_session_stride(100, 10), 10);
        assert_eq!(sessions(100, 10), 10);
        assert_eq!(sessions(10, 3), 4);
        assert_eq!(sessions(2, 10), 2);
        assert_eq!(sessions(1, 10), 1);
    }
}
