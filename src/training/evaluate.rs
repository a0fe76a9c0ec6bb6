//! Evaluation over a dataset without gradients

use std::time::Instant;

use burn::data::dataloader::batcher::Batcher;
use burn::prelude::*;
use burn::tensor::ElementConversion;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::metrics::{on_schedule, RunningAccuracy, RunningLoss};
use crate::dataset::burn_dataset::load_batch;
use crate::dataset::{BatchPlan, DetectorBatch, DetectorBatcher, DetectorDataset};
use crate::model::HighFreqVitClassifier;
use crate::utils::metrics::ConfusionMatrix;

/// Outcome of one pass over a dataset
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvaluationResult {
    /// Accuracy in percent
    pub accuracy: f64,
    /// Sample-weighted mean cross-entropy
    pub loss: f64,
    /// Pairwise running loss, as reported during training
    pub running_loss: f64,
    pub confusion: ConfusionMatrix,
    pub num_samples: usize,
    pub duration_secs: f64,
}

/// Evaluate `model` over `dataset` in order
pub fn evaluate<B: Backend>(
    model: &HighFreqVitClassifier<B>,
    dataset: &DetectorDataset,
    batch_size: usize,
) -> EvaluationResult {
    evaluate_with_logging(model, dataset, batch_size, None)
}

/// Evaluate and log running metrics every `log_every` batches under `phase`
pub fn evaluate_with_logging<B: Backend>(
    model: &HighFreqVitClassifier<B>,
    dataset: &DetectorDataset,
    batch_size: usize,
    progress: Option<(&str, usize)>,
) -> EvaluationResult {
    let start = Instant::now();
    let device = model.head.weight.device();
    let batcher = DetectorBatcher::new(dataset.transform().size);
    let plan = BatchPlan::sequential(dataset.samples().len(), batch_size);
    let num_batches = plan.num_batches();

    let mut running_loss = RunningLoss::new();
    let mut accuracy = RunningAccuracy::new();
    let mut confusion = ConfusionMatrix::new();
    let mut loss_sum = 0.0;

    for (batch_idx, indices) in plan.batches().enumerate() {
        let items = load_batch(dataset, indices);
        if items.is_empty() {
            continue;
        }

        let batch: DetectorBatch<B> = batcher.batch(items, &device);
        let output = model.classify(batch.images, batch.targets);

        let loss: f64 = output.loss.into_scalar().elem();
        let correct = output
            .predictions
            .iter()
            .zip(&batch.labels)
            .filter(|(predicted, actual)| predicted == actual)
            .count();

        running_loss.update(loss);
        accuracy.update(correct, batch.labels.len());
        confusion.extend(&output.predictions, &batch.labels);
        loss_sum += loss * batch.labels.len() as f64;

        if let Some((phase, log_every)) = progress {
            if on_schedule(batch_idx, log_every) {
                info!(
                    "[{}] batch {}/{} | acc {:.2}% | loss {:.4} | {:.1}s",
                    phase,
                    batch_idx + 1,
                    num_batches,
                    accuracy.percent(),
                    running_loss.value(),
                    start.elapsed().as_secs_f64()
                );
            }
        }
    }

    EvaluationResult {
        accuracy: accuracy.percent(),
        loss: if accuracy.seen > 0 {
            loss_sum / accuracy.seen as f64
        } else {
            0.0
        },
        running_loss: running_loss.value(),
        confusion,
        num_samples: accuracy.seen,
        duration_secs: start.elapsed().as_secs_f64(),
    }
}
