//! Training loop
//!
//! A hand-written loop over shuffled batches rather than Burn's
//! `LearnerBuilder`, so test sessions can be interleaved with training and
//! checkpoints carry exactly the state needed to resume.

use std::fs;
use std::time::Instant;

use burn::data::dataloader::batcher::Batcher;
use burn::module::AutodiffModule;
use burn::optim::decay::WeightDecayConfig;
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::ElementConversion;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

use super::checkpoint::{CheckpointManager, CheckpointState};
use super::config::{TrainingConfig, CONFIG_FILE};
use super::evaluate::{evaluate, evaluate_with_logging};
use super::history::{TrainingHistory, HISTORY_FILE};
use super::metrics::{
    on_schedule, test_session_stride, EpochMetrics, RunningAccuracy, RunningLoss,
};
use crate::dataset::burn_dataset::load_batch;
use crate::dataset::{
    discover_test_samples, discover_training_samples, random_split, subset_length,
    train_validation_lengths, BatchPlan, DatasetStats, DetectorBatch, DetectorBatcher,
    DetectorDataset, ImageTransform, Sample,
};
use crate::model::HighFreqVitClassifier;
use crate::utils::error::{DetectorError, Result};
use crate::utils::logging::TrainingLogger;

/// Train/validation/test datasets for one run
pub struct DatasetSplits {
    pub train: DetectorDataset,
    pub validation: DetectorDataset,
    pub test: DetectorDataset,
}

/// Discover images and split them according to `config`
pub fn prepare_datasets(config: &TrainingConfig, rng: &mut ChaCha8Rng) -> Result<DatasetSplits> {
    let samples = discover_training_samples(
        &config.train_dir,
        &config.real_folder,
        &config.fake_folder,
        config.real_samples,
        rng,
    )?;
    DatasetStats::from_samples(&samples).print("Training images");

    let (train_len, val_len) = train_validation_lengths(samples.len(), config.train_fraction);
    if train_len == 0 {
        return Err(DetectorError::Dataset(format!(
            "{} images leave no training split at fraction {}",
            samples.len(),
            config.train_fraction
        )));
    }
    let mut parts = random_split(samples, &[train_len, val_len], rng)?.into_iter();
    let train = parts.next().unwrap_or_default();
    let validation = parts.next().unwrap_or_default();

    let test_samples = discover_test_samples(&config.test_root, Some(config.labels_path().as_path()))?;
    let test_len = subset_length(test_samples.len(), config.test_fraction);
    let test = random_split(test_samples, &[test_len], rng)?
        .into_iter()
        .next()
        .unwrap_or_default();

    info!(
        "Split: {} train | {} validation | {} test",
        train.len(),
        validation.len(),
        test.len()
    );
    if test.is_empty() {
        warn!("Test subset is empty; test sessions will be skipped");
    }

    let transform = ImageTransform::new(config.model.image_size);
    let build = |samples: Vec<Sample>| {
        if config.cache_images {
            DetectorDataset::new_cached(samples, transform.clone())
        } else {
            DetectorDataset::new(samples, transform.clone())
        }
    };

    Ok(DatasetSplits {
        train: build(train),
        validation: build(validation),
        test: build(test),
    })
}

/// Run a full training session and return the per-epoch history.
///
/// With `use_checkpoint` set, the newest checkpoint in `save_path` is
/// restored and every epoch up to and including its epoch is skipped.
pub fn run_training<B: AutodiffBackend>(
    config: &TrainingConfig,
    device: &B::Device,
) -> Result<TrainingHistory> {
    config.validate()?;
    fs::create_dir_all(&config.save_path)?;
    config.save(&config.save_path.join(CONFIG_FILE))?;
    config.log_summary();

    if config.num_workers > 0 {
        if let Err(e) = rayon::ThreadPoolBuilder::new()
            .num_threads(config.num_workers)
            .build_global()
        {
            debug!("Rayon pool already configured: {}", e);
        }
    }

    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let splits = prepare_datasets(config, &mut rng)?;

    let batcher = DetectorBatcher::new(config.model.image_size);
    let mut model = config.model.init::<B>(device)?;
    let mut optimizer = AdamConfig::new()
        .with_weight_decay(Some(WeightDecayConfig::new(config.weight_decay as f32)))
        .init::<B, HighFreqVitClassifier<B>>();

    let manager = CheckpointManager::new(&config.save_path);
    let mut history = TrainingHistory::new();
    let mut resume_epoch = 0;

    if config.use_checkpoint {
        match manager.latest()? {
            Some(manifest) => {
                let (restored_model, restored_optim) =
                    manager.load_into(&manifest, &config.model, model, optimizer, device)?;
                model = restored_model;
                optimizer = restored_optim;
                resume_epoch = manifest.epoch;
                history = previous_history(config, resume_epoch);
                history.resumed_from = Some(resume_epoch);
                info!(
                    "Resuming after epoch {} (train loss {:.4}, val loss {:.4})",
                    manifest.epoch, manifest.train_loss, manifest.val_loss
                );
            }
            None => warn!(
                "No checkpoint found in {:?}; starting from scratch",
                config.save_path
            ),
        }
    }

    let mut logger = TrainingLogger::new(config.num_epochs);

    for epoch in 1..=config.num_epochs {
        if epoch <= resume_epoch {
            logger.log_skipped(epoch, resume_epoch);
            continue;
        }

        logger.start_epoch(epoch);
        let epoch_start = Instant::now();

        let plan = BatchPlan::shuffled(splits.train.samples().len(), config.batch_size, &mut rng);
        let num_batches = plan.num_batches();
        let test_every = test_session_stride(num_batches, config.test_interval);

        let mut running_loss = RunningLoss::new();
        let mut accuracy = RunningAccuracy::new();
        let mut last_test_accuracy = None;

        for (batch_idx, indices) in plan.batches().enumerate() {
            let items = load_batch(&splits.train, indices);
            if items.is_empty() {
                continue;
            }

            let batch: DetectorBatch<B> = batcher.batch(items, device);
            let output = model.classify(batch.images, batch.targets);

            let correct = output
                .predictions
                .iter()
                .zip(&batch.labels)
                .filter(|(predicted, actual)| predicted == actual)
                .count();
            accuracy.update(correct, batch.labels.len());

            let loss_value: f64 = output.loss.clone().into_scalar().elem();
            running_loss.update(loss_value);

            let grads = output.loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optimizer.step(config.learning_rate, model, grads);

            if on_schedule(batch_idx, config.log_every) {
                info!(
                    "[train] epoch {} | batch {}/{} | acc {:.3}% | loss {:.5} | {:.1}s",
                    epoch,
                    batch_idx + 1,
                    num_batches,
                    accuracy.percent(),
                    running_loss.value(),
                    epoch_start.elapsed().as_secs_f64()
                );
            }

            if on_schedule(batch_idx, test_every) && !splits.test.samples().is_empty() {
                let test = evaluate(&model.valid(), &splits.test, config.batch_size);
                info!(
                    "[test] epoch {} | batch {}/{} | acc {:.3}% | loss {:.5} | {:.1}s",
                    epoch,
                    batch_idx + 1,
                    num_batches,
                    test.accuracy,
                    test.loss,
                    test.duration_secs
                );
                last_test_accuracy = Some(test.accuracy);
            }
        }

        let validation = evaluate_with_logging(
            &model.valid(),
            &splits.validation,
            config.batch_size,
            Some(("val", config.log_every)),
        );

        logger.end_epoch(running_loss.value(), validation.running_loss, validation.accuracy);
        history.push(EpochMetrics {
            epoch,
            train_loss: running_loss.value(),
            train_accuracy: accuracy.percent(),
            val_loss: validation.running_loss,
            val_accuracy: validation.accuracy,
            test_accuracy: last_test_accuracy,
            duration_secs: epoch_start.elapsed().as_secs_f64(),
        });

        if epoch % config.checkpoint_every == 0 {
            manager.save(
                CheckpointState {
                    epoch,
                    train_loss: running_loss.value(),
                    val_loss: validation.running_loss,
                    val_accuracy: validation.accuracy,
                },
                &config.model,
                &model,
                &optimizer,
            )?;
        }
    }

    history.save_artifacts(&config.save_path)?;
    logger.log_complete();

    if let Some(best) = history.best_epoch() {
        info!(
            "Best validation accuracy {:.3}% at epoch {}",
            best.val_accuracy, best.epoch
        );
    }

    Ok(history)
}

/// History of an earlier run in `save_path`, cut back to `resume_epoch`
fn previous_history(config: &TrainingConfig, resume_epoch: usize) -> TrainingHistory {
    let path = config.save_path.join(HISTORY_FILE);
    match TrainingHistory::load_json(&path) {
        Ok(mut history) => {
            history.epochs.retain(|m| m.epoch <= resume_epoch);
            history
        }
        Err(e) => {
            debug!("No previous history at {:?}: {}", path, e);
            TrainingHistory::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::HighFreqVitConfig;
    use std::path::Path;
    use tempfile::TempDir;

    fn write_image(path: &Path, seed: u8) {
        let img = image::ImageBuffer::from_fn(8, 8, |x, y| {
            image::Rgb([seed.wrapping_add((x * 17) as u8), (y * 23) as u8, seed])
        });
        img.save(path).unwrap();
    }

    fn dataset_fixture(root: &Path, real: usize, generated: usize, test: usize) {
        let real_dir = root.join("train/real");
        let fake_dir = root.join("train/generated");
        let test_dir = root.join("test");
        for dir in [&real_dir, &fake_dir, &test_dir] {
            fs::create_dir_all(dir).unwrap();
        }
        for i in 0..real {
            write_image(&real_dir.join(format!("r{}.jpg", i)), i as u8);
        }
        for i in 0..generated {
            write_image(&fake_dir.join(format!("g{}.png", i)), 200 - i as u8);
        }
        let mut csv = String::from("label\n");
        for i in 0..test {
            write_image(&test_dir.join(format!("t{:02}.jpg", i)), 100 + i as u8);
            csv.push_str(if i % 2 == 0 { "real\n" } else { "generated\n" });
        }
        fs::write(test_dir.join("test_labels.csv"), csv).unwrap();
    }

    #[test]
    fn test_prepare_datasets_split_sizes() {
        let dir = TempDir::new().unwrap();
        dataset_fixture(dir.path(), 6, 4, 20);

        let config = TrainingConfig {
            train_dir: dir.path().join("train"),
            test_root: dir.path().to_path_buf(),
            model: HighFreqVitConfig::tiny(8),
            ..TrainingConfig::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let splits = prepare_datasets(&config, &mut rng).unwrap();

        assert_eq!(splits.train.samples().len(), 8);
        assert_eq!(splits.validation.samples().len(), 2);
        assert_eq!(splits.test.samples().len(), 2);
    }

    #[test]
    fn test_prepare_datasets_requires_training_split() {
        let dir = TempDir::new().unwrap();
        dataset_fixture(dir.path(), 1, 0, 2);

        let config = TrainingConfig {
            train_dir: dir.path().join("train"),
            test_root: dir.path().to_path_buf(),
            model: HighFreqVitConfig::tiny(8),
            ..TrainingConfig::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(prepare_datasets(&config, &mut rng).is_err());
    }
}
