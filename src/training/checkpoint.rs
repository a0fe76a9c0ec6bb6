//! Model checkpointing and resume support.
//!
//! A checkpoint for epoch `n` is three files in the checkpoint directory:
//! - `detector_<n>.json`: manifest (epoch, losses, model config, timestamp)
//! - `detector_<n>_model.mpk`: model parameters
//! - `detector_<n>_optim.mpk`: optimizer state

use std::fs;
use std::path::{Path, PathBuf};

use burn::module::Module;
use burn::optim::Optimizer;
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder, Recorder};
use burn::tensor::backend::{AutodiffBackend, Backend};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::dataset::NUM_CLASSES;
use crate::model::{HighFreqVitClassifier, HighFreqVitConfig};
use crate::utils::error::{DetectorError, Result};

const PREFIX: &str = "detector_";
const MANIFEST_EXT: &str = ".json";
const RECORD_EXT: &str = "mpk";

type CheckpointRecorder = NamedMpkFileRecorder<FullPrecisionSettings>;

/// Checkpoint manifest written next to the model and optimizer records
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointManifest {
    pub epoch: usize,
    /// Running training loss at the end of the epoch
    pub train_loss: f64,
    pub val_loss: f64,
    pub val_accuracy: f64,
    pub model: HighFreqVitConfig,
    /// Record file stem (without extension) for the model
    pub model_file: String,
    /// Record file stem (without extension) for the optimizer
    pub optimizer_file: String,
    pub timestamp: String,
}

impl CheckpointManifest {
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        let manifest: Self = serde_json::from_str(&json)
            .map_err(|e| DetectorError::Checkpoint(format!("invalid manifest {:?}: {}", path, e)))?;
        Ok(manifest)
    }
}

/// Epoch summary stored in a checkpoint
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CheckpointState {
    pub epoch: usize,
    pub train_loss: f64,
    pub val_loss: f64,
    pub val_accuracy: f64,
}

/// Saves, lists and restores checkpoints in one directory
pub struct CheckpointManager {
    checkpoint_dir: PathBuf,
    recorder: CheckpointRecorder,
}

impl CheckpointManager {
    pub fn new(checkpoint_dir: impl Into<PathBuf>) -> Self {
        Self {
            checkpoint_dir: checkpoint_dir.into(),
            recorder: CheckpointRecorder::new(),
        }
    }

    pub fn checkpoint_dir(&self) -> &Path {
        &self.checkpoint_dir
    }

    /// Manifest path for `epoch`
    pub fn manifest_path(&self, epoch: usize) -> PathBuf {
        self.checkpoint_dir
            .join(format!("{}{}{}", PREFIX, epoch, MANIFEST_EXT))
    }

    /// Save model, optimizer and manifest for `state.epoch`
    pub fn save<B, O>(
        &self,
        state: CheckpointState,
        config: &HighFreqVitConfig,
        model: &HighFreqVitClassifier<B>,
        optimizer: &O,
    ) -> Result<PathBuf>
    where
        B: AutodiffBackend,
        O: Optimizer<HighFreqVitClassifier<B>, B>,
    {
        fs::create_dir_all(&self.checkpoint_dir)?;

        let model_file = format!("{}{}_model", PREFIX, state.epoch);
        let optimizer_file = format!("{}{}_optim", PREFIX, state.epoch);

        model
            .clone()
            .save_file(self.checkpoint_dir.join(&model_file), &self.recorder)?;
        Recorder::<B>::record(
            &self.recorder,
            optimizer.to_record(),
            self.checkpoint_dir.join(&optimizer_file),
        )?;

        let manifest = CheckpointManifest {
            epoch: state.epoch,
            train_loss: state.train_loss,
            val_loss: state.val_loss,
            val_accuracy: state.val_accuracy,
            model: config.clone(),
            model_file,
            optimizer_file,
            timestamp: Utc::now().to_rfc3339(),
        };

        let path = self.manifest_path(state.epoch);
        fs::write(&path, serde_json::to_string_pretty(&manifest)?)?;

        info!("Checkpoint saved to {:?}", path);
        Ok(path)
    }

    /// All checkpoint manifests, sorted by epoch
    pub fn list(&self) -> Result<Vec<(usize, PathBuf)>> {
        if !self.checkpoint_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut checkpoints = Vec::new();
        for entry in fs::read_dir(&self.checkpoint_dir)? {
            let path = entry?.path();
            let epoch = path
                .file_name()
                .and_then(|name| name.to_str())
                .and_then(extract_epoch_from_filename);
            if let (Some(epoch), true) = (epoch, path.is_file()) {
                checkpoints.push((epoch, path));
            }
        }

        checkpoints.sort_by_key(|(epoch, _)| *epoch);
        debug!("Found {} checkpoints in {:?}", checkpoints.len(), self.checkpoint_dir);
        Ok(checkpoints)
    }

    /// Manifest of the highest-epoch checkpoint, if any
    pub fn latest(&self) -> Result<Option<CheckpointManifest>> {
        match self.list()?.pop() {
            Some((_, path)) => CheckpointManifest::load(&path).map(Some),
            None => Ok(None),
        }
    }

    /// Restore model and optimizer state from `manifest`.
    ///
    /// `model` must have been built from `expected`; a checkpoint written for
    /// a differently shaped model is rejected before any record is read.
    pub fn load_into<B, O>(
        &self,
        manifest: &CheckpointManifest,
        expected: &HighFreqVitConfig,
        model: HighFreqVitClassifier<B>,
        optimizer: O,
        device: &B::Device,
    ) -> Result<(HighFreqVitClassifier<B>, O)>
    where
        B: AutodiffBackend,
        O: Optimizer<HighFreqVitClassifier<B>, B>,
    {
        if let Some((field, saved, current)) = manifest.model.shape_difference(expected) {
            return Err(DetectorError::Checkpoint(format!(
                "checkpoint from epoch {} has {} = {}, current model has {}",
                manifest.epoch, field, saved, current
            )));
        }
        let model = model.load_file(self.record_path(&manifest.model_file)?, &self.recorder, device)?;
        let record = Recorder::<B>::load(
            &self.recorder,
            self.record_path(&manifest.optimizer_file)?,
            device,
        )?;
        let optimizer = optimizer.load_record(record);

        info!("Restored checkpoint from epoch {}", manifest.epoch);
        Ok((model, optimizer))
    }

    /// Build a model from the manifest's config and load its parameters
    pub fn load_model<B: Backend>(
        &self,
        manifest: &CheckpointManifest,
        device: &B::Device,
    ) -> Result<HighFreqVitClassifier<B>> {
        if manifest.model.num_classes != NUM_CLASSES {
            return Err(DetectorError::Model(format!(
                "checkpoint model has {} classes, expected {}",
                manifest.model.num_classes, NUM_CLASSES
            )));
        }
        let model = manifest.model.init::<B>(device)?;
        let model = model.load_file(self.record_path(&manifest.model_file)?, &self.recorder, device)?;
        Ok(model)
    }

    fn record_path(&self, stem: &str) -> Result<PathBuf> {
        let path = self.checkpoint_dir.join(stem);
        if !path.with_extension(RECORD_EXT).is_file() {
            return Err(DetectorError::Checkpoint(format!(
                "missing record file {:?}",
                path.with_extension(RECORD_EXT)
            )));
        }
        Ok(path)
    }
}

/// Epoch number from a manifest file name such as `detector_12.json`
pub fn extract_epoch_from_filename(filename: &str) -> Option<usize> {
    filename
        .strip_prefix(PREFIX)
        .and_then(|s| s.strip_suffix(MANIFEST_EXT))
        .and_then(|s| s.parse().ok())
}
