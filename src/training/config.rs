//! Training configuration
//!
//! Every field has a default, so a TOML file only needs the values it
//! changes. The CLI applies its overrides on top of the loaded file.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::model::HighFreqVitConfig;
use crate::utils::error::{DetectorError, Result};

/// File name of the resolved configuration written next to the checkpoints
pub const CONFIG_FILE: &str = "config.toml";

/// Configuration for a training run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Sub-folder of `train_dir` holding real images
    pub real_folder: String,
    /// Sub-folder of `train_dir` holding generated images
    pub fake_folder: String,
    pub train_dir: PathBuf,
    /// Folder containing `test/`
    pub test_root: PathBuf,
    /// Label CSV; defaults to `<test_root>/test/test_labels.csv`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels_csv: Option<PathBuf>,
    /// Where checkpoints and run artifacts are written
    pub save_path: PathBuf,

    pub num_epochs: usize,
    pub batch_size: usize,
    /// Test sessions per epoch
    pub test_interval: usize,
    /// Resume from the newest checkpoint in `save_path`
    pub use_checkpoint: bool,
    pub learning_rate: f64,
    pub weight_decay: f64,

    /// Real images sampled for training (0 = all)
    pub real_samples: usize,
    pub train_fraction: f64,
    /// Share of the test images kept for test sessions
    pub test_fraction: f64,
    /// Log running metrics every N batches
    pub log_every: usize,
    pub checkpoint_every: usize,
    pub seed: u64,
    /// Rayon threads for image decoding (0 = rayon default)
    pub num_workers: usize,
    /// Decode all images before training
    pub cache_images: bool,

    pub model: HighFreqVitConfig,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            real_folder: "real".to_string(),
            fake_folder: "generated".to_string(),
            train_dir: PathBuf::from("./datasets/train"),
            test_root: PathBuf::from("./datasets"),
            labels_csv: None,
            save_path: PathBuf::from("./checkpoints"),
            num_epochs: 50,
            batch_size: 16,
            test_interval: 10,
            use_checkpoint: false,
            learning_rate: 0.005,
            weight_decay: 0.005,
            real_samples: crate::DEFAULT_REAL_SAMPLES,
            train_fraction: 0.8,
            test_fraction: 0.1,
            log_every: 10,
            checkpoint_every: 10,
            seed: 42,
            num_workers: 0,
            cache_images: false,
            model: HighFreqVitConfig::new(),
        }
    }
}

impl TrainingConfig {
    /// Load from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(DetectorError::PathNotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Write as TOML
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        info!("Configuration saved to {:?}", path);
        Ok(())
    }

    /// Reject values the training loop cannot run with
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("num_epochs", self.num_epochs),
            ("batch_size", self.batch_size),
            ("test_interval", self.test_interval),
            ("log_every", self.log_every),
            ("checkpoint_every", self.checkpoint_every),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(DetectorError::Config(format!("{} must be greater than 0", name)));
            }
        }

        if !(self.learning_rate > 0.0) {
            return Err(DetectorError::Config(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if self.weight_decay < 0.0 {
            return Err(DetectorError::Config(format!(
                "weight_decay must not be negative, got {}",
                self.weight_decay
            )));
        }
        if !(self.train_fraction > 0.0 && self.train_fraction < 1.0) {
            return Err(DetectorError::Config(format!(
                "train_fraction must be in (0, 1), got {}",
                self.train_fraction
            )));
        }
        if !(self.test_fraction > 0.0 && self.test_fraction <= 1.0) {
            return Err(DetectorError::Config(format!(
                "test_fraction must be in (0, 1], got {}",
                self.test_fraction
            )));
        }
        if self.real_folder.is_empty() || self.fake_folder.is_empty() {
            return Err(DetectorError::Config(
                "real_folder and fake_folder must not be empty".to_string(),
            ));
        }

        self.model.validate()
    }

    /// Label CSV to use for the test set
    pub fn labels_path(&self) -> PathBuf {
        self.labels_csv
            .clone()
            .unwrap_or_else(|| self.test_root.join("test").join(crate::dataset::loader::TEST_LABELS_FILE))
    }

    /// Log the resolved configuration
    pub fn log_summary(&self) {
        info!("Configuration:");
        info!("  Train dir:     {:?} ({} / {})", self.train_dir, self.real_folder, self.fake_folder);
        info!("  Test root:     {:?}", self.test_root);
        info!("  Save path:     {:?}", self.save_path);
        info!("  Epochs:        {}", self.num_epochs);
        info!("  Batch size:    {}", self.batch_size);
        info!("  Learning rate: {}", self.learning_rate);
        info!("  Weight decay:  {}", self.weight_decay);
        info!("  Test interval: {}", self.test_interval);
        info!("  Resume:        {}", self.use_checkpoint);
        info!("  Seed:          {}", self.seed);
    }
}
