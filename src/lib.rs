//! # freqvit_detector
//!
//! Real vs. generated image detection with a frequency-domain Vision
//! Transformer, trained with the Burn framework.
//!
//! ## Modules
//!
//! - `backend`: Burn backend selection (NdArray CPU by default, CUDA behind a feature)
//! - `dataset`: Glob-based discovery, CSV test labels, transforms and Burn integration
//! - `model`: DCT high-pass front end and the Vision Transformer classifier
//! - `training`: Training loop, evaluation, checkpoints and history
//! - `utils`: Errors, logging, metrics and charts
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use freqvit_detector::backend::{default_device, TrainingBackend};
//! use freqvit_detector::training::{run_training, TrainingConfig};
//!
//! let config = TrainingConfig::load("train.toml".as_ref())?;
//! let history = run_training::<TrainingBackend>(&config, &default_device())?;
//! ```

pub mod backend;
pub mod dataset;
pub mod model;
pub mod training;
pub mod utils;

pub use dataset::{DetectorBatch, DetectorBatcher, DetectorDataset, DetectorItem, Label, Sample};
pub use model::{DetectorOutput, HighFreqVitClassifier, HighFreqVitConfig};
pub use training::{run_training, CheckpointManager, TrainingConfig, TrainingHistory};
pub use utils::error::{DetectorError, Result};
pub use utils::metrics::ConfusionMatrix;

/// Default input side length
pub const IMAGE_SIZE: usize = 224;

/// Real training images sampled per run unless configured otherwise
pub const DEFAULT_REAL_SAMPLES: usize = 1000;

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
