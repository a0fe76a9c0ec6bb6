//! Training module
//!
//! - `config`: TOML-loadable run configuration
//! - `trainer`: the epoch/batch loop with interleaved test sessions
//! - `evaluate`: gradient-free passes over validation and test data
//! - `checkpoint`: save, list and restore model/optimizer state
//! - `metrics`: running loss and accuracy
//! - `history`: per-epoch metrics with JSON and SVG export

pub mod checkpoint;
pub mod config;
pub mod evaluate;
pub mod history;
pub mod metrics;
pub mod trainer;

pub use checkpoint::{extract_epoch_from_filename, CheckpointManager, CheckpointManifest};
pub use config::TrainingConfig;
pub use evaluate::{evaluate, EvaluationResult};
pub use history::TrainingHistory;
pub use metrics::{EpochMetrics, RunningAccuracy, RunningLoss};
pub use trainer::run_training;
