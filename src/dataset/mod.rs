//! Dataset module for real/generated image data
//!
//! This module provides functionality for:
//! - Discovering training and test images with glob patterns
//! - Reading test labels from a semicolon-separated CSV file
//! - The resize/normalize transform and its inverse
//! - Burn `Dataset`/`Batcher` integration
//! - Seeded random splits and per-epoch batch plans
//!
//! ## Directory Layout
//!
//! ```text
//! datasets/
//! ├── train/
//! │   ├── real/*.jpg
//! │   └── generated/*.*
//! └── test/
//!     ├── *.jpg
//!     └── test_labels.csv   (semicolon separated, `label` column)
//! ```

pub mod burn_dataset;
pub mod loader;
pub mod split;
pub mod transform;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::utils::error::DetectorError;

pub use burn_dataset::{DetectorBatch, DetectorBatcher, DetectorDataset, DetectorItem};
pub use loader::{discover_test_samples, discover_training_samples, DatasetStats};
pub use split::{random_split, subset_length, train_validation_lengths, BatchPlan};
pub use transform::ImageTransform;

/// Number of target classes
pub const NUM_CLASSES: usize = 2;

/// Class names in label-index order
pub const CLASS_NAMES: [&str; NUM_CLASSES] = ["real", "generated"];

/// Target class of an image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    /// Authentic photograph
    Real,
    /// Machine-generated image
    Generated,
}

impl Label {
    /// Class index used for tensors (`Real = 0`, `Generated = 1`)
    pub fn index(self) -> usize {
        match self {
            Label::Real => 0,
            Label::Generated => 1,
        }
    }

    /// Inverse of [`Label::index`]
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Label::Real),
            1 => Some(Label::Generated),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        CLASS_NAMES[self.index()]
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Label {
    type Err = DetectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "real" | "0" => Ok(Label::Real),
            "generated" | "fake" | "1" => Ok(Label::Generated),
            other => Err(DetectorError::Dataset(format!(
                "unrecognised label '{}' (expected real/generated or 0/1)",
                other
            ))),
        }
    }
}

/// A single (image path, label) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    pub path: PathBuf,
    pub label: Label,
}

impl Sample {
    pub fn new(path: impl Into<PathBuf>, label: Label) -> Self {
        Self {
            path: path.into(),
            label,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_index_round_trip() {
        assert_eq!(Label::Real.index(), 0);
        assert_eq!(Label::Generated.index(), 1);
        assert_eq!(Label::from_index(1), Some(Label::Generated));
        assert_eq!(Label::from_index(2), None);
    }

    #[test]
    fn test_label_parsing() {
        assert_eq!("real".parse::<Label>().unwrap(), Label::Real);
        assert_eq!(" Generated ".parse::<Label>().unwrap(), Label::Generated);
        assert_eq!("fake".parse::<Label>().unwrap(), Label::Generated);
        assert_eq!("0".parse::<Label>().unwrap(), Label::Real);
        assert_eq!("1".parse::<Label>().unwrap(), Label::Generated);
        assert!("cat".parse::<Label>().is_err());
    }

    #[test]
    fn test_label_display() {
        assert_eq!(Label::Real.to_string(), "real");
        assert_eq!(Label::Generated.to_string(), "generated");
    }
}
