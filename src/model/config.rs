//! Hyper-parameters for the frequency-domain Vision Transformer

use burn::config::Config;
use burn::tensor::backend::Backend;

use super::vit::HighFreqVitClassifier;
use crate::utils::error::DetectorError;

/// Configuration for [`HighFreqVitClassifier`]
#[derive(Config, Debug)]
pub struct HighFreqVitConfig {
    /// Number of output classes
    #[config(default = "2")]
    pub num_classes: usize,

    /// Input image side length (square images)
    #[config(default = "224")]
    pub image_size: usize,

    /// Side length of each patch
    #[config(default = "16")]
    pub patch_size: usize,

    /// Number of input channels (3 for RGB)
    #[config(default = "3")]
    pub in_channels: usize,

    /// Token embedding width
    #[config(default = "192")]
    pub d_model: usize,

    /// Feed-forward width inside each encoder layer
    #[config(default = "768")]
    pub d_ff: usize,

    #[config(default = "3")]
    pub n_heads: usize,

    #[config(default = "6")]
    pub n_layers: usize,

    #[config(default = "0.1")]
    pub dropout: f64,

    /// Fraction of the spectrum (by `u + v` index) removed before patching
    #[config(default = "0.1")]
    pub low_freq_cutoff: f64,
}

impl HighFreqVitConfig {
    /// Small model for tests and smoke runs
    pub fn tiny(image_size: usize) -> Self {
        Self::new()
            .with_image_size(image_size)
            .with_patch_size(4)
            .with_d_model(16)
            .with_d_ff(32)
            .with_n_heads(2)
            .with_n_layers(1)
            .with_dropout(0.0)
    }

    /// Check shapes and ranges before building the model
    pub fn validate(&self) -> crate::utils::error::Result<()> {
        if self.num_classes < 2 {
            return Err(DetectorError::Config(
                "num_classes must be at least 2".to_string(),
            ));
        }
        if self.patch_size == 0 || self.image_size == 0 {
            return Err(DetectorError::Config(
                "image_size and patch_size must be positive".to_string(),
            ));
        }
        if self.image_size % self.patch_size != 0 {
            return Err(DetectorError::Config(format!(
                "image_size {} is not divisible by patch_size {}",
                self.image_size, self.patch_size
            )));
        }
        if self.n_heads == 0 || self.d_model % self.n_heads != 0 {
            return Err(DetectorError::Config(format!(
                "d_model {} must be a positive multiple of n_heads {}",
                self.d_model, self.n_heads
            )));
        }
        if self.n_layers == 0 || self.d_ff == 0 || self.in_channels == 0 {
            return Err(DetectorError::Config(
                "n_layers, d_ff and in_channels must be positive".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(DetectorError::Config(format!(
                "dropout must be in [0, 1), got {}",
                self.dropout
            )));
        }
        if !(0.0..=1.0).contains(&self.low_freq_cutoff) {
            return Err(DetectorError::Config(format!(
                "low_freq_cutoff must be in [0, 1], got {}",
                self.low_freq_cutoff
            )));
        }
        Ok(())
    }

    /// Number of patches per side
    pub fn grid_size(&self) -> usize {
        self.image_size / self.patch_size
    }

    /// First parameter-shaping field that differs from `other`, as
    /// `(name, self, other)`. Dropout does not change parameter shapes.
    pub fn shape_difference(&self, other: &Self) -> Option<(&'static str, String, String)> {
        let fields = [
            ("num_classes", self.num_classes, other.num_classes),
            ("image_size", self.image_size, other.image_size),
            ("patch_size", self.patch_size, other.patch_size),
            ("in_channels", self.in_channels, other.in_channels),
            ("d_model", self.d_model, other.d_model),
            ("d_ff", self.d_ff, other.d_ff),
            ("n_heads", self.n_heads, other.n_heads),
            ("n_layers", self.n_layers, other.n_layers),
        ];
        if let Some((name, ours, theirs)) = fields.into_iter().find(|(_, a, b)| a != b) {
            return Some((name, ours.to_string(), theirs.to_string()));
        }
        if self.low_freq_cutoff != other.low_freq_cutoff {
            return Some((
                "low_freq_cutoff",
                self.low_freq_cutoff.to_string(),
                other.low_freq_cutoff.to_string(),
            ));
        }
        None
    }

    /// Validate and build the classifier
    pub fn init<B: Backend>(
        &self,
        device: &B::Device,
    ) -> crate::utils::error::Result<HighFreqVitClassifier<B>> {
        self.validate()?;
        Ok(HighFreqVitClassifier::new(self, device))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HighFreqVitConfig::new();
        assert_eq!(config.num_classes, 2);
        assert_eq!(config.image_size, 224);
        assert_eq!(config.patch_size, 16);
        assert_eq!(config.grid_size(), 14);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_shapes() {
        assert!(HighFreqVitConfig::new().with_patch_size(15).validate().is_err());
        assert!(HighFreqVitConfig::new().with_n_heads(5).validate().is_err());
        assert!(HighFreqVitConfig::new().with_dropout(1.0).validate().is_err());
        assert!(HighFreqVitConfig::new().with_low_freq_cutoff(1.5).validate().is_err());
        assert!(HighFreqVitConfig::new().with_num_classes(1).validate().is_err());
    }

    #[test]
    fn test_tiny_is_valid() {
        assert!(HighFreqVitConfig::tiny(8).validate().is_ok());
    }

    #[test]
    fn test_config_file_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("model.json");
        let config = HighFreqVitConfig::tiny(8).with_low_freq_cutoff(0.25);

        config.save(&path).unwrap();
        let loaded = HighFreqVitConfig::load(&path).unwrap();

        assert_eq!(loaded.d_model, 16);
        assert_eq!(loaded.low_freq_cutoff, 0.25);
        assert!(loaded.shape_difference(&config).is_none());
    }

    #[test]
    fn test_shape_difference() {
        let base = HighFreqVitConfig::tiny(8);
        assert!(base.shape_difference(&base.clone().with_dropout(0.3)).is_none());

        let (name, ours, theirs) = base
            .shape_difference(&base.clone().with_d_model(32))
            .unwrap();
        assert_eq!(name, "d_model");
        assert_eq!((ours.as_str(), theirs.as_str()), ("16", "32"));

        let (name, _, _) = base
            .shape_difference(&base.clone().with_low_freq_cutoff(0.5))
            .unwrap();
        assert_eq!(name, "low_freq_cutoff");
    }
}
