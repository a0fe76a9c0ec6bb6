//! Error Handling Module
//!
//! Defines the error type shared by the detector library.
//! Uses thiserror for ergonomic error definitions.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for detector operations
#[derive(Error, Debug)]
pub enum DetectorError {
    /// Error loading or decoding an image
    #[error("Failed to load image at '{0}': {1}")]
    ImageLoad(PathBuf, String),

    /// Error with dataset discovery or assembly
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Error reading the test label file
    #[error("CSV error: {0}")]
    Csv(String),

    /// Number of images and labels disagree
    #[error("Label mismatch: {images} images but {labels} labels")]
    LabelMismatch { images: usize, labels: usize },

    /// Error with model construction or shapes
    #[error("Model error: {0}")]
    Model(String),

    /// Error saving or restoring a checkpoint
    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Path not found
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),
}

/// Convenience Result type for detector operations
pub type Result<T> = std::result::Result<T, DetectorError>;

impl From<serde_json::Error> for DetectorError {
    fn from(err: serde_json::Error) -> Self {
        DetectorError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for DetectorError {
    fn from(err: toml::de::Error) -> Self {
        DetectorError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for DetectorError {
    fn from(err: toml::ser::Error) -> Self {
        DetectorError::Serialization(err.to_string())
    }
}

impl From<csv::Error> for DetectorError {
    fn from(err: csv::Error) -> Self {
        DetectorError::Csv(err.to_string())
    }
}

impl From<glob::PatternError> for DetectorError {
    fn from(err: glob::PatternError) -> Self {
        DetectorError::Dataset(format!("invalid glob pattern: {}", err))
    }
}

impl From<burn::record::RecorderError> for DetectorError {
    fn from(err: burn::record::RecorderError) -> Self {
        DetectorError::Checkpoint(format!("{:?}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DetectorError::Dataset("no images".to_string());
        assert_eq!(format!("{}", err), "Dataset error: no images");
    }

    #[test]
    fn test_label_mismatch_display() {
        let err = DetectorError::LabelMismatch {
            images: 10,
            labels: 9,
        };
        assert_eq!(
            err.to_string(),
            "Label mismatch: 10 images but 9 labels"
        );
    }

    #[test]
    fn test_image_load_error() {
        let path = PathBuf::from("/path/to/image.jpg");
        let err = DetectorError::ImageLoad(path, "file not found".to_string());
        assert!(format!("{}", err).contains("image.jpg"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: DetectorError = io_err.into();
        assert!(matches!(err, DetectorError::Io(_)));
    }
}
