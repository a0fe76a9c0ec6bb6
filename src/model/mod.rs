//! Model module for the real/generated classifier
//!
//! - `config`: Burn `Config` with the architecture hyper-parameters
//! - `frequency`: DCT basis, high-pass mask and the filter itself
//! - `vit`: the Vision Transformer operating on high-pass filtered images

pub mod config;
pub mod frequency;
pub mod vit;

pub use config::HighFreqVitConfig;
pub use vit::{predicted_labels, DetectorOutput, HighFreqVitClassifier};
