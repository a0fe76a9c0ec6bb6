//! High-Frequency Vision Transformer
//!
//! Architecture:
//! - DCT high-pass filter on every input channel
//! - Patch embedding via a strided convolution
//! - Learned class token and positional embedding
//! - Pre-norm transformer encoder
//! - Layer norm and a linear head on the class token

use burn::{
    module::{Module, Param},
    nn::{
        conv::{Conv2d, Conv2dConfig},
        loss::CrossEntropyLossConfig,
        transformer::{TransformerEncoder, TransformerEncoderConfig, TransformerEncoderInput},
        Dropout, DropoutConfig, Initializer, LayerNorm, LayerNormConfig, Linear, LinearConfig,
    },
    tensor::{backend::Backend, Int, Tensor},
};

use super::config::HighFreqVitConfig;
use super::frequency::{cutoff_index, high_pass};
use crate::dataset::Label;

/// Real vs. generated image classifier
#[derive(Module, Debug)]
pub struct HighFreqVitClassifier<B: Backend> {
    pub patch_embed: Conv2d<B>,
    pub cls_token: Param<Tensor<B, 3>>,
    pub pos_embed: Param<Tensor<B, 3>>,
    pub dropout: Dropout,
    pub encoder: TransformerEncoder<B>,
    pub norm: LayerNorm<B>,
    pub head: Linear<B>,

    cutoff_index: usize,
    d_model: usize,
}

/// Result of [`HighFreqVitClassifier::classify`]
#[derive(Debug, Clone)]
pub struct DetectorOutput<B: Backend> {
    /// Raw logits `[batch, num_classes]`
    pub logits: Tensor<B, 2>,
    pub predictions: Vec<Label>,
    /// Mean cross-entropy
    pub loss: Tensor<B, 1>,
}

impl<B: Backend> HighFreqVitClassifier<B> {
    /// Build from configuration. Prefer [`HighFreqVitConfig::init`], which validates first.
    pub fn new(config: &HighFreqVitConfig, device: &B::Device) -> Self {
        let d_model = config.d_model;
        let num_patches = config.grid_size() * config.grid_size();
        let init = Initializer::Normal {
            mean: 0.0,
            std: 0.02,
        };

        let patch_embed = Conv2dConfig::new(
            [config.in_channels, d_model],
            [config.patch_size, config.patch_size],
        )
        .with_stride([config.patch_size, config.patch_size])
        .init(device);

        let encoder = TransformerEncoderConfig::new(d_model, config.d_ff, config.n_heads, config.n_layers)
            .with_dropout(config.dropout)
            .with_norm_first(true)
            .init(device);

        Self {
            patch_embed,
            cls_token: init.init([1, 1, d_model], device),
            pos_embed: init.init([1, num_patches + 1, d_model], device),
            dropout: DropoutConfig::new(config.dropout).init(),
            encoder,
            norm: LayerNormConfig::new(d_model).init(device),
            head: LinearConfig::new(d_model, config.num_classes).init(device),
            cutoff_index: cutoff_index(config.image_size, config.low_freq_cutoff),
            d_model,
        }
    }

    /// Forward pass
    ///
    /// # Arguments
    /// * `images` - `[batch_size, channels, image_size, image_size]`
    ///
    /// # Returns
    /// * Logits `[batch_size, num_classes]`
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let [batch_size, _, _, _] = images.dims();

        let x = high_pass(images, self.cutoff_index);

        // [B, D, G, G] -> [B, G*G, D]
        let x = self.patch_embed.forward(x);
        let [_, d_model, grid_h, grid_w] = x.dims();
        let x = x
            .reshape([batch_size, d_model, grid_h * grid_w])
            .swap_dims(1, 2);

        let cls = self.cls_token.val().repeat_dim(0, batch_size);
        let x = Tensor::cat(vec![cls, x], 1);
        let x = x + self.pos_embed.val().repeat_dim(0, batch_size);
        let x = self.dropout.forward(x);

        let x = self.encoder.forward(TransformerEncoderInput::new(x));
        let x = self.norm.forward(x);

        let cls_out = x
            .slice([0..batch_size, 0..1, 0..self.d_model])
            .reshape([batch_size, self.d_model]);
        self.head.forward(cls_out)
    }

    /// Forward pass plus predicted labels and cross-entropy against `targets`
    pub fn classify(&self, images: Tensor<B, 4>, targets: Tensor<B, 1, Int>) -> DetectorOutput<B> {
        let logits = self.forward(images);
        let loss = CrossEntropyLossConfig::new()
            .init(&logits.device())
            .forward(logits.clone(), targets);
        let predictions = predicted_labels(logits.clone());

        DetectorOutput {
            logits,
            predictions,
            loss,
        }
    }
}

/// Arg-max over the class dimension
pub fn predicted_labels<B: Backend>(logits: Tensor<B, 2>) -> Vec<Label> {
    logits
        .argmax(1)
        .into_data()
        .iter::<i64>()
        .map(|index| Label::from_index(index as usize).unwrap_or(Label::Real))
        .collect()
}
