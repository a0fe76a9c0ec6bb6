//! Burn Dataset Integration
//!
//! Implements Burn's `Dataset` trait over labelled image samples and a
//! `Batcher` that stacks items into tensors.

use std::sync::atomic::{AtomicUsize, Ordering};

use burn::data::dataloader::batcher::Batcher;
use burn::data::dataset::Dataset;
use burn::prelude::*;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::loader::DatasetStats;
use super::transform::ImageTransform;
use super::{Label, Sample};
use crate::utils::error::Result;

/// A single preprocessed image ready for Burn
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DetectorItem {
    /// Normalized CHW floats `[3 * H * W]`
    pub image: Vec<f32>,
    pub label: Label,
    /// Source path, for logging
    pub path: String,
}

impl DetectorItem {
    pub fn from_sample(sample: &Sample, transform: &ImageTransform) -> Result<Self> {
        Ok(Self {
            image: transform.load(&sample.path)?,
            label: sample.label,
            path: sample.path.to_string_lossy().to_string(),
        })
    }
}

/// Labelled images implementing Burn's `Dataset` trait
///
/// Images are decoded on demand unless built with [`DetectorDataset::new_cached`].
#[derive(Debug, Clone)]
pub struct DetectorDataset {
    samples: Vec<Sample>,
    transform: ImageTransform,
    cached_items: Option<Vec<DetectorItem>>,
}

impl DetectorDataset {
    /// Lazily-decoding dataset
    pub fn new(samples: Vec<Sample>, transform: ImageTransform) -> Self {
        Self {
            samples,
            transform,
            cached_items: None,
        }
    }

    /// Decode every image up front on the rayon pool.
    ///
    /// Unreadable images are logged and dropped from the dataset.
    pub fn new_cached(samples: Vec<Sample>, transform: ImageTransform) -> Self {
        let total = samples.len();
        info!("Pre-loading {} images into memory", total);

        let pb = ProgressBar::new(total as u64);
        if let Ok(style) = ProgressStyle::default_bar().template(
            "  {spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})",
        ) {
            pb.set_style(style.progress_chars("#>-"));
        }

        let loaded = AtomicUsize::new(0);
        let items: Vec<DetectorItem> = samples
            .par_iter()
            .filter_map(|sample| {
                let result = DetectorItem::from_sample(sample, &transform);
                let count = loaded.fetch_add(1, Ordering::Relaxed);
                if count % 100 == 0 {
                    pb.set_position(count as u64);
                }
                match result {
                    Ok(item) => Some(item),
                    Err(e) => {
                        warn!("Skipping image: {}", e);
                        None
                    }
                }
            })
            .collect();

        pb.finish_and_clear();
        info!("Loaded {}/{} images", items.len(), total);

        // Keep samples aligned with whatever decoded successfully
        let samples = items
            .iter()
            .map(|item| Sample::new(&item.path, item.label))
            .collect();

        Self {
            samples,
            transform,
            cached_items: Some(items),
        }
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn transform(&self) -> &ImageTransform {
        &self.transform
    }

    pub fn is_cached(&self) -> bool {
        self.cached_items.is_some()
    }

    pub fn stats(&self) -> DatasetStats {
        DatasetStats::from_samples(&self.samples)
    }

    /// Load the item at `index`, reporting decode failures
    pub fn load_item(&self, index: usize) -> Result<Option<DetectorItem>> {
        if let Some(cached) = &self.cached_items {
            return Ok(cached.get(index).cloned());
        }
        match self.samples.get(index) {
            Some(sample) => DetectorItem::from_sample(sample, &self.transform).map(Some),
            None => Ok(None),
        }
    }
}

impl Dataset<DetectorItem> for DetectorDataset {
    fn get(&self, index: usize) -> Option<DetectorItem> {
        match self.load_item(index) {
            Ok(item) => item,
            Err(e) => {
                warn!("{}", e);
                None
            }
        }
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

/// Decode the items at `indices` in parallel, preserving order.
///
/// Images that fail to decode are logged and left out of the batch.
pub fn load_batch(dataset: &DetectorDataset, indices: &[usize]) -> Vec<DetectorItem> {
    indices
        .par_iter()
        .filter_map(|&index| dataset.get(index))
        .collect()
}

/// A batch of images for training or evaluation
#[derive(Clone, Debug)]
pub struct DetectorBatch<B: Backend> {
    /// `[batch_size, 3, height, width]`
    pub images: Tensor<B, 4>,
    /// Class indices `[batch_size]`
    pub targets: Tensor<B, 1, Int>,
    pub labels: Vec<Label>,
}

impl<B: Backend> DetectorBatch<B> {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Stacks [`DetectorItem`]s into a [`DetectorBatch`]
#[derive(Clone, Debug)]
pub struct DetectorBatcher {
    image_size: usize,
}

impl DetectorBatcher {
    pub fn new(image_size: usize) -> Self {
        Self { image_size }
    }
}

impl<B: Backend> Batcher<B, DetectorItem, DetectorBatch<B>> for DetectorBatcher {
    fn batch(&self, items: Vec<DetectorItem>, device: &B::Device) -> DetectorBatch<B> {
        let batch_size = items.len();
        let size = self.image_size;

        let labels: Vec<Label> = items.iter().map(|item| item.label).collect();
        let targets_data: Vec<i64> = labels.iter().map(|label| label.index() as i64).collect();
        let images_data: Vec<f32> = items.into_iter().flat_map(|item| item.image).collect();

        let images = Tensor::<B, 4>::from_floats(
            TensorData::new(images_data, [batch_size, 3, size, size]),
            device,
        );
        let targets =
            Tensor::<B, 1, Int>::from_data(TensorData::new(targets_data, [batch_size]), device);

        DetectorBatch {
            images,
            targets,
            labels,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;
    use image::{ImageBuffer, Rgb};
    use std::path::Path;

    type TestBackend = NdArray;

    fn write_image(path: &Path, value: u8) {
        let img: ImageBuffer<Rgb<u8>, Vec<u8>> =
            ImageBuffer::from_fn(10, 10, |_, _| Rgb([value, value, value]));
        img.save(path).unwrap();
    }

    fn fixture(dir: &Path) -> Vec<Sample> {
        let a = dir.join("a.png");
        let b = dir.join("b.png");
        write_image(&a, 0);
        write_image(&b, 255);
        vec![Sample::new(a, Label::Real), Sample::new(b, Label::Generated)]
    }

    #[test]
    fn test_lazy_dataset_get() {
        let dir = tempfile::TempDir::new().unwrap();
        let dataset = DetectorDataset::new(fixture(dir.path()), ImageTransform::new(4));

        assert_eq!(dataset.len(), 2);
        assert!(!dataset.is_cached());

        let item = dataset.get(1).unwrap();
        assert_eq!(item.label, Label::Generated);
        assert_eq!(item.image.len(), 3 * 4 * 4);
        assert!(dataset.get(2).is_none());
    }

    #[test]
    fn test_cached_dataset_drops_unreadable() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut samples = fixture(dir.path());
        let broken = dir.path().join("broken.jpg");
        std::fs::write(&broken, b"not an image").unwrap();
        samples.push(Sample::new(broken, Label::Real));

        let dataset = DetectorDataset::new_cached(samples, ImageTransform::new(4));

        assert!(dataset.is_cached());
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.stats().total(), 2);
    }

    #[test]
    fn test_load_batch_preserves_order() {
        let dir = tempfile::TempDir::new().unwrap();
        let dataset = DetectorDataset::new(fixture(dir.path()), ImageTransform::new(4));

        let items = load_batch(&dataset, &[1, 0, 1]);
        let labels: Vec<Label> = items.iter().map(|i| i.label).collect();
        assert_eq!(labels, vec![Label::Generated, Label::Real, Label::Generated]);
    }

    #[test]
    fn test_batcher_shapes() {
        let device = Default::default();
        let items = vec![
            DetectorItem {
                image: vec![0.0; 3 * 4 * 4],
                label: Label::Real,
                path: "a".into(),
            },
            DetectorItem {
                image: vec![1.0; 3 * 4 * 4],
                label: Label::Generated,
                path: "b".into(),
            },
        ];

        let batch: DetectorBatch<TestBackend> = DetectorBatcher::new(4).batch(items, &device);

        assert_eq!(batch.images.dims(), [2, 3, 4, 4]);
        assert_eq!(batch.targets.dims(), [2]);
        assert_eq!(batch.len(), 2);

        let targets: Vec<i64> = batch.targets.into_data().iter::<i64>().collect();
        assert_eq!(targets, vec![0, 1]);
    }
}
