//! Image Transform
//!
//! Resize + normalize pipeline that turns a decoded image into the flat CHW
//! buffer the model consumes, and the inverse used for previews.

use std::path::Path;

use image::imageops::FilterType;
use image::{DynamicImage, ImageReader, RgbImage};

use crate::utils::error::{DetectorError, Result};
use crate::IMAGE_SIZE;

const CHANNELS: usize = 3;

/// Resize to a square and normalize each channel with `(x - mean) / std`
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTransform {
    pub size: usize,
    pub mean: [f32; CHANNELS],
    pub std: [f32; CHANNELS],
}

impl Default for ImageTransform {
    fn default() -> Self {
        Self::new(IMAGE_SIZE)
    }
}

impl ImageTransform {
    /// Square transform with mean/std 0.5, mapping pixels into [-1, 1]
    pub fn new(size: usize) -> Self {
        Self {
            size,
            mean: [0.5; CHANNELS],
            std: [0.5; CHANNELS],
        }
    }

    /// Number of floats produced per image
    pub fn output_len(&self) -> usize {
        CHANNELS * self.size * self.size
    }

    /// Convert an image to a normalized CHW buffer of length [`Self::output_len`]
    pub fn apply(&self, img: &DynamicImage) -> Vec<f32> {
        let side = self.size as u32;
        let rgb = img
            .resize_exact(side, side, FilterType::Triangle)
            .to_rgb8();

        let plane = self.size * self.size;
        let mut data = vec![0.0f32; CHANNELS * plane];

        for (x, y, pixel) in rgb.enumerate_pixels() {
            let offset = y as usize * self.size + x as usize;
            for c in 0..CHANNELS {
                let value = pixel[c] as f32 / 255.0;
                data[c * plane + offset] = (value - self.mean[c]) / self.std[c];
            }
        }

        data
    }

    /// Decode the file at `path` and apply the transform
    pub fn load(&self, path: &Path) -> Result<Vec<f32>> {
        let img = ImageReader::open(path)
            .map_err(|e| DetectorError::ImageLoad(path.to_path_buf(), e.to_string()))?
            .with_guessed_format()
            .map_err(|e| DetectorError::ImageLoad(path.to_path_buf(), e.to_string()))?
            .decode()
            .map_err(|e| DetectorError::ImageLoad(path.to_path_buf(), e.to_string()))?;

        Ok(self.apply(&img))
    }

    /// Undo normalization and rebuild an RGB image from a CHW buffer
    pub fn invert(&self, data: &[f32]) -> Result<RgbImage> {
        if data.len() != self.output_len() {
            return Err(DetectorError::Dataset(format!(
                "expected {} values for a {}x{} image, got {}",
                self.output_len(),
                self.size,
                self.size,
                data.len()
            )));
        }

        let plane = self.size * self.size;
        let side = self.size as u32;

        Ok(RgbImage::from_fn(side, side, |x, y| {
            let offset = y as usize * self.size + x as usize;
            let mut rgb = [0u8; CHANNELS];
            for (c, channel) in rgb.iter_mut().enumerate() {
                let value = data[c * plane + offset] * self.std[c] + self.mean[c];
                *channel = (value.clamp(0.0, 1.0) * 255.0).round() as u8;
            }
            image::Rgb(rgb)
        }))
    }
}

/// Tile `images` into a grid with `columns` per row and save it as PNG.
///
/// All tiles take the size of the first image; a one-pixel white gutter
/// separates them.
pub fn save_preview_grid(images: &[RgbImage], columns: usize, path: &Path) -> Result<()> {
    let first = images
        .first()
        .ok_or_else(|| DetectorError::Dataset("no images to preview".to_string()))?;
    let columns = columns.clamp(1, images.len());
    let rows = images.len().div_ceil(columns);

    let (tile_w, tile_h) = first.dimensions();
    let gutter = 1u32;
    let width = columns as u32 * (tile_w + gutter) + gutter;
    let height = rows as u32 * (tile_h + gutter) + gutter;

    let mut grid = RgbImage::from_pixel(width, height, image::Rgb([255, 255, 255]));
    for (i, tile) in images.iter().enumerate() {
        let tile = if tile.dimensions() == (tile_w, tile_h) {
            tile.clone()
        } else {
            image::imageops::resize(tile, tile_w, tile_h, FilterType::Triangle)
        };
        let col = (i % columns) as i64;
        let row = (i / columns) as i64;
        image::imageops::replace(
            &mut grid,
            &tile,
            gutter as i64 + col * (tile_w + gutter) as i64,
            gutter as i64 + row * (tile_h + gutter) as i64,
        );
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    grid.save(path)
        .map_err(|e| DetectorError::ImageLoad(path.to_path_buf(), e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, rgb: [u8; 3]) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, image::Rgb(rgb)))
    }

    #[test]
    fn test_apply_shape_and_range() {
        let transform = ImageTransform::new(8);
        let data = transform.apply(&solid(20, 12, [0, 128, 255]));

        assert_eq!(data.len(), 3 * 8 * 8);
        assert!(data.iter().all(|v| (-1.0..=1.0).contains(v)));

        // Channel planes are contiguous
        assert!((data[0] + 1.0).abs() < 1e-6);
        assert!((data[64] - (128.0 / 255.0 - 0.5) / 0.5).abs() < 1e-6);
        assert!((data[128] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_invert_recovers_pixels() {
        let transform = ImageTransform::new(4);
        let data = transform.apply(&solid(4, 4, [10, 100, 200]));
        let img = transform.invert(&data).unwrap();

        assert_eq!(img.dimensions(), (4, 4));
        assert_eq!(img.get_pixel(2, 3).0, [10, 100, 200]);
    }

    #[test]
    fn test_invert_rejects_wrong_length() {
        let transform = ImageTransform::new(4);
        assert!(transform.invert(&[0.0; 10]).is_err());
    }

    #[test]
    fn test_load_reports_missing_file() {
        let transform = ImageTransform::new(4);
        let err = transform.load(Path::new("/nonexistent/img.jpg")).unwrap_err();
        assert!(matches!(err, DetectorError::ImageLoad(_, _)));
    }

    #[test]
    fn test_preview_grid_dimensions() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("grid.png");
        let tiles: Vec<RgbImage> = (0..5)
            .map(|i| RgbImage::from_pixel(6, 6, image::Rgb([i * 40, 0, 0])))
            .collect();

        save_preview_grid(&tiles, 3, &path).unwrap();

        let grid = image::open(&path).unwrap();
        assert_eq!(grid.width(), 3 * 7 + 1);
        assert_eq!(grid.height(), 2 * 7 + 1);
    }

    #[test]
    fn test_preview_grid_requires_images() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(save_preview_grid(&[], 4, &dir.path().join("g.png")).is_err());
    }
}
