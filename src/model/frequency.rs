//! DCT high-pass front end
//!
//! Each image channel is taken to the frequency domain with a 2-D DCT-II
//! (`X = D x Dᵀ`), the low-frequency corner is zeroed, and the result is
//! transformed back (`Dᵀ X D`). Generated images tend to leave traces in the
//! high-frequency band that this filter isolates.

use std::f64::consts::PI;

use burn::prelude::*;

/// Orthonormal DCT-II matrix of size `n x n`, row-major.
///
/// Row `k` holds basis function `k`, so `D Dᵀ = I`.
pub fn dct_basis(n: usize) -> Vec<f32> {
    let mut basis = vec![0.0f32; n * n];
    if n == 0 {
        return basis;
    }

    let scale_dc = (1.0 / n as f64).sqrt();
    let scale = (2.0 / n as f64).sqrt();

    for k in 0..n {
        let alpha = if k == 0 { scale_dc } else { scale };
        for i in 0..n {
            let angle = PI * (2 * i + 1) as f64 * k as f64 / (2 * n) as f64;
            basis[k * n + i] = (alpha * angle.cos()) as f32;
        }
    }

    basis
}

/// Index radius below which coefficients are removed: `round(n * cutoff)`
pub fn cutoff_index(n: usize, cutoff: f64) -> usize {
    (n as f64 * cutoff).round() as usize
}

/// Row-major `n x n` mask that is 0 where `u + v < cutoff_index`, else 1
pub fn high_pass_mask(n: usize, cutoff_index: usize) -> Vec<f32> {
    let mut mask = vec![1.0f32; n * n];
    for u in 0..n {
        for v in 0..n {
            if u + v < cutoff_index {
                mask[u * n + v] = 0.0;
            }
        }
    }
    mask
}

/// Apply the high-pass filter to `[batch, channels, n, n]` images
pub fn high_pass<B: Backend>(images: Tensor<B, 4>, cutoff_index: usize) -> Tensor<B, 4> {
    let [batch, channels, height, width] = images.dims();
    debug_assert_eq!(height, width, "high-pass filter expects square images");
    let n = height;
    let device = images.device();

    let expand = |data: Vec<f32>| {
        Tensor::<B, 2>::from_floats(TensorData::new(data, [n, n]), &device)
            .reshape([1, 1, n, n])
            .repeat_dim(0, batch)
            .repeat_dim(1, channels)
    };

    let d = expand(dct_basis(n));
    let dt = d.clone().swap_dims(2, 3);
    let mask = expand(high_pass_mask(n, cutoff_index));

    let coefficients = d.clone().matmul(images).matmul(dt.clone());
    let filtered = coefficients * mask;
    dt.matmul(filtered).matmul(d)
}
