//! Backend selection
//!
//! `ndarray` (CPU) is the default; the `cuda` feature switches the whole
//! crate to the CUDA backend.

use burn::backend::Autodiff;
use burn::tensor::backend::Backend;

#[cfg(feature = "cuda")]
pub type DefaultBackend = burn_cuda::Cuda;

#[cfg(all(not(feature = "cuda"), feature = "ndarray"))]
pub type DefaultBackend = burn_ndarray::NdArray;

#[cfg(not(any(feature = "cuda", feature = "ndarray")))]
compile_error!("Enable the `ndarray` (or `cpu`) or `cuda` feature to select a backend");

/// Backend used by the training loop
pub type TrainingBackend = Autodiff<DefaultBackend>;

/// Device for [`DefaultBackend`]; also valid for [`TrainingBackend`]
pub fn default_device() -> <DefaultBackend as Backend>::Device {
    Default::default()
}

/// Human-readable backend name for banners and logs
pub fn backend_name() -> &'static str {
    if cfg!(feature = "cuda") {
        "CUDA (GPU)"
    } else {
        "NdArray (CPU)"
    }
}
