use image::imageops::{self, FilterType};
use ndarray::{Array4, ArrayView4};

use super::types::ResampleKernel;
use crate::error::{Error, Result};
use crate::utils::array::{chw_to_rgb32f, rgb32f_to_chw, to_u32};

/// Batched spatial resize over NCHW arrays.
///
/// Implementations must be reentrant: one resizer is shared by every call of
/// the preprocessor that owns it.
pub trait Resize {
    fn resize(
        &self,
        batch: ArrayView4<f32>,
        height: usize,
        width: usize,
        kernel: ResampleKernel,
        antialias: bool,
    ) -> Result<Array4<f32>>;
}

/// Resize backend built on `image::imageops::resize`.
///
/// `image` widens the filter support by the downscale ratio, which is the
/// antialiased resampling PIL performs. Box and hamming kernels have no
/// counterpart there and are rejected.
///
/// Float samples are saturated to [0, 255] after each of the two separable
/// passes, not only once at the end. Cubic and lanczos overshoot that the
/// first pass cuts off is gone before the second pass runs, so results near
/// hard edges can differ slightly from a resize that clamps only afterwards.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageResize;

impl ImageResize {
    fn filter_type(kernel: ResampleKernel, antialias: bool) -> Result<FilterType> {
        let filter = match kernel {
            ResampleKernel::Nearest => return Ok(FilterType::Nearest),
            ResampleKernel::Bilinear => FilterType::Triangle,
            // Keys cubic with a = -0.5
            ResampleKernel::Bicubic => FilterType::CatmullRom,
            ResampleKernel::Lanczos => FilterType::Lanczos3,
            ResampleKernel::Box | ResampleKernel::Hamming => {
                return Err(Error::UnsupportedKernel(kernel.name().to_string()))
            }
        };
        if !antialias {
            return Err(Error::UnsupportedKernel(format!(
                "{} without antialiasing",
                kernel.name()
            )));
        }
        Ok(filter)
    }
}

impl Resize for ImageResize {
    fn resize(
        &self,
        batch: ArrayView4<f32>,
        height: usize,
        width: usize,
        kernel: ResampleKernel,
        antialias: bool,
    ) -> Result<Array4<f32>> {
        let filter = Self::filter_type(kernel, antialias)?;
        let (batch_size, channels, _, _) = batch.dim();
        let (target_w, target_h) = (to_u32(width)?, to_u32(height)?);

        let mut output = Array4::<f32>::zeros((batch_size, channels, height, width));
        for (src, mut dst) in batch.outer_iter().zip(output.outer_iter_mut()) {
            let buffer = chw_to_rgb32f(src)?;
            let resized = imageops::resize(&buffer, target_w, target_h, filter);
            dst.assign(&rgb32f_to_chw(resized)?);
        }
        Ok(output)
    }
}
