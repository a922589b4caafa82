//! Shortest-edge resize, square center crop, clamp, rescale and per-channel
//! normalization of CHW `f32` arrays.
//!
//! Every stage reads the spatial shape from the array it receives, so a
//! disabled resize leaves the crop working on the input's own dimensions.

use image::DynamicImage;
use ndarray::{s, stack, Array3, Array4, ArrayView3, ArrayViewD, Axis, Ix3};
use tracing::debug;

use super::config::ProcessorConfig;
use super::resize::{ImageResize, Resize};
use super::types::{CropBox, ResampleKernel};
use crate::error::{Error, Result};
use crate::utils::array::image_to_chw;

pub const CHANNELS: usize = 3;
pub const PIXEL_MIN: f32 = 0.0;
pub const PIXEL_MAX: f32 = 255.0;

/// Converts images of any resolution into fixed-size normalized tensors.
///
/// Holds a validated [`ProcessorConfig`] and the resize backend it calls into.
/// Neither is mutated by `process`, so one instance can serve many threads.
pub struct ImagePreprocessor<R: Resize = ImageResize> {
    config: ProcessorConfig,
    resizer: R,
}

impl ImagePreprocessor<ImageResize> {
    pub fn new(config: ProcessorConfig) -> Result<Self> {
        Self::with_resizer(config, ImageResize)
    }
}

impl<R: Resize> ImagePreprocessor<R> {
    pub fn with_resizer(config: ProcessorConfig, resizer: R) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, resizer })
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Runs the enabled stages in order: resize, center crop, clamp, rescale,
    /// normalize. The input is never modified.
    pub fn process(&self, image: ArrayView3<f32>) -> Result<Array3<f32>> {
        check_shape(&image)?;
        let config = &self.config;

        let mut img = if config.do_resize {
            resize_shortest_edge(
                &self.resizer,
                image,
                config.target_short_edge as usize,
                config.resample_kernel,
            )?
        } else {
            image.to_owned()
        };

        if config.do_center_crop {
            img = center_crop(&img);
        }

        clamp(&mut img);

        if config.do_rescale {
            rescale(&mut img, config.rescale_factor);
        }

        if config.do_normalize {
            img = normalize(img, &config.mean, &config.std)?;
        }

        debug!("Preprocessed image to shape {:?}", img.shape());
        Ok(img)
    }

    /// Same as [`process`](Self::process) for arrays whose rank is only known
    /// at runtime.
    pub fn process_dyn(&self, image: ArrayViewD<f32>) -> Result<Array3<f32>> {
        if image.ndim() != 3 {
            return Err(Error::invalid_shape(format!(
                "expected (channel, height, width), got {} axes",
                image.ndim()
            )));
        }
        let image = image.into_dimensionality::<Ix3>()?;
        self.process(image)
    }

    pub fn process_image(&self, image: &DynamicImage) -> Result<Array3<f32>> {
        let chw = image_to_chw(image);
        self.process(chw.view())
    }

    /// Processes each image and stacks the results into an NCHW batch.
    ///
    /// With center crop disabled the outputs of differently shaped inputs
    /// cannot be stacked and a shape error is returned.
    pub fn process_batch(&self, images: &[ArrayView3<f32>]) -> Result<Array4<f32>> {
        if images.is_empty() {
            return Err(Error::invalid_shape("empty batch"));
        }
        let processed = images
            .iter()
            .map(|image| self.process(image.view()))
            .collect::<Result<Vec<_>>>()?;
        let views: Vec<_> = processed.iter().map(|img| img.view()).collect();
        Ok(stack(Axis(0), &views)?)
    }
}

fn check_shape(image: &ArrayView3<f32>) -> Result<()> {
    let (channels, height, width) = image.dim();
    if channels != CHANNELS {
        return Err(Error::invalid_shape(format!(
            "expected {} channels, got {}",
            CHANNELS, channels
        )));
    }
    if height == 0 || width == 0 {
        return Err(Error::invalid_shape(format!(
            "spatial dimensions must be non-zero, got {}x{}",
            height, width
        )));
    }
    Ok(())
}

/// Target (height, width) with the shortest edge set to `target_short_edge`
/// and the long edge scaled to keep the aspect ratio, truncated.
///
/// `width <= height` selects width as the short edge, so square inputs take
/// the width branch.
pub fn shortest_edge_size(height: usize, width: usize, target_short_edge: usize) -> (usize, usize) {
    let (short, long) = if width <= height { (width, height) } else { (height, width) };
    let new_short = target_short_edge;
    let new_long = (target_short_edge as u64 * long as u64 / short as u64) as usize;

    if width <= height {
        (new_long, new_short)
    } else {
        (new_short, new_long)
    }
}

pub fn resize_shortest_edge<R: Resize + ?Sized>(
    resizer: &R,
    image: ArrayView3<f32>,
    target_short_edge: usize,
    kernel: ResampleKernel,
) -> Result<Array3<f32>> {
    let (_, height, width) = image.dim();
    let (new_height, new_width) = shortest_edge_size(height, width, target_short_edge);

    // the backend works on batches
    let batch = image.insert_axis(Axis(0));
    let resized = resizer.resize(batch, new_height, new_width, kernel, true)?;

    debug!(
        "Resized {}x{} -> {}x{} ({})",
        height,
        width,
        new_height,
        new_width,
        kernel.name()
    );
    Ok(resized.index_axis_move(Axis(0), 0))
}

/// Largest centered square; the side is the shorter of the two dimensions.
pub fn center_crop_box(height: usize, width: usize) -> CropBox {
    if width < height {
        CropBox {
            top: (height - width) / 2,
            left: 0,
            size: width,
        }
    } else {
        CropBox {
            top: 0,
            left: (width - height) / 2,
            size: height,
        }
    }
}

pub fn center_crop(image: &Array3<f32>) -> Array3<f32> {
    let (_, height, width) = image.dim();
    let crop = center_crop_box(height, width);
    debug!("Center crop {:?} from {}x{}", crop, height, width);

    image
        .slice(s![.., crop.top..crop.bottom(), crop.left..crop.right()])
        .to_owned()
}

pub fn clamp(image: &mut Array3<f32>) {
    image.mapv_inplace(|v| v.clamp(PIXEL_MIN, PIXEL_MAX));
}

pub fn rescale(image: &mut Array3<f32>, factor: f32) {
    *image *= factor;
}

/// `(image - mean[c]) / std[c]` with the channel constants broadcast over
/// height and width.
pub fn normalize(image: Array3<f32>, mean: &[f32; 3], std: &[f32; 3]) -> Result<Array3<f32>> {
    // Create mean and std arrays with shape [3, 1, 1]
    let mean = Array3::from_shape_vec((CHANNELS, 1, 1), mean.to_vec())?;
    let std = Array3::from_shape_vec((CHANNELS, 1, 1), std.to_vec())?;

    let image = image - &mean;
    Ok(image / &std)
}
