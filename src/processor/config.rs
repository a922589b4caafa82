use std::{fs::File, path::Path};

use serde::{Deserialize, Serialize};
use tracing::info;

use super::types::ResampleKernel;
use crate::error::{Error, Result};

pub const DEFAULT_SHORT_EDGE: u32 = 336;
pub const DEFAULT_RESCALE_FACTOR: f32 = 1.0 / 255.0;

// CLIP normalization constants (OpenAI CLIP)
pub const CLIP_MEAN: [f32; 3] = [0.48145466, 0.4578275, 0.40821073];
pub const CLIP_STD: [f32; 3] = [0.26862954, 0.26130258, 0.27577711];

/// Stage toggles and parameters of the preprocessing pipeline.
///
/// Built once and shared read-only by every call to
/// [`ImagePreprocessor::process`](super::preprocess::ImagePreprocessor::process).
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessorConfig {
    pub do_resize: bool,
    pub target_short_edge: u32,
    pub resample_kernel: ResampleKernel,
    pub do_center_crop: bool,
    /// Accepted for compatibility but never read: the crop side is always the
    /// shorter spatial dimension of the image entering the crop stage.
    pub crop_size: Option<u32>,
    pub do_rescale: bool,
    pub rescale_factor: f32,
    pub do_normalize: bool,
    pub mean: [f32; 3],
    pub std: [f32; 3],
    /// Declared without a stage behind it; the pipeline never converts channels.
    pub do_convert_rgb: bool,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            do_resize: true,
            target_short_edge: DEFAULT_SHORT_EDGE,
            resample_kernel: ResampleKernel::Bicubic,
            do_center_crop: true,
            crop_size: None,
            do_rescale: true,
            rescale_factor: DEFAULT_RESCALE_FACTOR,
            do_normalize: true,
            mean: CLIP_MEAN,
            std: CLIP_STD,
            do_convert_rgb: true,
        }
    }
}

impl ProcessorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.target_short_edge == 0 {
            return Err(Error::invalid_config("target_short_edge must be positive"));
        }
        if !self.rescale_factor.is_finite() {
            return Err(Error::invalid_config(format!(
                "rescale_factor must be finite, got {}",
                self.rescale_factor
            )));
        }
        for (c, (&mean, &std)) in self.mean.iter().zip(self.std.iter()).enumerate() {
            if !mean.is_finite() {
                return Err(Error::invalid_config(format!("mean[{}] is not finite", c)));
            }
            if std == 0.0 || !std.is_finite() {
                return Err(Error::invalid_config(format!(
                    "std[{}] must be finite and non-zero, got {}",
                    c, std
                )));
            }
        }
        Ok(())
    }

    pub fn from_file(p: &Path) -> Result<Self> {
        let file = File::open(p)?;
        let raw: RawPreprocessorConfig = serde_json::from_reader(file)?;
        let config = raw.into_config()?;
        info!("Loaded preprocessor config from {}", p.display());
        Ok(config)
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let raw: RawPreprocessorConfig = serde_json::from_str(s)?;
        raw.into_config()
    }

    /// Serializes to the `preprocessor_config.json` layout read by
    /// [`from_json_str`](Self::from_json_str).
    pub fn to_json_string(&self) -> Result<String> {
        let raw = RawPreprocessorConfig {
            image_processor_type: Some(IMAGE_PROCESSOR_TYPE.to_string()),
            do_resize: Some(self.do_resize),
            size: Some(SizeSpec::ShortestEdge {
                shortest_edge: self.target_short_edge,
            }),
            resample: Some(self.resample_kernel.pil_code()),
            do_center_crop: Some(self.do_center_crop),
            crop_size: self.crop_size.map(|n| SizeSpec::HeightWidth { height: n, width: n }),
            do_rescale: Some(self.do_rescale),
            rescale_factor: Some(self.rescale_factor),
            do_normalize: Some(self.do_normalize),
            image_mean: Some(self.mean.to_vec()),
            image_std: Some(self.std.to_vec()),
            do_convert_rgb: Some(self.do_convert_rgb),
        };
        Ok(serde_json::to_string_pretty(&raw)?)
    }
}

const IMAGE_PROCESSOR_TYPE: &str = "CLIPImageProcessor";

/// `size` / `crop_size` are written either as a bare int or as a dict.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum SizeSpec {
    Edge(u32),
    ShortestEdge { shortest_edge: u32 },
    HeightWidth { height: u32, width: u32 },
}

/// On-disk layout of a `preprocessor_config.json`. Missing keys use the defaults.
#[derive(Serialize, Deserialize)]
struct RawPreprocessorConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    image_processor_type: Option<String>,
    do_resize: Option<bool>,
    size: Option<SizeSpec>,
    resample: Option<u8>,
    do_center_crop: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    crop_size: Option<SizeSpec>,
    do_rescale: Option<bool>,
    rescale_factor: Option<f32>,
    do_normalize: Option<bool>,
    image_mean: Option<Vec<f32>>,
    image_std: Option<Vec<f32>>,
    do_convert_rgb: Option<bool>,
}

impl RawPreprocessorConfig {
    fn into_config(self) -> Result<ProcessorConfig> {
        let defaults = ProcessorConfig::default();

        let target_short_edge = match self.size {
            None => defaults.target_short_edge,
            Some(SizeSpec::Edge(n)) | Some(SizeSpec::ShortestEdge { shortest_edge: n }) => n,
            Some(SizeSpec::HeightWidth { .. }) => {
                return Err(Error::invalid_config(
                    "size must be an int or {\"shortest_edge\": n}",
                ))
            }
        };

        let crop_size = match self.crop_size {
            None => None,
            Some(SizeSpec::Edge(n)) | Some(SizeSpec::ShortestEdge { shortest_edge: n }) => Some(n),
            Some(SizeSpec::HeightWidth { height, width }) if height == width => Some(height),
            Some(SizeSpec::HeightWidth { height, width }) => {
                return Err(Error::invalid_config(format!(
                    "crop_size must be square, got {}x{}",
                    height, width
                )))
            }
        };

        let resample_kernel = match self.resample {
            Some(code) => ResampleKernel::from_pil_code(code)?,
            None => defaults.resample_kernel,
        };

        let config = ProcessorConfig {
            do_resize: self.do_resize.unwrap_or(defaults.do_resize),
            target_short_edge,
            resample_kernel,
            do_center_crop: self.do_center_crop.unwrap_or(defaults.do_center_crop),
            crop_size,
            do_rescale: self.do_rescale.unwrap_or(defaults.do_rescale),
            rescale_factor: self.rescale_factor.unwrap_or(defaults.rescale_factor),
            do_normalize: self.do_normalize.unwrap_or(defaults.do_normalize),
            mean: channel_triple("image_mean", self.image_mean, defaults.mean)?,
            std: channel_triple("image_std", self.image_std, defaults.std)?,
            do_convert_rgb: self.do_convert_rgb.unwrap_or(defaults.do_convert_rgb),
        };
        config.validate()?;
        Ok(config)
    }
}

fn channel_triple(key: &str, values: Option<Vec<f32>>, default: [f32; 3]) -> Result<[f32; 3]> {
    match values {
        None => Ok(default),
        Some(v) => <[f32; 3]>::try_from(v.as_slice()).map_err(|_| {
            Error::invalid_config(format!("{} must have 3 channel values, got {}", key, v.len()))
        }),
    }
}
