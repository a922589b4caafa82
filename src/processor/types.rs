use serde::Deserialize;

use crate::error::{Error, Result};

/// Interpolation kernel requested from the resize backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResampleKernel {
    Nearest,
    Bilinear,
    #[default]
    Bicubic,
    Lanczos,
    Box,
    Hamming,
}

impl ResampleKernel {
    /// Maps a PIL resampling code, as stored in `preprocessor_config.json`.
    pub fn from_pil_code(code: u8) -> Result<Self> {
        match code {
            0 => Ok(Self::Nearest),
            1 => Ok(Self::Lanczos),
            2 => Ok(Self::Bilinear),
            3 => Ok(Self::Bicubic),
            4 => Ok(Self::Box),
            5 => Ok(Self::Hamming),
            other => Err(Error::invalid_config(format!("unknown resample code {}", other))),
        }
    }

    pub fn pil_code(&self) -> u8 {
        match self {
            Self::Nearest => 0,
            Self::Lanczos => 1,
            Self::Bilinear => 2,
            Self::Bicubic => 3,
            Self::Box => 4,
            Self::Hamming => 5,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Nearest => "nearest",
            Self::Bilinear => "bilinear",
            Self::Bicubic => "bicubic",
            Self::Lanczos => "lanczos",
            Self::Box => "box",
            Self::Hamming => "hamming",
        }
    }
}

/// Square region cut out by the center-crop stage, in pixel offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropBox {
    pub top: usize,
    pub left: usize,
    pub size: usize,
}

impl CropBox {
    pub fn bottom(&self) -> usize {
        self.top + self.size
    }
    pub fn right(&self) -> usize {
        self.left + self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pil_codes_match_names() {
        for code in 0..=5u8 {
            let kernel = ResampleKernel::from_pil_code(code).unwrap();
            assert_eq!(kernel.pil_code(), code);
        }
        assert_eq!(ResampleKernel::from_pil_code(3).unwrap().name(), "bicubic");
        assert_eq!(ResampleKernel::from_pil_code(0).unwrap().name(), "nearest");
    }

    #[test]
    fn test_unknown_pil_code_is_rejected() {
        assert!(matches!(
            ResampleKernel::from_pil_code(9),
            Err(Error::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_kernel_serde_names() {
        let kernel: ResampleKernel = serde_json::from_str("\"bilinear\"").unwrap();
        assert_eq!(kernel, ResampleKernel::Bilinear);
        assert_eq!(ResampleKernel::default(), ResampleKernel::Bicubic);
    }
}
