use std::{fs::File, io::BufWriter, path::Path};

use half::f16;
use image::{DynamicImage, ImageBuffer, Rgb};
use ndarray::{Array3, ArrayView3};
use npyz::WriterBuilder;

use crate::error::{Error, Result};

pub type Rgb32FBuffer = ImageBuffer<Rgb<f32>, Vec<f32>>;

/// Converts an image to a CHW array [channels, height, width] in RGB order,
/// keeping the raw [0, 255] sample scale.
pub fn image_to_chw(image: &DynamicImage) -> Array3<f32> {
    let rgb_image = image.to_rgb8();
    let (width, height) = rgb_image.dimensions();

    Array3::from_shape_fn((3, height as usize, width as usize), |(c, y, x)| {
        rgb_image.get_pixel(x as u32, y as u32)[c] as f32
    })
}

/// Packs a 3-channel CHW array into an interleaved float image with samples
/// divided by 255, the unit range `image` assumes for float pixels.
pub fn chw_to_rgb32f(array: ArrayView3<f32>) -> Result<Rgb32FBuffer> {
    let (channels, height, width) = array.dim();
    if channels != 3 {
        return Err(Error::invalid_shape(format!("expected 3 channels, got {}", channels)));
    }
    let width = to_u32(width)?;
    let height = to_u32(height)?;

    // HWC order falls out of iterating the permuted view
    let raw: Vec<f32> = array
        .permuted_axes([1, 2, 0])
        .iter()
        .map(|v| v / 255.0)
        .collect();

    ImageBuffer::from_raw(width, height, raw)
        .ok_or_else(|| Error::invalid_shape("buffer length does not match dimensions"))
}

/// Inverse of [`chw_to_rgb32f`]: back to CHW in the [0, 255] scale.
pub fn rgb32f_to_chw(buffer: Rgb32FBuffer) -> Result<Array3<f32>> {
    let (width, height) = buffer.dimensions();
    let hwc = Array3::from_shape_vec((height as usize, width as usize, 3), buffer.into_raw())?;
    Ok(hwc
        .permuted_axes([2, 0, 1])
        .as_standard_layout()
        .mapv(|v| v * 255.0))
}

/// Half-precision copy for fp16 model inputs.
pub fn to_f16(array: &Array3<f32>) -> Array3<f16> {
    array.mapv(f16::from_f32)
}

/// Writes a C-ordered `.npy` file with the array's shape.
pub fn write_npy(array: &Array3<f32>, path: &Path) -> Result<()> {
    let shape: Vec<u64> = array.shape().iter().map(|&d| d as u64).collect();
    let file = BufWriter::new(File::create(path)?);

    let mut writer = npyz::WriteOptions::<f32>::new()
        .default_dtype()
        .shape(&shape)
        .writer(file)
        .begin_nd()?;
    writer.extend(array.iter().copied())?;
    writer.finish()?;
    Ok(())
}

pub fn to_u32(dim: usize) -> Result<u32> {
    u32::try_from(dim)
        .map_err(|_| Error::invalid_shape(format!("dimension {} exceeds u32 range", dim)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    #[test]
    fn test_image_to_chw_keeps_rgb_order_and_scale() {
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(0, 0, Rgb([255, 10, 0]));
        img.put_pixel(1, 0, Rgb([1, 2, 3]));
        let chw = image_to_chw(&DynamicImage::ImageRgb8(img));

        assert_eq!(chw.dim(), (3, 1, 2));
        assert_eq!(chw[[0, 0, 0]], 255.0);
        assert_eq!(chw[[1, 0, 0]], 10.0);
        assert_eq!(chw[[2, 0, 0]], 0.0);
        assert_eq!(chw[[2, 0, 1]], 3.0);
    }

    #[test]
    fn test_rgb32f_layout() {
        let chw = Array3::from_shape_fn((3, 2, 4), |(c, y, x)| (c * 100 + y * 10 + x) as f32);
        let buffer = chw_to_rgb32f(chw.view()).unwrap();
        assert_eq!(buffer.dimensions(), (4, 2));

        let px = buffer.get_pixel(3, 1);
        assert!((px[0] - 13.0 / 255.0).abs() < 1e-6);
        assert!((px[2] - 213.0 / 255.0).abs() < 1e-6);

        let back = rgb32f_to_chw(buffer).unwrap();
        for (a, b) in back.iter().zip(chw.iter()) {
            assert!((a - b).abs() < 1e-3);
        }
    }

    #[test]
    fn test_chw_to_rgb32f_rejects_wrong_channels() {
        let gray = Array3::<f32>::zeros((1, 4, 4));
        assert!(matches!(
            chw_to_rgb32f(gray.view()),
            Err(Error::InvalidShape(_))
        ));
    }

    #[test]
    fn test_write_npy_reads_back() {
        let chw = Array3::from_shape_fn((3, 2, 5), |(c, y, x)| c as f32 - 0.25 * (y * 5 + x) as f32);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pixel_values.npy");
        write_npy(&chw, &path).unwrap();

        let npy = npyz::NpyFile::new(File::open(&path).unwrap()).unwrap();
        assert_eq!(npy.shape(), &[3, 2, 5]);
        let values: Vec<f32> = npy.into_vec().unwrap();
        assert_eq!(values, chw.iter().copied().collect::<Vec<_>>());
    }

    #[test]
    fn test_write_npy_missing_dir() {
        let chw = Array3::<f32>::zeros((3, 1, 1));
        let err = write_npy(&chw, Path::new("/nonexistent/dir/out.npy")).unwrap_err();
        assert!(matches!(err, Error::IoError(_)));
    }

    #[test]
    fn test_to_f16() {
        let arr = Array3::from_elem((3, 1, 1), -1.5f32);
        let half = to_f16(&arr);
        assert_eq!(half[[2, 0, 0]], f16::from_f32(-1.5));
    }
}
