//! CLIP-style image preprocessing over `ndarray` tensors.
//!
//! An [`ImagePreprocessor`](processor::ImagePreprocessor) turns a
//! (channel, height, width) array with samples in [0, 255] into a square,
//! normalized model input.

pub mod error;
pub mod processor;
pub mod utils;

pub use error::{Error, Result};
pub use processor::{ImagePreprocessor, ProcessorConfig, ResampleKernel};
