pub mod config;
pub mod preprocess;
pub mod resize;
pub mod types;

pub use config::ProcessorConfig;
pub use preprocess::ImagePreprocessor;
pub use resize::{ImageResize, Resize};
pub use types::{CropBox, ResampleKernel};
