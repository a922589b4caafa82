use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid image shape: {0}")]
    InvalidShape(String),
    #[error("Invalid processor configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Unsupported resample kernel: {0}")]
    UnsupportedKernel(String),
    #[error("Shape error: {0}")]
    ShapeError(#[from] ndarray::ShapeError),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Image error: {0}")]
    ImageError(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn invalid_shape(message: impl Into<String>) -> Self {
        Error::InvalidShape(message.into())
    }
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Error::InvalidConfiguration(message.into())
    }
}
