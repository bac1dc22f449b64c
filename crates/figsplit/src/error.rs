use thiserror::Error;

use crate::types::BoundingBox;

#[derive(Error, Debug)]
pub enum FigSplitError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Bounding box {bbox} lies outside the {width}x{height} image")]
    OutOfBounds {
        bbox: BoundingBox,
        width: u32,
        height: u32,
    },

    #[error("Failed to load image: {0}")]
    ImageLoad(#[from] image::ImageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FigSplitError>;
