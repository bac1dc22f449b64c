use image::{DynamicImage, GrayImage};
use crate::{
    error::Result,
    types::{BinaryMask, BoundingBox, SplitResult},
};

/// Trait for turning a greyscale figure into a foreground/background mask
pub trait Binarizer: Send + Sync {
    /// Binarize the input image (threshold, then clean up)
    fn binarize(&self, image: &GrayImage) -> Result<BinaryMask>;
}

/// Trait for finding sub-panel boxes in a binary mask
pub trait ComponentLocator: Send + Sync {
    /// Locate the boxes of the accepted components
    fn locate(&self, mask: &BinaryMask) -> Result<Vec<BoundingBox>>;
}

/// Trait for adjusting the located boxes before cropping
pub trait BoxPostProcessor: Send + Sync {
    fn process(&self, boxes: &mut Vec<BoundingBox>) -> Result<()>;
}

/// Main trait for splitting a figure into sub-figures
pub trait FigureSplitter: Send + Sync {
    fn split(&self, image: &DynamicImage) -> Result<SplitResult>;
}
