use image::GrayImage;
use imageproc::distance_transform::Norm;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr, VariantNames};

use crate::{
    error::{FigSplitError, Result},
    traits::Binarizer,
    types::{BinaryMask, BACKGROUND, FOREGROUND},
};

/// Brightness at or above which a pixel counts as page background.
pub const DEFAULT_THRESHOLD: i32 = 250;

/// Shape of the structuring element used by the opening.
#[derive(
    Debug, Clone, Copy, Default,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter, VariantNames, IntoStaticStr,
    PartialEq, Eq
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OpeningKernel {
    /// Plus-shaped neighbourhood (L1 ball)
    #[default]
    Cross,
    /// Full square neighbourhood (L-infinity ball)
    Square,
}

impl OpeningKernel {
    fn norm(self) -> Norm {
        match self {
            OpeningKernel::Cross => Norm::L1,
            OpeningKernel::Square => Norm::LInf,
        }
    }
}

/// Morphological opening applied to the thresholded mask.
///
/// A radius of 0 disables the opening.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Opening {
    pub kernel: OpeningKernel,
    pub radius: u8,
}

impl Opening {
    pub const DISABLED: Opening = Opening {
        kernel: OpeningKernel::Cross,
        radius: 0,
    };

    pub fn is_enabled(&self) -> bool {
        self.radius > 0
    }
}

impl Default for Opening {
    /// 3x3 cross
    fn default() -> Self {
        Self {
            kernel: OpeningKernel::Cross,
            radius: 1,
        }
    }
}

pub(crate) fn validate_threshold(threshold: i32) -> Result<()> {
    if !(0..=255).contains(&threshold) {
        return Err(FigSplitError::InvalidParameter(format!(
            "threshold must be within [0, 255], got {threshold}"
        )));
    }
    Ok(())
}

/// Binarize with the default 3x3 cross opening.
///
/// Pixels strictly darker than `threshold` become foreground.
pub fn binarize(image: &GrayImage, threshold: i32) -> Result<BinaryMask> {
    binarize_with(image, threshold, &Opening::default())
}

/// Threshold `image` and clean the result with `opening`.
pub fn binarize_with(image: &GrayImage, threshold: i32, opening: &Opening) -> Result<BinaryMask> {
    validate_threshold(threshold)?;
    if image.width() == 0 || image.height() == 0 {
        return Err(FigSplitError::InvalidInput(format!(
            "cannot binarize a {}x{} image",
            image.width(),
            image.height()
        )));
    }

    let mut mask = image.clone();
    for pixel in mask.pixels_mut() {
        pixel.0[0] = if (pixel.0[0] as i32) < threshold {
            FOREGROUND
        } else {
            BACKGROUND
        };
    }

    if opening.is_enabled() {
        mask = imageproc::morphology::open(&mask, opening.kernel.norm(), opening.radius);
    }

    Ok(BinaryMask::from_image(mask))
}

/// Fixed-threshold binarizer for figures rendered on a white page
#[derive(Debug, Clone)]
pub struct ThresholdBinarizer {
    pub threshold: i32,
    pub opening: Opening,
}

impl Default for ThresholdBinarizer {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            opening: Opening::default(),
        }
    }
}

impl Binarizer for ThresholdBinarizer {
    fn binarize(&self, image: &GrayImage) -> Result<BinaryMask> {
        binarize_with(image, self.threshold, &self.opening)
    }
}
