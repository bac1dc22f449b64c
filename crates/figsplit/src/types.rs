use std::fmt;

use image::{GrayImage, Luma, RgbImage};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Mask value used for foreground pixels in the underlying image.
pub const FOREGROUND: u8 = 255;
/// Mask value used for background pixels in the underlying image.
pub const BACKGROUND: u8 = 0;

/// Axis-aligned box in pixel coordinates, half-open: `[x0, x1) x [y0, y1)`.
///
/// Coordinates are signed so that a margin pushing a box past the image edge
/// can be represented before it is clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct BoundingBox {
    pub x0: i64,
    pub y0: i64,
    pub x1: i64,
    pub y1: i64,
}

impl BoundingBox {
    pub fn new(x0: i64, y0: i64, x1: i64, y1: i64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Box covering a whole `width` x `height` image.
    pub fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, width as i64, height as i64)
    }

    pub fn width(&self) -> i64 {
        (self.x1 - self.x0).max(0)
    }

    pub fn height(&self) -> i64 {
        (self.y1 - self.y0).max(0)
    }

    /// `(y1 - y0) * (x1 - x0)`, or 0 when the box is degenerate.
    pub fn area(&self) -> u64 {
        (self.width() * self.height()) as u64
    }

    pub fn is_degenerate(&self) -> bool {
        self.x1 <= self.x0 || self.y1 <= self.y0
    }

    /// Shift the top-left corner by `margin.top_left` and the bottom-right
    /// corner by `margin.bottom_right`.
    pub fn with_margin(&self, margin: &Margin) -> Self {
        let (lx, ly) = margin.top_left;
        let (rx, ry) = margin.bottom_right;
        Self {
            x0: self.x0 + lx as i64,
            y0: self.y0 + ly as i64,
            x1: self.x1 + rx as i64,
            y1: self.y1 + ry as i64,
        }
    }

    /// Intersect with `[0, width) x [0, height)`.
    ///
    /// The result may be degenerate when the box does not overlap the image.
    pub fn clamp_to(&self, width: u32, height: u32) -> Self {
        let (w, h) = (width as i64, height as i64);
        Self {
            x0: self.x0.clamp(0, w),
            y0: self.y0.clamp(0, h),
            x1: self.x1.clamp(0, w),
            y1: self.y1.clamp(0, h),
        }
    }

    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.x0 < other.x1 && other.x0 < self.x1 && self.y0 < other.y1 && other.y0 < self.y1
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {}, {})", self.x0, self.y0, self.x1, self.y1)
    }
}

/// Offsets applied independently to the two corners of every located box.
///
/// The default insets each box by 3 px on every side, trimming the border
/// pixels that anti-aliasing leaves around rendered panels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Margin {
    /// `(dx, dy)` added to `(x0, y0)`
    pub top_left: (i32, i32),
    /// `(dx, dy)` added to `(x1, y1)`
    pub bottom_right: (i32, i32),
}

impl Margin {
    pub const NONE: Margin = Margin {
        top_left: (0, 0),
        bottom_right: (0, 0),
    };

    pub fn new(top_left: (i32, i32), bottom_right: (i32, i32)) -> Self {
        Self {
            top_left,
            bottom_right,
        }
    }

    /// Same padding on all sides; positive values grow the box.
    pub fn uniform(padding: i32) -> Self {
        Self::new((-padding, -padding), (padding, padding))
    }

    pub(crate) fn offsets(&self) -> [i32; 4] {
        [
            self.top_left.0,
            self.top_left.1,
            self.bottom_right.0,
            self.bottom_right.1,
        ]
    }
}

impl Default for Margin {
    fn default() -> Self {
        Self::new((3, 3), (-3, -3))
    }
}

/// Foreground/background mask with the same dimensions as its source image.
///
/// Backed by a `GrayImage` holding [`FOREGROUND`] / [`BACKGROUND`], which is
/// what imageproc's binary morphology and labelling expect.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryMask {
    image: GrayImage,
}

impl BinaryMask {
    /// All-background mask.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: GrayImage::new(width, height),
        }
    }

    pub fn from_fn<F>(width: u32, height: u32, mut is_foreground: F) -> Self
    where
        F: FnMut(u32, u32) -> bool,
    {
        let image = GrayImage::from_fn(width, height, |x, y| {
            Luma([if is_foreground(x, y) { FOREGROUND } else { BACKGROUND }])
        });
        Self { image }
    }

    /// Wrap an image, treating every non-zero pixel as foreground.
    pub fn from_image(mut image: GrayImage) -> Self {
        for pixel in image.pixels_mut() {
            pixel.0[0] = if pixel.0[0] == BACKGROUND { BACKGROUND } else { FOREGROUND };
        }
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn is_empty(&self) -> bool {
        self.image.width() == 0 || self.image.height() == 0
    }

    pub fn is_foreground(&self, x: u32, y: u32) -> bool {
        self.image.get_pixel(x, y).0[0] != BACKGROUND
    }

    /// `1` for foreground, `0` for background.
    pub fn get(&self, x: u32, y: u32) -> u8 {
        u8::from(self.is_foreground(x, y))
    }

    pub fn set(&mut self, x: u32, y: u32, foreground: bool) {
        let value = if foreground { FOREGROUND } else { BACKGROUND };
        self.image.put_pixel(x, y, Luma([value]));
    }

    pub fn foreground_count(&self) -> usize {
        self.image.pixels().filter(|p| p.0[0] != BACKGROUND).count()
    }

    pub fn as_image(&self) -> &GrayImage {
        &self.image
    }

    pub fn into_image(self) -> GrayImage {
        self.image
    }
}

/// One sub-panel cut out of the original figure.
#[derive(Debug, Clone)]
pub struct SubfigureCrop {
    /// Position in the crop list, 0-based
    pub index: usize,
    /// Box the crop was taken from, already clamped to the source image
    pub bbox: BoundingBox,
    pub image: RgbImage,
}

impl SubfigureCrop {
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

/// Boxes and crops found in one figure.
#[derive(Debug, Clone)]
pub struct SplitResult {
    pub boxes: Vec<BoundingBox>,
    pub crops: Vec<SubfigureCrop>,
    /// Original image dimensions
    pub image_width: u32,
    pub image_height: u32,
}

impl SplitResult {
    /// True when at least one sub-panel survived filtering.
    pub fn is_composite(&self) -> bool {
        !self.crops.is_empty()
    }
}

/// Outcome of decomposing a figure, with the whole-image fallback applied.
#[derive(Debug, Clone)]
pub enum Decomposition {
    /// The figure split into one or more sub-panels
    Composite(Vec<SubfigureCrop>),
    /// No sub-panel was found; the original image stands for itself
    Single(RgbImage),
}

impl Decomposition {
    pub fn is_composite(&self) -> bool {
        matches!(self, Decomposition::Composite(_))
    }

    pub fn len(&self) -> usize {
        match self {
            Decomposition::Composite(crops) => crops.len(),
            Decomposition::Single(_) => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Images in output order.
    pub fn images(&self) -> Vec<&RgbImage> {
        match self {
            Decomposition::Composite(crops) => crops.iter().map(|c| &c.image).collect(),
            Decomposition::Single(image) => vec![image],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_area_of_degenerate_box_is_zero() {
        // both extents negative must not multiply into a positive area
        let bbox = BoundingBox::new(10, 10, 5, 4);
        assert!(bbox.is_degenerate());
        assert_eq!(bbox.area(), 0);
    }

    #[test]
    fn test_margin_moves_corners_independently() {
        let bbox = BoundingBox::new(50, 50, 450, 450);
        let inset = bbox.with_margin(&Margin::default());
        assert_eq!(inset, BoundingBox::new(53, 53, 447, 447));

        let grown = bbox.with_margin(&Margin::uniform(2));
        assert_eq!(grown, BoundingBox::new(48, 48, 452, 452));
    }

    #[test]
    fn test_clamp_to_image() {
        let bbox = BoundingBox::new(-4, -2, 120, 90);
        assert_eq!(bbox.clamp_to(100, 80), BoundingBox::new(0, 0, 100, 80));

        let outside = BoundingBox::new(150, 10, 180, 20).clamp_to(100, 80);
        assert!(outside.is_degenerate());
    }

    #[test]
    fn test_mask_values() {
        let mut mask = BinaryMask::new(4, 3);
        mask.set(1, 2, true);
        assert_eq!(mask.get(1, 2), 1);
        assert_eq!(mask.get(0, 0), 0);
        assert_eq!(mask.foreground_count(), 1);

        let mut raw = GrayImage::new(2, 1);
        raw.put_pixel(0, 0, Luma([7]));
        let mask = BinaryMask::from_image(raw);
        assert_eq!(mask.as_image().get_pixel(0, 0).0[0], FOREGROUND);
        assert_eq!(mask.as_image().get_pixel(1, 0).0[0], BACKGROUND);
    }
}
