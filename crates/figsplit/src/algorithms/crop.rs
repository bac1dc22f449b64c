use image::{imageops::crop_imm, RgbImage};

use crate::{
    error::{FigSplitError, Result},
    types::{BoundingBox, SubfigureCrop},
};

/// Cut each box out of `image`, in the order given.
///
/// Boxes reaching past the image edge are clamped, so a crop can be smaller
/// than its nominal box. A box that does not overlap the image at all is
/// rejected with [`FigSplitError::OutOfBounds`].
pub fn crop(image: &RgbImage, boxes: &[BoundingBox]) -> Result<Vec<SubfigureCrop>> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(FigSplitError::InvalidInput(format!(
            "cannot crop from a {width}x{height} image"
        )));
    }

    boxes
        .iter()
        .enumerate()
        .map(|(index, requested)| {
            let bbox = requested.clamp_to(width, height);
            if bbox.is_degenerate() {
                return Err(FigSplitError::OutOfBounds {
                    bbox: *requested,
                    width,
                    height,
                });
            }

            let view = crop_imm(
                image,
                bbox.x0 as u32,
                bbox.y0 as u32,
                bbox.width() as u32,
                bbox.height() as u32,
            );
            Ok(SubfigureCrop {
                index,
                bbox,
                image: view.to_image(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| Rgb([x as u8, y as u8, 7]))
    }

    #[test]
    fn test_crop_dimensions_and_content() {
        let image = gradient(100, 80);
        let boxes = [BoundingBox::new(10, 20, 40, 30), BoundingBox::new(0, 0, 5, 5)];

        let crops = crop(&image, &boxes).unwrap();
        assert_eq!(crops.len(), 2);
        assert_eq!(crops[0].index, 0);
        assert_eq!(crops[0].dimensions(), (30, 10));
        assert_eq!(crops[0].image.get_pixel(0, 0), &Rgb([10, 20, 7]));
        assert_eq!(crops[0].image.get_pixel(29, 9), &Rgb([39, 29, 7]));
        assert_eq!(crops[1].dimensions(), (5, 5));
    }

    #[test]
    fn test_partial_overlap_is_clamped() {
        let image = gradient(50, 50);
        let crops = crop(&image, &[BoundingBox::new(-10, 40, 20, 70)]).unwrap();
        assert_eq!(crops[0].bbox, BoundingBox::new(0, 40, 20, 50));
        assert_eq!(crops[0].dimensions(), (20, 10));
    }

    #[test]
    fn test_disjoint_box_is_out_of_bounds() {
        let image = gradient(50, 50);
        let err = crop(&image, &[BoundingBox::new(60, 0, 70, 10)]).unwrap_err();
        assert!(matches!(err, FigSplitError::OutOfBounds { width: 50, height: 50, .. }));
    }

    #[test]
    fn test_source_is_untouched() {
        let image = gradient(20, 20);
        let before = image.clone();
        let mut crops = crop(&image, &[BoundingBox::new(0, 0, 10, 10)]).unwrap();
        crops[0].image.put_pixel(0, 0, Rgb([255, 255, 255]));
        assert_eq!(image, before);
    }

    #[test]
    fn test_no_boxes_no_crops() {
        let image = gradient(4, 4);
        assert!(crop(&image, &[]).unwrap().is_empty());
    }
}
