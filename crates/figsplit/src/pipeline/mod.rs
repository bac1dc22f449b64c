pub mod builder;

use image::{DynamicImage, GrayImage, RgbImage};
use crate::{
    algorithms::crop,
    error::Result,
    traits::{Binarizer, BoxPostProcessor, ComponentLocator, FigureSplitter},
    types::{Decomposition, SplitResult},
};

/// A configurable pipeline for splitting composite figures
pub struct Pipeline {
    binarizer: Box<dyn Binarizer>,
    locator: Box<dyn ComponentLocator>,
    postprocessors: Vec<Box<dyn BoxPostProcessor>>,
}

impl Pipeline {
    /// Create a new pipeline builder
    pub fn builder() -> builder::PipelineBuilder {
        builder::PipelineBuilder::new()
    }

    /// Create a new pipeline with the given components
    pub fn new(
        binarizer: Box<dyn Binarizer>,
        locator: Box<dyn ComponentLocator>,
        postprocessors: Vec<Box<dyn BoxPostProcessor>>,
    ) -> Self {
        Self {
            binarizer,
            locator,
            postprocessors,
        }
    }

    /// Split a figure: segment on luminance, crop from colour
    pub fn process(&self, image: &DynamicImage) -> Result<SplitResult> {
        self.process_planes(&image.to_luma8(), &image.to_rgb8())
    }

    pub fn process_planes(&self, grey: &GrayImage, rgb: &RgbImage) -> Result<SplitResult> {
        let (width, height) = grey.dimensions();

        // Step 1: Binarize
        let mask = self.binarizer.binarize(grey)?;

        // Step 2: Locate sub-panels
        let mut boxes = self.locator.locate(&mask)?;

        // Step 3: Apply all post-processors in sequence
        for postprocessor in &self.postprocessors {
            postprocessor.process(&mut boxes)?;
        }

        // Step 4: Crop from the untouched colour image
        let crops = crop(rgb, &boxes)?;

        Ok(SplitResult {
            boxes,
            crops,
            image_width: width,
            image_height: height,
        })
    }

    /// Like [`Pipeline::process`], falling back to the whole image when the
    /// figure holds no separable sub-panel.
    pub fn decompose(&self, image: &DynamicImage) -> Result<Decomposition> {
        let rgb = image.to_rgb8();
        let result = self.process_planes(&image.to_luma8(), &rgb)?;
        if result.is_composite() {
            Ok(Decomposition::Composite(result.crops))
        } else {
            Ok(Decomposition::Single(rgb))
        }
    }

    /// Get information about the pipeline configuration
    pub fn info(&self) -> String {
        format!(
            "Pipeline: 1 binarizer, 1 component locator, {} postprocessors",
            self.postprocessors.len()
        )
    }
}

impl FigureSplitter for Pipeline {
    fn split(&self, image: &DynamicImage) -> Result<SplitResult> {
        self.process(image)
    }
}
