use crate::{
    algorithms::{
        ConnectedComponentLocator, LargestBoxesFilter, NestedBoxFilter, ThresholdBinarizer,
    },
    config::DecomposeConfig,
    error::Result,
    pipeline::Pipeline,
    traits::{Binarizer, BoxPostProcessor, ComponentLocator},
};

/// Builder for creating splitting pipelines with a fluent API
pub struct PipelineBuilder {
    binarizer: Option<Box<dyn Binarizer>>,
    locator: Option<Box<dyn ComponentLocator>>,
    postprocessors: Vec<Box<dyn BoxPostProcessor>>,
}

impl PipelineBuilder {
    /// Create a new pipeline builder
    pub fn new() -> Self {
        Self {
            binarizer: None,
            locator: None,
            postprocessors: Vec::new(),
        }
    }

    /// Set the binarizer (replaces any existing one)
    pub fn set_binarizer<B>(mut self, binarizer: B) -> Self
    where
        B: Binarizer + 'static,
    {
        self.binarizer = Some(Box::new(binarizer));
        self
    }

    /// Set the component locator (replaces any existing one)
    pub fn set_locator<L>(mut self, locator: L) -> Self
    where
        L: ComponentLocator + 'static,
    {
        self.locator = Some(Box::new(locator));
        self
    }

    /// Add a post-processor to the pipeline
    pub fn add_postprocessor<P>(mut self, postprocessor: P) -> Self
    where
        P: BoxPostProcessor + 'static,
    {
        self.postprocessors.push(Box::new(postprocessor));
        self
    }

    /// Drop boxes nested inside another box
    pub fn with_nested_removal(self) -> Self {
        self.add_postprocessor(NestedBoxFilter)
    }

    /// Keep only the `max` largest boxes
    pub fn with_max_subfigures(self, max: usize) -> Self {
        self.add_postprocessor(LargestBoxesFilter { max })
    }

    /// Build the pipeline with default components if not specified
    pub fn build(self) -> Pipeline {
        let binarizer = self
            .binarizer
            .unwrap_or_else(|| Box::new(ThresholdBinarizer::default()));

        let locator = self
            .locator
            .unwrap_or_else(|| Box::new(ConnectedComponentLocator::default()));

        Pipeline::new(binarizer, locator, self.postprocessors)
    }

    /// Build a pipeline from a validated configuration
    pub fn from_config(config: &DecomposeConfig) -> Result<Pipeline> {
        config.validate()?;

        let mut builder = Self::new()
            .set_binarizer(config.binarizer())
            .set_locator(config.locator());
        if config.drop_nested {
            builder = builder.with_nested_removal();
        }
        if let Some(max) = config.max_subfigures {
            builder = builder.with_max_subfigures(max);
        }
        Ok(builder.build())
    }

    /// Build a pipeline with default settings except threshold and minimum area
    pub fn build_simple(threshold: i32, min_area: u64) -> Pipeline {
        Self::new()
            .set_binarizer(ThresholdBinarizer {
                threshold,
                ..Default::default()
            })
            .set_locator(ConnectedComponentLocator {
                min_area,
                ..Default::default()
            })
            .build()
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
