use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    algorithms::{
        binarize::validate_threshold, components::validate_margin, ComponentOrder,
        ConnectedComponentLocator, Connectivity, Opening, ThresholdBinarizer, DEFAULT_MIN_AREA,
        DEFAULT_THRESHOLD,
    },
    error::{FigSplitError, Result},
    types::Margin,
};

/// Every tunable of the decomposition, with defaults suited to figures
/// rendered at 200 DPI on a white page.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct DecomposeConfig {
    /// Pixels strictly darker than this are foreground
    #[schemars(range(min = 0, max = 255))]
    pub threshold: i32,
    /// Speckle removal applied to the thresholded mask
    pub opening: Opening,
    pub connectivity: Connectivity,
    /// Corner offsets applied to each located box
    pub margin: Margin,
    /// Boxes with an area at or below this are discarded
    pub min_area: u64,
    pub order: ComponentOrder,
    /// Drop boxes nested inside another accepted box
    pub drop_nested: bool,
    /// Keep only the largest N boxes
    pub max_subfigures: Option<usize>,
}

impl Default for DecomposeConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            opening: Opening::default(),
            connectivity: Connectivity::default(),
            margin: Margin::default(),
            min_area: DEFAULT_MIN_AREA,
            order: ComponentOrder::default(),
            drop_nested: false,
            max_subfigures: None,
        }
    }
}

impl DecomposeConfig {
    /// Get the JSON schema of the configuration
    pub fn schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(DecomposeConfig)
    }

    pub fn validate(&self) -> Result<()> {
        validate_threshold(self.threshold)?;
        validate_margin(&self.margin)?;
        if self.max_subfigures == Some(0) {
            return Err(FigSplitError::InvalidParameter(
                "max_subfigures must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn binarizer(&self) -> ThresholdBinarizer {
        ThresholdBinarizer {
            threshold: self.threshold,
            opening: self.opening,
        }
    }

    pub fn locator(&self) -> ConnectedComponentLocator {
        ConnectedComponentLocator {
            connectivity: self.connectivity,
            margin: self.margin,
            min_area: self.min_area,
            order: self.order,
        }
    }
}
