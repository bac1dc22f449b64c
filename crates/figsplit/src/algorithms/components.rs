use image::Luma;
use imageproc::region_labelling::{connected_components, Connectivity as LabelConnectivity};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr, VariantNames};

use crate::{
    error::{FigSplitError, Result},
    traits::ComponentLocator,
    types::{BinaryMask, BoundingBox, Margin, BACKGROUND},
};

/// Smallest accepted sub-panel, in square pixels (a 200x200 panel).
pub const DEFAULT_MIN_AREA: u64 = 200 * 200;

/// Largest absolute margin offset accepted, in pixels.
pub const MAX_MARGIN: i32 = 128;

/// Pixel adjacency used when merging foreground pixels into components.
#[derive(
    Debug, Clone, Copy, Default,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter, VariantNames, IntoStaticStr,
    PartialEq, Eq
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Connectivity {
    /// Edge neighbours only
    Four,
    /// Edge and diagonal neighbours
    #[default]
    Eight,
}

impl From<Connectivity> for LabelConnectivity {
    fn from(value: Connectivity) -> Self {
        match value {
            Connectivity::Four => LabelConnectivity::Four,
            Connectivity::Eight => LabelConnectivity::Eight,
        }
    }
}

/// Order of the returned boxes.
#[derive(
    Debug, Clone, Copy, Default,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter, VariantNames, IntoStaticStr,
    PartialEq, Eq
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ComponentOrder {
    /// Ascending label id: the raster order in which each component's first
    /// pixel is met
    Label,
    /// Row-major on the top-left corner, `(y0, x0)`
    #[default]
    ReadingOrder,
}

pub(crate) fn validate_margin(margin: &Margin) -> Result<()> {
    if let Some(offset) = margin
        .offsets()
        .into_iter()
        .find(|o| o.abs() > MAX_MARGIN)
    {
        return Err(FigSplitError::InvalidParameter(format!(
            "margin offset {offset} outside [-{MAX_MARGIN}, {MAX_MARGIN}]"
        )));
    }
    Ok(())
}

/// Tight half-open box of every component, in ascending label order.
pub fn component_extents(mask: &BinaryMask, connectivity: Connectivity) -> Result<Vec<BoundingBox>> {
    if mask.is_empty() {
        return Err(FigSplitError::InvalidInput(format!(
            "cannot label a {}x{} mask",
            mask.width(),
            mask.height()
        )));
    }

    let labels = connected_components(mask.as_image(), connectivity.into(), Luma([BACKGROUND]));

    let mut extents: Vec<Option<BoundingBox>> = Vec::new();
    for (x, y, label) in labels.enumerate_pixels() {
        let label = label.0[0] as usize;
        if label == 0 {
            continue;
        }
        if extents.len() < label {
            extents.resize(label, None);
        }

        let (x, y) = (x as i64, y as i64);
        let bbox = extents[label - 1].get_or_insert(BoundingBox::new(x, y, x + 1, y + 1));
        bbox.x0 = bbox.x0.min(x);
        bbox.y0 = bbox.y0.min(y);
        bbox.x1 = bbox.x1.max(x + 1);
        bbox.y1 = bbox.y1.max(y + 1);
    }

    Ok(extents.into_iter().flatten().collect())
}

/// Locate sub-panels with 8-connectivity, returned in reading order.
///
/// Each component's tight box is shifted by `margin`, clamped to the mask
/// and kept only when its area is strictly greater than `min_area`. An
/// all-background mask yields an empty list.
pub fn locate_components(mask: &BinaryMask, margin: Margin, min_area: u64) -> Result<Vec<BoundingBox>> {
    ConnectedComponentLocator {
        margin,
        min_area,
        ..Default::default()
    }
    .locate(mask)
}

/// Connected-component based sub-panel locator
#[derive(Debug, Clone)]
pub struct ConnectedComponentLocator {
    pub connectivity: Connectivity,
    pub margin: Margin,
    pub min_area: u64,
    pub order: ComponentOrder,
}

impl Default for ConnectedComponentLocator {
    fn default() -> Self {
        Self {
            connectivity: Connectivity::default(),
            margin: Margin::default(),
            min_area: DEFAULT_MIN_AREA,
            order: ComponentOrder::default(),
        }
    }
}

impl ComponentLocator for ConnectedComponentLocator {
    fn locate(&self, mask: &BinaryMask) -> Result<Vec<BoundingBox>> {
        validate_margin(&self.margin)?;
        let (width, height) = mask.dimensions();

        let mut boxes: Vec<BoundingBox> = component_extents(mask, self.connectivity)?
            .into_iter()
            .map(|bbox| bbox.with_margin(&self.margin).clamp_to(width, height))
            .filter(|bbox| bbox.area() > self.min_area)
            .collect();

        if self.order == ComponentOrder::ReadingOrder {
            // stable: ties keep label order
            boxes.sort_by_key(|bbox| (bbox.y0, bbox.x0));
        }

        Ok(boxes)
    }
}
