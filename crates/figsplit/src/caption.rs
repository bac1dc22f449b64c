//! Caption lookup for extracted figures.
//!
//! pdffigures2 writes one JSON array per paper describing every figure and
//! table it rendered. The records are not sorted and their `name` field is
//! free text, so lookups scan the whole list and compare parsed numbers.

use std::{fmt, path::Path, sync::LazyLock};

use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use crate::error::Result;

/// Caption text used when no record matches a figure.
pub const NOT_FOUND: &str = "not found";

static KEYWORD_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:figure|fig\.?|table)\s*-?\s*(\d+)").expect("valid figure-number regex")
});
static BARE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+)\s*$").expect("valid number regex"));

#[derive(
    Debug, Clone, Copy,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, IntoStaticStr,
    PartialEq, Eq, Hash
)]
#[strum(ascii_case_insensitive)]
pub enum FigureKind {
    Figure,
    Table,
}

/// One entry of a pdffigures2 caption file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CaptionRecord {
    #[serde(default)]
    pub fig_type: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default, rename = "renderURL")]
    pub render_url: Option<String>,
    #[serde(default)]
    pub image_text: Vec<String>,
}

impl CaptionRecord {
    pub fn kind(&self) -> Option<FigureKind> {
        self.fig_type.as_deref().and_then(|t| t.parse().ok())
    }

    pub fn number(&self) -> Option<u32> {
        parse_figure_number(&self.name)
    }
}

/// Load the caption records written for one paper.
pub fn load_caption_records(path: impl AsRef<Path>) -> Result<Vec<CaptionRecord>> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Parse the figure number out of a record name or file name.
///
/// Accepts `"3"`, `"03"`, `"Figure12"` and names like `"p0-Figure12-1.png"`,
/// where the number following the figure keyword wins over earlier digits.
/// Prefixed names such as the supplementary `"S1"` do not parse.
pub fn parse_figure_number(name: &str) -> Option<u32> {
    if let Some(captures) = KEYWORD_NUMBER.captures(name) {
        return captures[1].parse().ok();
    }
    BARE_NUMBER
        .captures(name)
        .and_then(|captures| captures[1].parse().ok())
}

/// Caption attached to a figure, or the [`NOT_FOUND`] sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct Caption(String);

impl Caption {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn not_found() -> Self {
        Self(NOT_FOUND.to_string())
    }

    pub fn is_found(&self) -> bool {
        self.0 != NOT_FOUND
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Caption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Find the caption of figure/table `number`, scanning every record.
pub fn find_caption(records: &[CaptionRecord], kind: FigureKind, number: u32) -> Caption {
    records
        .iter()
        .filter(|record| record.kind() == Some(kind))
        .find(|record| record.number() == Some(number))
        .map(|record| Caption::new(record.caption.clone()))
        .unwrap_or_else(Caption::not_found)
}

/// Heuristic: captions naming panel `(a)` or `a.` usually describe a
/// composite figure.
pub fn looks_composite(caption: &str) -> bool {
    let lower = caption.to_lowercase();
    lower.contains("(a)") || lower.contains(" a. ")
}

/// Text attached to every sub-figure cut from one parent figure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FigureRecord {
    pub figure: u32,
    pub caption: Caption,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
}

impl FigureRecord {
    pub fn associate(records: &[CaptionRecord], figure: u32, abstract_text: impl Into<String>) -> Self {
        Self {
            figure,
            caption: find_caption(records, FigureKind::Figure, figure),
            abstract_text: abstract_text.into(),
        }
    }

    pub fn looks_composite(&self) -> bool {
        self.caption.is_found() && looks_composite(self.caption.as_str())
    }
}
