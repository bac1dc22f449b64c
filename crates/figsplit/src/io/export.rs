use std::path::{Path, PathBuf};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    caption::{Caption, FigureRecord},
    error::Result,
    io::naming::SubfigureName,
    types::{BoundingBox, Decomposition},
};

/// One persisted image and the text it inherits from its parent figure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SubfigureEntry {
    /// 1-based sub-figure number, absent for a figure kept whole
    pub subfigure: Option<u32>,
    pub file_name: String,
    pub bbox: BoundingBox,
    pub caption: Caption,
}

/// Everything recorded about one parent figure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FigureEntry {
    pub figure: u32,
    pub source: String,
    pub caption: Caption,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    /// Whether the image split into several sub-panels
    pub composite: bool,
    /// Whether the caption names panels like "(a)"
    pub caption_suggests_composite: bool,
    pub subfigures: Vec<SubfigureEntry>,
}

/// Per-paper index of extracted figures, written as `figures.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Manifest {
    pub paper: String,
    pub figures: Vec<FigureEntry>,
    /// Source files that could not be processed
    #[serde(default)]
    pub failures: Vec<String>,
}

impl Manifest {
    pub const FILE_NAME: &'static str = "figures.json";

    pub fn new(paper: impl Into<String>) -> Self {
        Self {
            paper: paper.into(),
            ..Default::default()
        }
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Save to `<dir>/figures.json`
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let path = dir.as_ref().join(Self::FILE_NAME);
        std::fs::write(&path, self.to_json_string()?)?;
        Ok(path)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Name every output image of a figure and attach the figure's caption to
/// each, without touching the filesystem.
pub fn label_subfigures(
    paper: &str,
    record: &FigureRecord,
    decomposition: &Decomposition,
) -> Vec<SubfigureEntry> {
    match decomposition {
        Decomposition::Composite(crops) => crops
            .iter()
            .map(|crop| {
                let subfigure = crop.index as u32 + 1;
                SubfigureEntry {
                    subfigure: Some(subfigure),
                    file_name: SubfigureName::crop(paper, record.figure, subfigure).to_string(),
                    bbox: crop.bbox,
                    caption: record.caption.clone(),
                }
            })
            .collect(),
        Decomposition::Single(image) => vec![SubfigureEntry {
            subfigure: None,
            file_name: SubfigureName::whole(paper, record.figure).to_string(),
            bbox: BoundingBox::full(image.width(), image.height()),
            caption: record.caption.clone(),
        }],
    }
}

/// Write the images of one decomposed figure into `output_dir`.
pub fn export_figure(
    output_dir: impl AsRef<Path>,
    paper: &str,
    source: &str,
    record: &FigureRecord,
    decomposition: &Decomposition,
) -> Result<FigureEntry> {
    let output_dir = output_dir.as_ref();
    std::fs::create_dir_all(output_dir)?;

    let subfigures = label_subfigures(paper, record, decomposition);
    for (entry, image) in subfigures.iter().zip(decomposition.images()) {
        let path = output_dir.join(&entry.file_name);
        image.save(&path)?;
        tracing::debug!("Wrote {} ({}x{})", path.display(), image.width(), image.height());
    }

    Ok(FigureEntry {
        figure: record.figure,
        source: source.to_string(),
        caption: record.caption.clone(),
        abstract_text: record.abstract_text.clone(),
        composite: decomposition.is_composite(),
        caption_suggests_composite: record.looks_composite(),
        subfigures,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SubfigureCrop;
    use image::{Rgb, RgbImage};

    fn crops(count: usize) -> Decomposition {
        Decomposition::Composite(
            (0..count)
                .map(|index| SubfigureCrop {
                    index,
                    bbox: BoundingBox::new(index as i64 * 10, 0, index as i64 * 10 + 8, 8),
                    image: RgbImage::from_pixel(8, 8, Rgb([index as u8 * 40, 0, 0])),
                })
                .collect(),
        )
    }

    #[test]
    fn test_not_found_caption_reaches_every_crop() {
        let record = FigureRecord::associate(&[], 4, "abstract");
        assert!(!record.caption.is_found());

        let entries = label_subfigures("paper", &record, &crops(3));
        assert_eq!(entries.len(), 3);
        assert!(entries.iter().all(|e| e.caption == Caption::not_found()));
        assert_eq!(entries[2].file_name, "paper_fig_4_3.jpg");
    }

    #[test]
    fn test_single_figure_uses_whole_name() {
        let record = FigureRecord {
            figure: 2,
            caption: Caption::new("Figure 2. A TEM image."),
            abstract_text: String::new(),
        };
        let single = Decomposition::Single(RgbImage::new(30, 20));
        let entries = label_subfigures("p1", &record, &single);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].file_name, "p1_fig_2.jpg");
        assert_eq!(entries[0].bbox, BoundingBox::new(0, 0, 30, 20));
    }

    #[test]
    fn test_export_writes_images_and_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let record = FigureRecord::associate(&[], 1, "");

        let entry = export_figure(dir.path(), "p0", "p0-Figure1-1.png", &record, &crops(2)).unwrap();
        assert!(entry.composite);
        assert!(dir.path().join("p0_fig_1_1.jpg").exists());
        assert!(dir.path().join("p0_fig_1_2.jpg").exists());

        let mut manifest = Manifest::new("p0");
        manifest.figures.push(entry.clone());
        let path = manifest.save(dir.path()).unwrap();
        let loaded = Manifest::load(path).unwrap();
        assert_eq!(loaded.figures, vec![entry]);
    }
}
