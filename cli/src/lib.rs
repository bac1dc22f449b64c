use figsplit::{
    export_figure, CaptionRecord, DecomposeConfig, ExtractedFigureName, FigSplitError,
    FigureEntry, FigureRecord, Manifest, Pipeline, PipelineBuilder, NOT_FOUND,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{AcquireError, Semaphore};
use tokio::task::{Id, JoinSet};
use tracing::{error, info, warn};

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),
    #[error(transparent)]
    TomlDeError(#[from] toml::de::Error),
    #[error(transparent)]
    TomlSerError(#[from] toml::ser::Error),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error(transparent)]
    FigSplit(#[from] FigSplitError),
    #[error(transparent)]
    Acquire(#[from] AcquireError),
    #[error("No extracted figures found in {0}")]
    NoFigures(String),
    #[error("Figures of several papers found ({}); set `paper` to pick one", .0.join(", "))]
    MixedPapers(Vec<String>),
    #[error("Unsupported file format. Please use .toml or .json files")]
    UnsupportedFileFormat,
}

/// Batch job over one paper's pdffigures2 output
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct BatchConfig {
    /// Directory holding the rendered figures (`<paper>-Figure<N>-<k>.png`)
    pub input_dir: String,
    /// Directory the crops and `figures.json` are written to
    pub output_dir: String,
    /// Paper identifier used in output names; taken from the figure file names when absent
    pub paper: Option<String>,
    /// pdffigures2 caption JSON for the paper
    pub captions: Option<String>,
    /// Plain-text file with the paper abstract (or its first page)
    pub abstract_path: Option<String>,
    /// Number of figures processed concurrently; defaults to the CPU count
    pub jobs: Option<usize>,
    #[serde(default)]
    pub decompose: DecomposeConfig,
}

impl BatchConfig {
    /// Load BatchConfig configuration from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, CliError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load BatchConfig configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self, CliError> {
        let config: BatchConfig = toml::from_str(content)?;
        config.decompose.validate()?;
        Ok(config)
    }

    /// Load BatchConfig configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, CliError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Load BatchConfig configuration from JSON string
    pub fn from_json(content: &str) -> Result<Self, CliError> {
        let config: BatchConfig = serde_json::from_str(content)?;
        config.decompose.validate()?;
        Ok(config)
    }

    /// Auto-detect file format and load configuration
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CliError> {
        let path_ref = path.as_ref();
        match path_ref.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_file(path),
            Some("json") => Self::from_json_file(path),
            _ => Err(CliError::UnsupportedFileFormat),
        }
    }

    /// Convert BatchConfig to TOML string
    pub fn to_toml(&self) -> Result<String, CliError> {
        Ok(toml::to_string_pretty(&self)?)
    }

    /// Convert BatchConfig to JSON string
    pub fn to_json(&self) -> Result<String, CliError> {
        Ok(serde_json::to_string_pretty(&self)?)
    }

    /// Caption records, empty when no caption file is configured
    pub fn load_captions(&self) -> Result<Vec<CaptionRecord>, CliError> {
        match &self.captions {
            Some(path) => Ok(figsplit::caption::load_caption_records(path)?),
            None => Ok(Vec::new()),
        }
    }

    pub fn load_abstract(&self) -> Result<String, CliError> {
        match &self.abstract_path {
            Some(path) => Ok(fs::read_to_string(path)?.trim().to_string()),
            None => Ok(String::new()),
        }
    }
}

/// Load a DecomposeConfig from a `.toml` or `.json` file
pub fn load_decompose_config<P: AsRef<Path>>(path: P) -> Result<DecomposeConfig, CliError> {
    let path_ref = path.as_ref();
    let content = fs::read_to_string(path_ref)?;
    let config: DecomposeConfig = match path_ref.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => toml::from_str(&content)?,
        Some("json") => serde_json::from_str(&content)?,
        _ => return Err(CliError::UnsupportedFileFormat),
    };
    config.validate()?;
    Ok(config)
}

/// An extracted figure queued for splitting
#[derive(Debug, Clone, PartialEq)]
pub struct FigureJob {
    pub path: PathBuf,
    pub name: ExtractedFigureName,
}

/// Figures of one paper in `input_dir`, ordered by figure number.
///
/// Tables and unrelated files are skipped; when a figure was rendered more
/// than once only its lowest variant is kept. With `paper` set, other papers'
/// figures are ignored; without it the directory must hold a single paper.
pub fn collect_figures<P: AsRef<Path>>(
    input_dir: P,
    paper: Option<&str>,
) -> Result<Vec<FigureJob>, CliError> {
    let mut by_figure: BTreeMap<(String, u32), FigureJob> = BTreeMap::new();

    for entry in fs::read_dir(input_dir.as_ref())? {
        let path = entry?.path();
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Ok(name) = ExtractedFigureName::parse(file_name) else {
            continue;
        };
        if name.is_table() || paper.is_some_and(|p| p != name.paper) {
            continue;
        }

        let key = (name.paper.clone(), name.number);
        let seen_lower = by_figure
            .get(&key)
            .is_some_and(|existing| existing.name.variant <= name.variant);
        if !seen_lower {
            by_figure.insert(key, FigureJob { path, name });
        }
    }

    if by_figure.is_empty() {
        return Err(CliError::NoFigures(input_dir.as_ref().display().to_string()));
    }

    let papers: BTreeSet<&str> = by_figure.keys().map(|(paper, _)| paper.as_str()).collect();
    if papers.len() > 1 {
        return Err(CliError::MixedPapers(papers.into_iter().map(str::to_string).collect()));
    }
    Ok(by_figure.into_values().collect())
}

/// Split one figure, attach its caption and write the results.
pub fn process_figure(
    pipeline: &Pipeline,
    job: &FigureJob,
    paper: &str,
    records: &[CaptionRecord],
    abstract_text: &str,
    output_dir: &Path,
) -> Result<FigureEntry, CliError> {
    let image = image::open(&job.path).map_err(FigSplitError::from)?;
    let decomposition = pipeline.decompose(&image)?;
    let record = FigureRecord::associate(records, job.name.number, abstract_text);

    let source = job
        .path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(export_figure(output_dir, paper, &source, &record, &decomposition)?)
}

fn take_source(sources: &mut HashMap<Id, PathBuf>, id: Id) -> String {
    sources
        .remove(&id)
        .map(|path| path.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("task {id}"))
}

/// Split every figure of a batch concurrently and save `figures.json`.
///
/// A figure that fails, or whose task panics, is logged and listed in
/// `Manifest::failures`; the other figures are still processed.
pub async fn run_batch(batch: &BatchConfig) -> Result<Manifest, CliError> {
    let jobs = collect_figures(&batch.input_dir, batch.paper.as_deref())?;
    let paper = jobs
        .first()
        .map(|job| job.name.paper.clone())
        .ok_or_else(|| CliError::NoFigures(batch.input_dir.clone()))?;

    let records = Arc::new(batch.load_captions()?);
    let abstract_text = Arc::new(batch.load_abstract()?);
    let pipeline = Arc::new(PipelineBuilder::from_config(&batch.decompose)?);
    let output_dir = PathBuf::from(&batch.output_dir);
    fs::create_dir_all(&output_dir)?;

    let workers = batch
        .jobs
        .or_else(|| std::thread::available_parallelism().ok().map(|n| n.get()))
        .unwrap_or(1)
        .max(1);
    info!(
        "Splitting {} figure(s) of '{}' with {} worker(s)",
        jobs.len(),
        paper,
        workers
    );
    if records.is_empty() {
        warn!("No caption records loaded; every caption will be '{}'", NOT_FOUND);
    }

    let permits = Arc::new(Semaphore::new(workers));
    let mut tasks = JoinSet::new();
    let mut sources: HashMap<Id, PathBuf> = HashMap::new();
    for job in jobs {
        let permit = permits.clone().acquire_owned().await?;
        let pipeline = pipeline.clone();
        let records = records.clone();
        let abstract_text = abstract_text.clone();
        let output_dir = output_dir.clone();
        let paper = paper.clone();
        let path = job.path.clone();

        let handle = tasks.spawn_blocking(move || {
            let _permit = permit;
            process_figure(&pipeline, &job, &paper, &records, &abstract_text, &output_dir)
        });
        sources.insert(handle.id(), path);
    }

    let mut manifest = Manifest::new(&paper);
    while let Some(joined) = tasks.join_next_with_id().await {
        match joined {
            Ok((_, Ok(entry))) => {
                info!(
                    "Figure {}: {} image(s){}",
                    entry.figure,
                    entry.subfigures.len(),
                    if entry.composite { "" } else { " (kept whole)" }
                );
                manifest.figures.push(entry);
            }
            Ok((id, Err(e))) => {
                let source = take_source(&mut sources, id);
                warn!("Failed to process {}: {}", source, e);
                manifest.failures.push(source);
            }
            Err(e) => {
                let source = take_source(&mut sources, e.id());
                error!("Figure task for {} panicked: {}", source, e);
                manifest.failures.push(source);
            }
        }
    }

    manifest.figures.sort_by_key(|entry| entry.figure);
    manifest.failures.sort();
    let manifest_path = manifest.save(&output_dir)?;

    info!(
        "✅ Processed {} figure(s), {} failure(s); manifest saved to {:?}",
        manifest.figures.len(),
        manifest.failures.len(),
        manifest_path
    );
    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use figsplit::{Caption, PipelineBuilder};
    use image::{Rgb, RgbImage};

    const TOML_CONFIG: &str = r#"
input_dir = "out/imgs"
output_dir = "dataset/paper/imgs"
paper = "captions"
captions = "out/captions.json"

[decompose]
threshold = 245
min_area = 10000

[decompose.margin]
top_left = [2, 2]
bottom_right = [-2, -2]
"#;

    #[test]
    fn test_batch_config_from_toml() {
        let config = BatchConfig::from_toml(TOML_CONFIG).unwrap();
        assert_eq!(config.paper.as_deref(), Some("captions"));
        assert_eq!(config.decompose.threshold, 245);
        assert_eq!(config.decompose.min_area, 10_000);
        assert_eq!(config.decompose.margin.top_left, (2, 2));
        assert_eq!(config.jobs, None);

        let json = config.to_json().unwrap();
        assert_eq!(BatchConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_invalid_threshold_rejected_on_load() {
        let content = TOML_CONFIG.replace("threshold = 245", "threshold = 999");
        assert!(matches!(
            BatchConfig::from_toml(&content),
            Err(CliError::FigSplit(FigSplitError::InvalidParameter(_)))
        ));
    }

    #[test]
    fn test_unsupported_extension() {
        assert!(matches!(
            BatchConfig::from_file("config.yaml"),
            Err(CliError::UnsupportedFileFormat)
        ));
    }

    fn write_figure(dir: &Path, name: &str, panels: &[(u32, u32)]) {
        let mut image = RgbImage::from_pixel(700, 300, Rgb([255, 255, 255]));
        for &(x0, y0) in panels {
            for y in y0..y0 + 250 {
                for x in x0..x0 + 250 {
                    image.put_pixel(x, y, Rgb([30, 30, 30]));
                }
            }
        }
        image.save(dir.join(name)).unwrap();
    }

    #[test]
    fn test_collect_figures_skips_tables_and_extra_variants() {
        let dir = tempfile::tempdir().unwrap();
        write_figure(dir.path(), "captions-Figure2-1.png", &[]);
        write_figure(dir.path(), "captions-Figure1-2.png", &[]);
        write_figure(dir.path(), "captions-Figure1-1.png", &[]);
        write_figure(dir.path(), "captions-Table1-1.png", &[]);
        fs::write(dir.path().join("captions.json"), "[]").unwrap();

        let jobs = collect_figures(dir.path(), None).unwrap();
        let names: Vec<(u32, u32)> = jobs.iter().map(|j| (j.name.number, j.name.variant)).collect();
        assert_eq!(names, vec![(1, 1), (2, 1)]);
    }

    #[test]
    fn test_collect_figures_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(collect_figures(dir.path(), None), Err(CliError::NoFigures(_))));
    }

    #[test]
    fn test_process_figure_end_to_end() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        write_figure(input.path(), "captions-Figure3-1.png", &[(25, 25), (400, 25)]);

        let jobs = collect_figures(input.path(), None).unwrap();
        let pipeline = PipelineBuilder::from_config(&DecomposeConfig::default()).unwrap();
        let entry = process_figure(&pipeline, &jobs[0], "captions", &[], "", output.path()).unwrap();

        assert!(entry.composite);
        assert_eq!(entry.figure, 3);
        assert_eq!(entry.subfigures.len(), 2);
        assert!(entry.subfigures.iter().all(|s| s.caption == Caption::not_found()));
        assert!(output.path().join("captions_fig_3_1.jpg").exists());
        assert!(output.path().join("captions_fig_3_2.jpg").exists());
    }

    #[test]
    fn test_collect_figures_keeps_papers_apart() {
        let dir = tempfile::tempdir().unwrap();
        write_figure(dir.path(), "p0-Figure1-1.png", &[]);
        write_figure(dir.path(), "p1-Figure1-1.png", &[]);
        write_figure(dir.path(), "p1-Figure2-1.png", &[]);

        match collect_figures(dir.path(), None) {
            Err(CliError::MixedPapers(papers)) => assert_eq!(papers, vec!["p0", "p1"]),
            other => panic!("expected MixedPapers, got {other:?}"),
        }

        let p1 = collect_figures(dir.path(), Some("p1")).unwrap();
        let names: Vec<(&str, u32)> = p1.iter().map(|j| (j.name.paper.as_str(), j.name.number)).collect();
        assert_eq!(names, vec![("p1", 1), ("p1", 2)]);

        let p0 = collect_figures(dir.path(), Some("p0")).unwrap();
        assert_eq!(p0.len(), 1);
        assert_eq!(p0[0].path, dir.path().join("p0-Figure1-1.png"));

        assert!(matches!(
            collect_figures(dir.path(), Some("p9")),
            Err(CliError::NoFigures(_))
        ));
    }

    #[tokio::test]
    async fn test_run_batch_isolates_broken_figure() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        write_figure(input.path(), "captions-Figure1-1.png", &[(25, 25), (400, 25)]);
        fs::write(input.path().join("captions-Figure2-1.png"), b"not a png").unwrap();
        write_figure(input.path(), "captions-Figure3-1.png", &[(25, 25)]);

        let batch = BatchConfig {
            input_dir: input.path().display().to_string(),
            output_dir: output.path().display().to_string(),
            paper: None,
            captions: None,
            abstract_path: None,
            jobs: Some(2),
            decompose: DecomposeConfig::default(),
        };
        let manifest = run_batch(&batch).await.unwrap();

        assert_eq!(manifest.paper, "captions");
        let figures: Vec<u32> = manifest.figures.iter().map(|f| f.figure).collect();
        assert_eq!(figures, vec![1, 3]);
        assert_eq!(manifest.failures.len(), 1);
        assert!(manifest.failures[0].ends_with("captions-Figure2-1.png"));

        assert!(output.path().join("captions_fig_1_1.jpg").exists());
        assert!(output.path().join("captions_fig_1_2.jpg").exists());
        assert!(output.path().join("captions_fig_3_1.jpg").exists());
        let saved = Manifest::load(output.path().join(Manifest::FILE_NAME)).unwrap();
        assert_eq!(saved.failures, manifest.failures);
    }
}
