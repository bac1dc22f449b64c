use clap::{Parser, Subcommand};
use cli::{load_decompose_config, run_batch, BatchConfig};
use color_eyre::eyre::Result;
use figsplit::{
    dataset::{list_papers, seeded_rng, train_test_split},
    export_figure, ComponentOrder, Connectivity, DecomposeConfig, FigureRecord, PipelineBuilder,
};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split a single figure image into its sub-panels
    Split {
        /// Path to the figure image
        #[arg(short, long)]
        input: PathBuf,
        /// Output directory for the crops
        #[arg(short, long)]
        output_dir: PathBuf,
        /// Paper identifier used in output file names
        #[arg(long, default_value = "figure")]
        paper: String,
        /// Figure number used in output file names
        #[arg(long, default_value = "1")]
        figure: u32,
        /// Decomposition settings (.toml or .json); flags below override it
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Pixels darker than this are foreground (0-255)
        #[arg(long)]
        threshold: Option<i32>,
        /// Minimum sub-panel area in square pixels
        #[arg(long)]
        min_area: Option<u64>,
        /// Pixel connectivity: four or eight
        #[arg(long)]
        connectivity: Option<Connectivity>,
        /// Box order: label or reading_order
        #[arg(long)]
        order: Option<ComponentOrder>,
    },
    /// Split every figure of one paper's pdffigures2 output
    Batch {
        /// Path to the batch configuration file (.toml or .json)
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Draw a reproducible train/test split of paper folders
    DatasetSplit {
        /// Directory whose sub-directories are papers
        #[arg(short, long)]
        papers: PathBuf,
        #[arg(long, default_value = "500")]
        train: usize,
        #[arg(long, default_value = "2500")]
        test: usize,
        #[arg(long, default_value = "2189")]
        seed: u64,
        /// Drop drawn papers whose name contains this term
        #[arg(long)]
        exclude: Option<String>,
        /// Where to write the split as JSON
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Print the JSON schema of the decomposition settings
    Schema,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Split {
            input,
            output_dir,
            paper,
            figure,
            config,
            threshold,
            min_area,
            connectivity,
            order,
        } => {
            let mut settings = match config {
                Some(path) => load_decompose_config(path)?,
                None => DecomposeConfig::default(),
            };
            if let Some(threshold) = threshold {
                settings.threshold = threshold;
            }
            if let Some(min_area) = min_area {
                settings.min_area = min_area;
            }
            if let Some(connectivity) = connectivity {
                settings.connectivity = connectivity;
            }
            if let Some(order) = order {
                settings.order = order;
            }
            split_single(&input, &output_dir, &paper, figure, &settings)?;
        }
        Commands::Batch { config } => {
            let batch = BatchConfig::from_file(&config)?;
            run_batch(&batch).await?;
        }
        Commands::DatasetSplit {
            papers,
            train,
            test,
            seed,
            exclude,
            output,
        } => {
            dataset_split(&papers, train, test, seed, exclude.as_deref(), &output)?;
        }
        Commands::Schema => {
            println!("{}", serde_json::to_string_pretty(&DecomposeConfig::schema())?);
        }
    }

    Ok(())
}

fn split_single(
    input: &Path,
    output_dir: &Path,
    paper: &str,
    figure: u32,
    settings: &DecomposeConfig,
) -> Result<()> {
    let pipeline = PipelineBuilder::from_config(settings)?;
    info!("{}", pipeline.info());

    let image = image::open(input)?;
    let decomposition = pipeline.decompose(&image)?;
    if !decomposition.is_composite() {
        info!("No sub-panels found in {:?}, keeping the whole figure", input);
    }

    let record = FigureRecord::associate(&[], figure, "");
    let source = input.to_string_lossy();
    let entry = export_figure(output_dir, paper, &source, &record, &decomposition)?;

    for subfigure in &entry.subfigures {
        info!("{} <- {}", subfigure.file_name, subfigure.bbox);
    }
    info!("✅ Wrote {} image(s) to {:?}", entry.subfigures.len(), output_dir);
    Ok(())
}

fn dataset_split(
    papers_dir: &Path,
    n_train: usize,
    n_test: usize,
    seed: u64,
    exclude: Option<&str>,
    output: &Path,
) -> Result<()> {
    let papers = list_papers(papers_dir)?;
    info!("Found {} paper folder(s) in {:?}", papers.len(), papers_dir);

    let mut rng = seeded_rng(seed);
    let split = train_test_split(&papers, n_train, n_test, exclude, &mut rng)?;
    std::fs::write(output, serde_json::to_string_pretty(&split)?)?;

    info!(
        "✅ {} train / {} test paper(s) written to {:?}",
        split.train.len(),
        split.test.len(),
        output
    );
    Ok(())
}
