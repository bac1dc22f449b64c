//! # Composite Figure Splitting Library
//!
//! Splits figures extracted from scientific papers into their sub-panels.
//! A figure is binarized against its white page background, connected
//! foreground regions are boxed and filtered by size, and each surviving box
//! is cropped out of the original colour image.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use figsplit::Pipeline;
//!
//! let pipeline = Pipeline::builder().build();
//!
//! let figure = image::open("captions-Figure3-1.png")?;
//! let result = pipeline.process(&figure)?;
//! for crop in &result.crops {
//!     crop.image.save(format!("captions_fig_3_{}.jpg", crop.index + 1))?;
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Individual steps
//!
//! ```rust,no_run
//! use figsplit::{binarize, crop, locate_components, Margin, DEFAULT_MIN_AREA};
//!
//! let figure = image::open("figure.png")?;
//! let mask = binarize(&figure.to_luma8(), 250)?;
//! let boxes = locate_components(&mask, Margin::default(), DEFAULT_MIN_AREA)?;
//! let crops = crop(&figure.to_rgb8(), &boxes)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

// Core modules
pub mod error;
pub mod types;
pub mod traits;
pub mod algorithms;
pub mod pipeline;
pub mod config;
pub mod caption;
pub mod io;
pub mod dataset;

// Re-exports for convenience
pub use error::{FigSplitError, Result};
pub use types::{BinaryMask, BoundingBox, Decomposition, Margin, SplitResult, SubfigureCrop};
pub use traits::*;
pub use algorithms::*;
pub use pipeline::{Pipeline, builder::PipelineBuilder};
pub use config::DecomposeConfig;
pub use caption::{Caption, CaptionRecord, FigureKind, FigureRecord, NOT_FOUND};
pub use io::*;
