//! Facade crate for the `fishmark-*` workspace.
//!
//! Turns a directory of fish tracking images and their annotation logs into a
//! labeled crop dataset: for every frame, the eye is located by template
//! matching, tail base and tail tip are read from the frame's log, and four
//! square crops (head, tail tip, tail base, background) are written into one
//! directory per label.
//!
//! ## Quickstart
//!
//! ```no_run
//! use fishmark::{AnnotationPipeline, PipelineConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PipelineConfig::for_root("data/session_01");
//! let pipeline = AnnotationPipeline::new(config)?;
//! let run = pipeline.run()?;
//! println!("{} processed, {} skipped", run.summary.processed, run.summary.skipped);
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `fishmark::core`: frames, landmark labels and crop geometry.
//! - `fishmark::template`: normalized cross-correlation eye matcher.
//! - `fishmark::taillog`: tail landmark extraction from annotation logs.
//! - [`stack`]: image stack and template loading.
//! - [`pipeline`]: the per-frame extraction run.
//! - [`overlay`] and [`report`]: diagnostics produced by a run.
//! - [`logging`]: `env_logger` / `tracing` setup for binaries.

pub use fishmark_core as core;
pub use fishmark_taillog as taillog;
pub use fishmark_template as template;

pub mod config;
pub mod error;
pub mod logging;
pub mod overlay;
pub mod pipeline;
pub mod report;
pub mod stack;

pub use config::PipelineConfig;
pub use error::{ConfigError, FrameSkipReason, SetupError};
pub use fishmark_core::{EdgePolicy, FrameLandmarks, LandmarkLabel, RegionLayout};
pub use overlay::{AnnotatedStack, OverlayStyle};
pub use pipeline::{AnnotationPipeline, FrameOutcome, PipelineRun, RunSummary};
pub use report::RunReport;
pub use stack::{load_stack, ImageStack, LegacySensorCrop, StackError, StackOptions};

#[cfg(feature = "tracing")]
pub use logging::init_tracing;
pub use logging::init_logging;
