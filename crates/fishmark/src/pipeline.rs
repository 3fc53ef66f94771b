//! Per-frame landmark localization and crop extraction.
//!
//! For every frame of the stack: locate the eye with the template, read the
//! tail landmarks from the frame's log, cut four crops and write them to their
//! label directories. A frame whose log is missing or incomplete (or whose
//! crops cannot be cut) is skipped with a recorded reason; only setup problems
//! abort a run.

use crate::config::PipelineConfig;
use crate::error::{FrameSkipReason, SetupError};
use crate::overlay::{annotate, to_rgb, AnnotatedStack};
use crate::stack::{load_stack, load_template, ImageStack};
use fishmark_core::{crop, Frame, FrameLandmarks, LabeledRegions, LandmarkLabel};
use fishmark_taillog::TailLogParser;
use fishmark_template::{best_match, Template};
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Crops written for one frame.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProcessedFrame {
    pub name: String,
    pub landmarks: FrameLandmarks,
    pub eye_score: f32,
    pub regions: LabeledRegions,
    pub crops: Vec<PathBuf>,
}

/// A frame that produced no crops.
#[derive(Debug)]
pub struct SkippedFrame {
    pub name: String,
    pub reason: FrameSkipReason,
}

/// Result of one frame.
#[derive(Debug)]
pub enum FrameOutcome {
    Processed(ProcessedFrame),
    Skipped(SkippedFrame),
}

impl FrameOutcome {
    pub fn name(&self) -> &str {
        match self {
            FrameOutcome::Processed(p) => &p.name,
            FrameOutcome::Skipped(s) => &s.name,
        }
    }

    pub fn is_processed(&self) -> bool {
        matches!(self, FrameOutcome::Processed(_))
    }
}

/// Aggregate counts of a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub processed: usize,
    pub skipped: usize,
}

impl RunSummary {
    pub fn from_outcomes(outcomes: &[FrameOutcome]) -> Self {
        let processed = outcomes.iter().filter(|o| o.is_processed()).count();
        Self {
            total: outcomes.len(),
            processed,
            skipped: outcomes.len() - processed,
        }
    }
}

/// Everything produced by a run, in stack order.
#[derive(Debug)]
pub struct PipelineRun {
    pub outcomes: Vec<FrameOutcome>,
    pub overlays: AnnotatedStack,
    pub summary: RunSummary,
}

/// Batch extractor bound to one configuration and eye template.
pub struct AnnotationPipeline {
    config: PipelineConfig,
    template: Template,
    log_parser: TailLogParser,
}

impl AnnotationPipeline {
    /// Load the eye template named by the config.
    pub fn new(config: PipelineConfig) -> Result<Self, SetupError> {
        config.validate()?;
        let template_path = config.template_path();
        let template = load_template(&template_path)?;
        log::info!(
            "eye template {} ({}x{})",
            template_path.display(),
            template.width(),
            template.height()
        );
        Self::with_template(config, template)
    }

    pub fn with_template(config: PipelineConfig, template: Template) -> Result<Self, SetupError> {
        config.validate()?;
        Ok(Self {
            config,
            template,
            log_parser: TailLogParser::new()?,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn load_stack(&self) -> Result<ImageStack, SetupError> {
        Ok(load_stack(
            &self.config.root_dir,
            &self.config.stack_options(),
        )?)
    }

    /// Load the stack from `root_dir` and process it.
    pub fn run(&self) -> Result<PipelineRun, SetupError> {
        let stack = self.load_stack()?;
        self.run_stack(&stack)
    }

    /// Process every frame of an already loaded stack.
    #[cfg_attr(feature = "tracing", instrument(level = "info", skip_all, fields(frames = stack.len())))]
    pub fn run_stack(&self, stack: &ImageStack) -> Result<PipelineRun, SetupError> {
        let Some((width, height)) = stack.dimensions() else {
            return Err(crate::stack::StackError::Empty {
                dir: self.config.root_dir.clone(),
                extension: self.config.image_extension.clone(),
            }
            .into());
        };
        self.template.check_fits(width, height)?;
        self.prepare_output_dirs()?;

        let total = stack.len();
        let done = AtomicUsize::new(0);
        let process = |(name, frame): (&str, &Frame)| {
            let outcome = self.process_frame(name, frame);
            let overlay = self.overlay_for(frame, &outcome);
            let n = done.fetch_add(1, Ordering::Relaxed) + 1;
            log::debug!("{n}/{total} frames done ({name})");
            (outcome, overlay)
        };

        #[cfg(feature = "rayon")]
        let results: Vec<(FrameOutcome, RgbImage)> = stack
            .names()
            .par_iter()
            .map(String::as_str)
            .zip(stack.frames().par_iter())
            .map(process)
            .collect();

        #[cfg(not(feature = "rayon"))]
        let results: Vec<(FrameOutcome, RgbImage)> = stack.iter().map(process).collect();

        let mut outcomes = Vec::with_capacity(total);
        let mut overlays = AnnotatedStack::default();
        for (outcome, overlay) in results {
            overlays.push(outcome.name(), overlay);
            outcomes.push(outcome);
        }

        if let Some(dir) = &self.config.overlay_dir {
            if let Err(e) = overlays.write_pngs(dir) {
                log::warn!("failed to write overlays to {}: {e}", dir.display());
            }
        }

        let summary = RunSummary::from_outcomes(&outcomes);
        log::info!(
            "{} of {} frames processed, {} skipped",
            summary.processed,
            summary.total,
            summary.skipped
        );

        Ok(PipelineRun {
            outcomes,
            overlays,
            summary,
        })
    }

    /// Locate landmarks, cut and write the four crops of one frame.
    pub fn process_frame(&self, name: &str, frame: &Frame) -> FrameOutcome {
        match self.try_process_frame(name, frame) {
            Ok(processed) => FrameOutcome::Processed(processed),
            Err(reason) => {
                log::warn!("skipping {name}: {reason}");
                FrameOutcome::Skipped(SkippedFrame {
                    name: name.to_string(),
                    reason,
                })
            }
        }
    }

    fn try_process_frame(&self, name: &str, frame: &Frame) -> Result<ProcessedFrame, FrameSkipReason> {
        let view = frame.view();
        let eye = best_match(&view, &self.template)?;
        let tail = self.log_parser.parse_file(self.config.log_path(name))?;

        let landmarks = FrameLandmarks {
            eye: eye.position,
            tail_base: tail.tail_base,
            tail_tip: tail.tail_tip,
        };
        let regions = self
            .config
            .layout
            .regions(landmarks.eye, landmarks.tail_base, landmarks.tail_tip);

        // cut everything first so a bad region leaves no partial set behind
        let mut crops = Vec::with_capacity(LandmarkLabel::ALL.len());
        for (label, region) in regions.iter() {
            let patch = crop(&view, &region, self.config.edge_policy)
                .map_err(|source| FrameSkipReason::RegionOutOfBounds { label, source })?;
            crops.push((label, patch));
        }

        let mut written = Vec::with_capacity(crops.len());
        for (label, patch) in &crops {
            let path = self.config.crop_path(*label, name);
            save_gray(patch, &path).map_err(|source| FrameSkipReason::CropWrite {
                path: path.clone(),
                source,
            })?;
            written.push(path);
        }

        log::debug!(
            "{name}: eye ({}, {}) tail base ({}, {}) tail tip ({}, {})",
            landmarks.eye.x,
            landmarks.eye.y,
            landmarks.tail_base.x,
            landmarks.tail_base.y,
            landmarks.tail_tip.x,
            landmarks.tail_tip.y
        );

        Ok(ProcessedFrame {
            name: name.to_string(),
            landmarks,
            eye_score: eye.score,
            regions,
            crops: written,
        })
    }

    /// Color copy of `frame`, with rectangles if the frame was processed.
    pub fn overlay_for(&self, frame: &Frame, outcome: &FrameOutcome) -> RgbImage {
        match outcome {
            FrameOutcome::Processed(p) => annotate(frame, &p.regions, &self.config.overlay),
            FrameOutcome::Skipped(_) => to_rgb(frame),
        }
    }

    fn prepare_output_dirs(&self) -> Result<(), SetupError> {
        for label in LandmarkLabel::ALL {
            let path = self.config.label_dir(label);
            fs::create_dir_all(&path).map_err(|source| SetupError::OutputDir { path, source })?;
        }
        Ok(())
    }
}

/// Encode a frame as 8-bit grayscale; the format follows the file extension.
pub fn save_gray(frame: &Frame, path: &Path) -> Result<(), image::ImageError> {
    let img = image::GrayImage::from_raw(
        frame.width as u32,
        frame.height as u32,
        frame.to_gray_u8(),
    )
    .ok_or_else(|| {
        image::ImageError::Parameter(image::error::ParameterError::from_kind(
            image::error::ParameterErrorKind::DimensionMismatch,
        ))
    })?;
    img.save(path)
}
