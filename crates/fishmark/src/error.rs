use crate::stack::StackError;
use fishmark_core::{LandmarkLabel, RegionOutOfBoundsError};
use fishmark_taillog::LandmarkNotFoundError;
use fishmark_template::InvalidTemplateError;
use std::path::PathBuf;

/// Unrecoverable problems detected before any frame is processed.
#[derive(thiserror::Error, Debug)]
pub enum SetupError {
    #[error("failed to read eye template {}: {source}", .path.display())]
    TemplateUnreadable {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("invalid eye template: {0}")]
    InvalidTemplate(#[from] InvalidTemplateError),

    #[error(transparent)]
    Stack(#[from] StackError),

    #[error("failed to create output directory {}: {source}", .path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to compile log pattern: {0}")]
    LogPattern(#[from] regex::Error),

    #[error("crop radius {radius} outside 1..={max}")]
    InvalidRadius { radius: u32, max: u32 },

    #[error("overlay directory {} would overwrite {what}", .path.display())]
    OverlayDirConflict { path: PathBuf, what: &'static str },
}

/// Why a frame produced no crops.
#[derive(thiserror::Error, Debug)]
pub enum FrameSkipReason {
    #[error(transparent)]
    LandmarkNotFound(#[from] LandmarkNotFoundError),

    #[error("{label} region: {source}")]
    RegionOutOfBounds {
        label: LandmarkLabel,
        #[source]
        source: RegionOutOfBoundsError,
    },

    #[error("eye template: {0}")]
    Template(#[from] InvalidTemplateError),

    #[error("failed to write crop {}: {source}", .path.display())]
    CropWrite {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

impl FrameSkipReason {
    /// Short machine-readable category for reports.
    pub fn kind(&self) -> &'static str {
        match self {
            FrameSkipReason::LandmarkNotFound(_) => "landmark_not_found",
            FrameSkipReason::RegionOutOfBounds { .. } => "region_out_of_bounds",
            FrameSkipReason::Template(_) => "invalid_template",
            FrameSkipReason::CropWrite { .. } => "crop_write",
        }
    }
}

/// Configuration file could not be read or written.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
