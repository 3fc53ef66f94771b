//! Tail landmark extraction from annotation logs.
//!
//! The annotation tool appends one record per click:
//!
//! ```text
//! Position "tailbase" was set to (312,240)!
//! Position "tailtip" was set to (455,261)!
//! ```
//!
//! The experimenter may correct a click, so only the last record of each field
//! counts. Parsing is split into [`PositionEventParser`] (text to ordered
//! events) and [`PositionLog`] (last-write-wins fold), so the policy can be
//! tested without any text.

mod events;

use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[cfg(feature = "tracing")]
use tracing::instrument;

pub use events::{
    normalize_log_text, PositionEvent, PositionEventParser, PositionLog, RecordedPosition,
};

/// Field name of the tail base click.
pub const TAIL_BASE_FIELD: &str = "tailbase";
/// Field name of the tail tip click.
pub const TAIL_TIP_FIELD: &str = "tailtip";

/// The log does not provide both tail landmarks.
#[derive(thiserror::Error, Debug)]
pub enum LandmarkNotFoundError {
    #[error("log file not found: {}", .path.display())]
    LogMissing { path: PathBuf },

    #[error("failed to read log file {}: {source}", .path.display())]
    LogUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no \"{field}\" position recorded in log")]
    MissingPosition { field: &'static str },

    #[error("last \"{field}\" position does not fit in pixel coordinates")]
    OutOfRange { field: &'static str },
}

/// Final tail base and tail tip of one frame, in source pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TailLandmarks {
    pub tail_base: Point2<i32>,
    pub tail_tip: Point2<i32>,
}

impl TailLandmarks {
    pub fn from_log(log: &PositionLog) -> Result<Self, LandmarkNotFoundError> {
        Ok(Self {
            tail_base: last_pixel(log, TAIL_BASE_FIELD)?,
            tail_tip: last_pixel(log, TAIL_TIP_FIELD)?,
        })
    }
}

fn last_pixel(log: &PositionLog, field: &'static str) -> Result<Point2<i32>, LandmarkNotFoundError> {
    match log.get(field) {
        Some(RecordedPosition::Pixel(p)) => Ok(p),
        Some(RecordedPosition::OutOfRange) => Err(LandmarkNotFoundError::OutOfRange { field }),
        None => Err(LandmarkNotFoundError::MissingPosition { field }),
    }
}

/// Reads annotation logs; compile once and reuse for every frame.
#[derive(Clone, Debug)]
pub struct TailLogParser {
    events: PositionEventParser,
}

impl TailLogParser {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            events: PositionEventParser::new()?,
        })
    }

    /// Fold the records of a raw log text.
    pub fn position_log(&self, raw: &str) -> PositionLog {
        let text = normalize_log_text(raw);
        PositionLog::from_events(self.events.parse(&text))
    }

    /// Tail landmarks from a raw log text.
    pub fn parse_str(&self, raw: &str) -> Result<TailLandmarks, LandmarkNotFoundError> {
        TailLandmarks::from_log(&self.position_log(raw))
    }

    /// Tail landmarks from a log file.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self, path), fields(path = %path.as_ref().display())))]
    pub fn parse_file(&self, path: impl AsRef<Path>) -> Result<TailLandmarks, LandmarkNotFoundError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                LandmarkNotFoundError::LogMissing {
                    path: path.to_path_buf(),
                }
            } else {
                LandmarkNotFoundError::LogUnreadable {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;

        let log = self.position_log(&raw);
        log::trace!(
            "{}: {} tailbase and {} tailtip records",
            path.display(),
            log.count(TAIL_BASE_FIELD),
            log.count(TAIL_TIP_FIELD)
        );
        TailLandmarks::from_log(&log)
    }
}
