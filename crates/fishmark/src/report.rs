//! JSON report of a pipeline run.

use crate::config::PipelineConfig;
use crate::pipeline::{FrameOutcome, PipelineRun, RunSummary};
use fishmark_core::{LabeledRegions, Landmark};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameStatus {
    Processed,
    Skipped,
}

/// One line of the report per input frame.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FrameRecord {
    pub name: String,
    pub status: FrameStatus,
    /// Head (eye template corner), tail tip and tail base.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub landmarks: Vec<Landmark>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eye_score: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regions: Option<LabeledRegions>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub crops: Vec<PathBuf>,
    /// Skip category, see `FrameSkipReason::kind`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl From<&FrameOutcome> for FrameRecord {
    fn from(outcome: &FrameOutcome) -> Self {
        match outcome {
            FrameOutcome::Processed(p) => Self {
                name: p.name.clone(),
                status: FrameStatus::Processed,
                landmarks: p.landmarks.landmarks().to_vec(),
                eye_score: Some(p.eye_score),
                regions: Some(p.regions),
                crops: p.crops.clone(),
                reason_kind: None,
                reason: None,
            },
            FrameOutcome::Skipped(s) => Self {
                name: s.name.clone(),
                status: FrameStatus::Skipped,
                landmarks: Vec::new(),
                eye_score: None,
                regions: None,
                crops: Vec::new(),
                reason_kind: Some(s.reason.kind().to_string()),
                reason: Some(s.reason.to_string()),
            },
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunReport {
    pub config: PipelineConfig,
    pub summary: RunSummary,
    pub frames: Vec<FrameRecord>,
}

impl RunReport {
    pub fn from_run(config: &PipelineConfig, run: &PipelineRun) -> Self {
        Self {
            config: config.clone(),
            summary: run.summary,
            frames: run.outcomes.iter().map(FrameRecord::from).collect(),
        }
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), crate::error::ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
