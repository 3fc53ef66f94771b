//! Run configuration and its JSON representation.

use crate::error::{ConfigError, SetupError};
use crate::overlay::OverlayStyle;
use crate::stack::{LegacySensorCrop, StackOptions};
use fishmark_core::{EdgePolicy, LandmarkLabel, RegionLayout};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Everything a run needs; passed to the pipeline at construction.
///
/// Optional paths are resolved relative to `root_dir` when unset.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory holding the input images.
    pub root_dir: PathBuf,
    /// Directory holding one annotation log per image (default `<root>/logs`).
    pub logs_dir: Option<PathBuf>,
    /// Eye template image (default `<root>/eye_template/eye_template.png`).
    pub template_path: Option<PathBuf>,
    /// Parent of the per-label crop directories (default `<root>`).
    pub output_dir: Option<PathBuf>,
    /// Optional directory receiving annotated overlay PNGs.
    pub overlay_dir: Option<PathBuf>,
    /// Input images are the files with this extension (case-insensitive).
    pub image_extension: String,
    /// Part of an image filename replaced to form its log filename.
    pub image_suffix: String,
    /// Replacement for `image_suffix` in log filenames.
    pub log_suffix: String,
    pub layout: RegionLayout,
    pub edge_policy: EdgePolicy,
    pub overlay: OverlayStyle,
    /// Border crop applied to frames of a legacy sensor size.
    pub legacy_sensor: Option<LegacySensorCrop>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("."),
            logs_dir: None,
            template_path: None,
            output_dir: None,
            overlay_dir: None,
            image_extension: "png".to_string(),
            image_suffix: "image.png".to_string(),
            log_suffix: "log.txt".to_string(),
            layout: RegionLayout::default(),
            edge_policy: EdgePolicy::default(),
            overlay: OverlayStyle::default(),
            legacy_sensor: Some(LegacySensorCrop::default()),
        }
    }
}

impl PipelineConfig {
    /// Default configuration for a dataset rooted at `root`.
    pub fn for_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root.into(),
            ..Self::default()
        }
    }

    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.logs_dir
            .clone()
            .unwrap_or_else(|| self.root_dir.join("logs"))
    }

    pub fn template_path(&self) -> PathBuf {
        self.template_path.clone().unwrap_or_else(|| {
            self.root_dir
                .join("eye_template")
                .join("eye_template.png")
        })
    }

    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| self.root_dir.clone())
    }

    /// Destination directory of crops with `label`.
    pub fn label_dir(&self, label: LandmarkLabel) -> PathBuf {
        self.output_dir().join(label.dir_name())
    }

    /// Destination of the `label` crop of the image `file_name`.
    pub fn crop_path(&self, label: LandmarkLabel, file_name: &str) -> PathBuf {
        self.label_dir(label).join(file_name)
    }

    /// Companion log of the image `file_name`.
    pub fn log_path(&self, file_name: &str) -> PathBuf {
        let log_name = if self.image_suffix.is_empty() {
            file_name.to_string()
        } else {
            file_name.replace(&self.image_suffix, &self.log_suffix)
        };
        self.logs_dir().join(log_name)
    }

    /// Reject settings that would panic or destroy data during a run.
    pub fn validate(&self) -> Result<(), SetupError> {
        if !self.layout.is_valid() {
            return Err(SetupError::InvalidRadius {
                radius: self.layout.radius,
                max: RegionLayout::MAX_RADIUS,
            });
        }
        if let Some(overlay) = &self.overlay_dir {
            let conflict = if same_dir(overlay, &self.root_dir) {
                Some("the input images")
            } else if LandmarkLabel::ALL
                .iter()
                .any(|&label| same_dir(overlay, &self.label_dir(label)))
            {
                Some("a crop directory")
            } else {
                None
            };
            if let Some(what) = conflict {
                return Err(SetupError::OverlayDirConflict {
                    path: overlay.clone(),
                    what,
                });
            }
        }
        Ok(())
    }

    pub fn stack_options(&self) -> StackOptions {
        StackOptions {
            extension: self.image_extension.clone(),
            legacy_sensor: self.legacy_sensor,
        }
    }
}

/// Same directory, following symlinks and `..` when both paths exist.
fn same_dir(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a.components().eq(b.components()),
    }
}
