//! Loading the input image stack and the eye template.

use crate::error::SetupError;
use fishmark_core::{crop, EdgePolicy, Frame, FrameError, Region, RegionOutOfBoundsError};
use fishmark_template::Template;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Errors raised while building the image stack.
#[derive(thiserror::Error, Debug)]
pub enum StackError {
    #[error("failed to list {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("no *.{extension} images found in {}", .dir.display())]
    Empty { dir: PathBuf, extension: String },

    #[error(
        "frame {name} is {got_width}x{got_height}, expected {expected_width}x{expected_height}"
    )]
    ShapeMismatch {
        name: String,
        expected_width: usize,
        expected_height: usize,
        got_width: usize,
        got_height: usize,
    },

    #[error("stack has {names} names but {frames} frames")]
    LengthMismatch { names: usize, frames: usize },

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error("legacy border crop failed: {0}")]
    Border(#[from] RegionOutOfBoundsError),
}

/// Border removed from frames captured by a sensor of one specific size.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacySensorCrop {
    pub width: usize,
    pub height: usize,
    pub border: usize,
}

impl Default for LegacySensorCrop {
    fn default() -> Self {
        Self {
            width: 648,
            height: 488,
            border: 4,
        }
    }
}

impl LegacySensorCrop {
    pub fn applies_to(&self, frame: &Frame) -> bool {
        frame.width == self.width && frame.height == self.height
    }

    pub fn apply(&self, frame: &Frame) -> Result<Frame, RegionOutOfBoundsError> {
        let b = self.border;
        let region = Region::new(
            Point2::new(b as i32, b as i32),
            frame.width.saturating_sub(2 * b) as u32,
            frame.height.saturating_sub(2 * b) as u32,
        );
        crop(&frame.view(), &region, EdgePolicy::Fail)
    }
}

#[derive(Clone, Debug)]
pub struct StackOptions {
    /// File extension of input images, without the dot.
    pub extension: String,
    pub legacy_sensor: Option<LegacySensorCrop>,
}

impl Default for StackOptions {
    fn default() -> Self {
        Self {
            extension: "png".to_string(),
            legacy_sensor: Some(LegacySensorCrop::default()),
        }
    }
}

/// Ordered frames with their source file names.
///
/// Names and frames are index-aligned and every frame has the same size.
#[derive(Clone, Debug)]
pub struct ImageStack {
    names: Vec<String>,
    frames: Vec<Frame>,
}

impl ImageStack {
    pub fn new(names: Vec<String>, frames: Vec<Frame>) -> Result<Self, StackError> {
        if names.len() != frames.len() {
            return Err(StackError::LengthMismatch {
                names: names.len(),
                frames: frames.len(),
            });
        }
        if let Some(first) = frames.first() {
            for (name, frame) in names.iter().zip(&frames) {
                if frame.width != first.width || frame.height != first.height {
                    return Err(StackError::ShapeMismatch {
                        name: name.clone(),
                        expected_width: first.width,
                        expected_height: first.height,
                        got_width: frame.width,
                        got_height: frame.height,
                    });
                }
            }
        }
        Ok(Self { names, frames })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// `(width, height)` shared by all frames.
    pub fn dimensions(&self) -> Option<(usize, usize)> {
        self.frames.first().map(|f| (f.width, f.height))
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Frame)> + '_ {
        self.names.iter().map(String::as_str).zip(&self.frames)
    }
}

/// Image files of `dir` with the given extension, sorted by file name.
///
/// Ordering is byte-wise on the name, so `img_10.png` sorts before `img_9.png`.
pub fn list_images(dir: &Path, extension: &str) -> Result<Vec<PathBuf>, StackError> {
    let io_err = |source: std::io::Error| StackError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        let matches = path
            .extension()
            .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(extension))
            .unwrap_or(false);
        if matches && path.is_file() {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Decode an image file as 8-bit grayscale promoted to `f32`.
pub fn load_frame(path: &Path) -> Result<Frame, StackError> {
    let img = image::open(path)
        .map_err(|source| StackError::Decode {
            path: path.to_path_buf(),
            source,
        })?
        .to_luma8();
    Ok(Frame::from_gray_u8(
        img.width() as usize,
        img.height() as usize,
        img.as_raw(),
    )?)
}

/// Load every image of `dir` into a stack.
#[cfg_attr(feature = "tracing", instrument(level = "info", skip(options), fields(dir = %dir.display())))]
pub fn load_stack(dir: &Path, options: &StackOptions) -> Result<ImageStack, StackError> {
    let files = list_images(dir, &options.extension)?;
    if files.is_empty() {
        return Err(StackError::Empty {
            dir: dir.to_path_buf(),
            extension: options.extension.clone(),
        });
    }
    log::info!("{} image files found in {}", files.len(), dir.display());

    let total = files.len();
    let mut names = Vec::with_capacity(total);
    let mut frames = Vec::with_capacity(total);
    let mut last_decile = 0;
    for (idx, path) in files.iter().enumerate() {
        let mut frame = load_frame(path)?;
        if let Some(legacy) = options.legacy_sensor.filter(|l| l.applies_to(&frame)) {
            frame = legacy.apply(&frame)?;
        }
        names.push(file_name(path));
        frames.push(frame);

        let decile = (idx + 1) * 10 / total;
        if decile > last_decile {
            last_decile = decile;
            log::info!("loading frames: {}/{} ({}%)", idx + 1, total, decile * 10);
        }
    }

    ImageStack::new(names, frames)
}

/// Load and validate the eye template.
pub fn load_template(path: &Path) -> Result<Template, SetupError> {
    let img = image::open(path)
        .map_err(|source| SetupError::TemplateUnreadable {
            path: path.to_path_buf(),
            source,
        })?
        .to_luma8();
    let frame = Frame::from_gray_u8(img.width() as usize, img.height() as usize, img.as_raw())
        .map_err(StackError::from)?;
    Ok(Template::new(frame)?)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_gray(path: &Path, width: u32, height: u32, value: impl Fn(u32, u32) -> u8) {
        let img = image::GrayImage::from_fn(width, height, |x, y| image::Luma([value(x, y)]));
        img.save(path).unwrap();
    }

    #[test]
    fn stack_order_is_lexicographic() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["img_010.png", "img_002.png", "img_001.png", "img_9.png"] {
            write_gray(&dir.path().join(name), 4, 3, |_, _| 0);
        }
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let stack = load_stack(dir.path(), &StackOptions::default()).unwrap();
        assert_eq!(
            stack.names(),
            &["img_001.png", "img_002.png", "img_010.png", "img_9.png"]
        );
        assert_eq!(stack.dimensions(), Some((4, 3)));
    }

    #[test]
    fn frames_hold_source_intensities() {
        let dir = tempfile::tempdir().unwrap();
        write_gray(&dir.path().join("a.png"), 5, 2, |x, y| (x * 10 + y) as u8);

        let stack = load_stack(dir.path(), &StackOptions::default()).unwrap();
        let frame = &stack.frames()[0];
        assert_eq!(frame.get(3, 1), Some(31.0));
    }

    #[test]
    fn legacy_sensor_frames_lose_their_border() {
        let dir = tempfile::tempdir().unwrap();
        write_gray(&dir.path().join("legacy.png"), 648, 488, |x, y| {
            ((x + y) % 251) as u8
        });

        let stack = load_stack(dir.path(), &StackOptions::default()).unwrap();
        assert_eq!(stack.dimensions(), Some((640, 480)));
        assert_eq!(stack.frames()[0].get(0, 0), Some(8.0));
    }

    #[test]
    fn other_sizes_are_untouched() {
        let dir = tempfile::tempdir().unwrap();
        write_gray(&dir.path().join("a.png"), 640, 480, |_, _| 1);
        let stack = load_stack(dir.path(), &StackOptions::default()).unwrap();
        assert_eq!(stack.dimensions(), Some((640, 480)));
    }

    #[test]
    fn empty_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_stack(dir.path(), &StackOptions::default()).unwrap_err();
        assert!(matches!(err, StackError::Empty { .. }));
    }

    #[test]
    fn mixed_sizes_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write_gray(&dir.path().join("a.png"), 10, 10, |_, _| 0);
        write_gray(&dir.path().join("b.png"), 12, 10, |_, _| 0);
        let err = load_stack(dir.path(), &StackOptions::default()).unwrap_err();
        match err {
            StackError::ShapeMismatch { name, got_width, .. } => {
                assert_eq!(name, "b.png");
                assert_eq!(got_width, 12);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn zero_byte_template_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("eye_template.png");
        fs::write(&path, b"").unwrap();
        let err = load_template(&path).unwrap_err();
        assert!(matches!(err, SetupError::TemplateUnreadable { .. }));
    }
}
