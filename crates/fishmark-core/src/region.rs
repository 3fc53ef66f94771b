//! Crop geometry and slicing.
//!
//! A [`Region`] is an axis-aligned rectangle in frame pixels with a signed
//! top-left corner, so rectangles derived from landmarks near the border can be
//! represented before any bounds policy is applied.

use crate::{Frame, FrameView, LandmarkLabel};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Axis-aligned crop rectangle; `x`/`y` is the top-left corner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(top_left: Point2<i32>, width: u32, height: u32) -> Self {
        Self {
            x: top_left.x,
            y: top_left.y,
            width,
            height,
        }
    }

    /// `side x side` box anchored at `top_left`.
    pub fn square(top_left: Point2<i32>, side: u32) -> Self {
        Self::new(top_left, side, side)
    }

    /// `2r x 2r` box whose top-left is `center - r`.
    ///
    /// Corner and size saturate instead of wrapping for huge radii.
    pub fn centered(center: Point2<i32>, radius: u32) -> Self {
        let r = i32::try_from(radius).unwrap_or(i32::MAX);
        Self::square(
            Point2::new(center.x.saturating_sub(r), center.y.saturating_sub(r)),
            radius.saturating_mul(2),
        )
    }

    pub fn top_left(&self) -> Point2<i32> {
        Point2::new(self.x, self.y)
    }

    /// Exclusive right edge.
    pub fn right(&self) -> i64 {
        self.x as i64 + self.width as i64
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> i64 {
        self.y as i64 + self.height as i64
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// True when the whole rectangle lies inside a `width x height` frame.
    pub fn fits_within(&self, width: usize, height: usize) -> bool {
        self.x >= 0
            && self.y >= 0
            && self.right() <= width as i64
            && self.bottom() <= height as i64
    }

    /// Intersection with a `width x height` frame, `None` if empty.
    pub fn clamp_to(&self, width: usize, height: usize) -> Option<Region> {
        let x0 = (self.x as i64).max(0);
        let y0 = (self.y as i64).max(0);
        let x1 = self.right().min(width as i64);
        let y1 = self.bottom().min(height as i64);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(Region {
            x: x0 as i32,
            y: y0 as i32,
            width: (x1 - x0) as u32,
            height: (y1 - y0) as u32,
        })
    }
}

/// What to do with a crop rectangle that leaves the frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgePolicy {
    /// Keep the part inside the frame and log a warning.
    #[default]
    Clamp,
    /// Reject the rectangle.
    Fail,
}

/// A crop rectangle could not be sliced out of the frame.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error(
    "region at ({}, {}) of size {}x{} is out of bounds for a {frame_width}x{frame_height} frame",
    .region.x, .region.y, .region.width, .region.height
)]
pub struct RegionOutOfBoundsError {
    pub region: Region,
    pub frame_width: usize,
    pub frame_height: usize,
}

/// Slice `frame[y0:y0+h, x0:x0+w]`.
pub fn extract_region(
    frame: &FrameView<'_>,
    top_left: Point2<i32>,
    size: (u32, u32),
    policy: EdgePolicy,
) -> Result<Frame, RegionOutOfBoundsError> {
    crop(frame, &Region::new(top_left, size.0, size.1), policy)
}

/// Slice a region out of `frame` under the given edge policy.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(frame), fields(width = frame.width, height = frame.height))
)]
pub fn crop(
    frame: &FrameView<'_>,
    region: &Region,
    policy: EdgePolicy,
) -> Result<Frame, RegionOutOfBoundsError> {
    let out_of_bounds = RegionOutOfBoundsError {
        region: *region,
        frame_width: frame.width,
        frame_height: frame.height,
    };

    if region.fits_within(frame.width, frame.height) && !region.is_empty() {
        return Ok(frame.copy_window(
            region.x as usize,
            region.y as usize,
            region.width as usize,
            region.height as usize,
        ));
    }

    match policy {
        EdgePolicy::Fail => Err(out_of_bounds),
        EdgePolicy::Clamp => {
            let clamped = region
                .clamp_to(frame.width, frame.height)
                .ok_or(out_of_bounds)?;
            log::warn!(
                "region ({}, {}) {}x{} truncated to ({}, {}) {}x{} at frame edge",
                region.x,
                region.y,
                region.width,
                region.height,
                clamped.x,
                clamped.y,
                clamped.width,
                clamped.height
            );
            Ok(frame.copy_window(
                clamped.x as usize,
                clamped.y as usize,
                clamped.width as usize,
                clamped.height as usize,
            ))
        }
    }
}

/// Fixed crop geometry shared by every frame of a run.
///
/// The head box uses the eye match as its top-left corner while the tail boxes
/// are centered on their landmarks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionLayout {
    /// Half side of every crop; crops are `2 * radius` square.
    pub radius: u32,
    /// Top-left corner of the landmark-independent background crop.
    pub background_offset: Point2<i32>,
}

impl Default for RegionLayout {
    fn default() -> Self {
        Self {
            radius: 40,
            background_offset: Point2::new(10, 10),
        }
    }
}

/// The four crop rectangles of one frame, in [`LandmarkLabel::ALL`] order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledRegions {
    pub head: Region,
    pub tail_tip: Region,
    pub tail_base: Region,
    pub background: Region,
}

impl LabeledRegions {
    pub fn get(&self, label: LandmarkLabel) -> Region {
        match label {
            LandmarkLabel::Head => self.head,
            LandmarkLabel::TailTip => self.tail_tip,
            LandmarkLabel::TailBase => self.tail_base,
            LandmarkLabel::Background => self.background,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (LandmarkLabel, Region)> + '_ {
        LandmarkLabel::ALL.into_iter().map(move |l| (l, self.get(l)))
    }
}

impl RegionLayout {
    /// Largest radius whose crops still have an `i32` side.
    pub const MAX_RADIUS: u32 = (i32::MAX / 2) as u32;

    /// True when `radius` lies in `1..=MAX_RADIUS`.
    pub fn is_valid(&self) -> bool {
        (1..=Self::MAX_RADIUS).contains(&self.radius)
    }

    pub fn side(&self) -> u32 {
        self.radius.saturating_mul(2)
    }

    pub fn head(&self, eye: Point2<i32>) -> Region {
        Region::square(eye, self.side())
    }

    pub fn tail(&self, landmark: Point2<i32>) -> Region {
        Region::centered(landmark, self.radius)
    }

    pub fn background(&self) -> Region {
        Region::square(self.background_offset, self.side())
    }

    pub fn regions(
        &self,
        eye: Point2<i32>,
        tail_base: Point2<i32>,
        tail_tip: Point2<i32>,
    ) -> LabeledRegions {
        LabeledRegions {
            head: self.head(eye),
            tail_tip: self.tail(tail_tip),
            tail_base: self.tail(tail_base),
            background: self.background(),
        }
    }
}
