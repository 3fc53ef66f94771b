use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Label attached to a landmark and to the crop extracted around it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LandmarkLabel {
    Head,
    TailTip,
    TailBase,
    Background,
}

impl LandmarkLabel {
    /// Output order used for crops and overlays.
    pub const ALL: [LandmarkLabel; 4] = [
        LandmarkLabel::Head,
        LandmarkLabel::TailTip,
        LandmarkLabel::TailBase,
        LandmarkLabel::Background,
    ];

    /// Name of the destination directory for crops carrying this label.
    pub fn dir_name(self) -> &'static str {
        match self {
            LandmarkLabel::Head => "head",
            LandmarkLabel::TailTip => "tailtip",
            LandmarkLabel::TailBase => "tailbase",
            LandmarkLabel::Background => "background",
        }
    }
}

impl fmt::Display for LandmarkLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Integer pixel coordinate `(x, y)` with a label.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Landmark {
    pub label: LandmarkLabel,
    pub position: Point2<i32>,
}

impl Landmark {
    pub fn new(label: LandmarkLabel, position: Point2<i32>) -> Self {
        Self { label, position }
    }
}

/// Landmarks located on one frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameLandmarks {
    /// Top-left corner of the best eye-template placement.
    pub eye: Point2<i32>,
    pub tail_base: Point2<i32>,
    pub tail_tip: Point2<i32>,
}

impl FrameLandmarks {
    pub fn landmarks(&self) -> [Landmark; 3] {
        [
            Landmark::new(LandmarkLabel::Head, self.eye),
            Landmark::new(LandmarkLabel::TailTip, self.tail_tip),
            Landmark::new(LandmarkLabel::TailBase, self.tail_base),
        ]
    }
}
