//! Core types for fish landmark crop extraction.
//!
//! This crate holds the grayscale [`Frame`] type, landmark labels and the crop
//! geometry shared by the matcher, the log parser and the pipeline. It does
//! not decode or encode image files.

mod frame;
mod landmark;
pub mod region;

pub use frame::{saturate_u8, Frame, FrameError, FrameView};
pub use landmark::{FrameLandmarks, Landmark, LandmarkLabel};
pub use region::{
    crop, extract_region, EdgePolicy, LabeledRegions, Region, RegionLayout,
    RegionOutOfBoundsError,
};
