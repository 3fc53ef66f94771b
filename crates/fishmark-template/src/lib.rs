//! Eye localization by template matching.
//!
//! The eye position of a frame is the placement of a fixed eye template that
//! maximizes the zero-mean normalized cross-correlation. Only "valid"
//! placements (template fully inside the frame) are scored, and the returned
//! coordinate is the template's top-left corner, not its center.
//!
//! ```
//! use fishmark_core::Frame;
//! use fishmark_template::{locate, Template};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut img = Frame::filled(16, 12, 0.0);
//! img.set(9, 4, 200.0);
//! img.set(10, 5, 120.0);
//! let template = Template::new(Frame::new(2, 2, vec![200.0, 0.0, 0.0, 120.0])?)?;
//! let eye = locate(&img.view(), &template)?;
//! assert_eq!((eye.x, eye.y), (9, 4));
//! # Ok(())
//! # }
//! ```
//!
//! An intensity-band contour detector (dark pixels strictly between 15 and 25,
//! bounding box of the two largest blobs) was tried for this job and dropped;
//! it is not provided here.

mod ncc;

pub use ncc::{
    best_match, correlation_surface, locate, InvalidTemplateError, Template, TemplateMatch,
};
