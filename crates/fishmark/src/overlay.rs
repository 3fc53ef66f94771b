//! Diagnostic overlays: crop rectangles drawn on a color copy of each frame.

use fishmark_core::{saturate_u8, Frame, LabeledRegions, LandmarkLabel, Region};
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Rectangle colors per label and line thickness.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayStyle {
    pub head: [u8; 3],
    pub tail_tip: [u8; 3],
    pub tail_base: [u8; 3],
    pub background: [u8; 3],
    pub thickness: u32,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            head: [31, 119, 180],
            tail_tip: [255, 127, 14],
            tail_base: [44, 160, 44],
            background: [214, 39, 40],
            thickness: 4,
        }
    }
}

impl OverlayStyle {
    pub fn color(&self, label: LandmarkLabel) -> Rgb<u8> {
        Rgb(match label {
            LandmarkLabel::Head => self.head,
            LandmarkLabel::TailTip => self.tail_tip,
            LandmarkLabel::TailBase => self.tail_base,
            LandmarkLabel::Background => self.background,
        })
    }
}

/// Replicate a grayscale frame into three channels.
pub fn to_rgb(frame: &Frame) -> RgbImage {
    let w = frame.width as u32;
    RgbImage::from_fn(w, frame.height as u32, |x, y| {
        let v = saturate_u8(frame.data[y as usize * frame.width + x as usize]);
        Rgb([v, v, v])
    })
}

/// Draw the outline of `region` with corners `(x, y)` and `(x + w, y + h)`.
///
/// The outline is `thickness` nested rectangles: `thickness / 2` of them grow
/// outward, the rest shrink inward. Pixels outside the image are dropped.
pub fn draw_region(img: &mut RgbImage, region: &Region, color: Rgb<u8>, thickness: u32) {
    if thickness == 0 {
        return;
    }
    let outward = (thickness / 2) as i64;
    let inward = ((thickness - 1) / 2) as i64;
    for grow in -inward..=outward {
        let w = region.width as i64 + 2 * grow + 1;
        let h = region.height as i64 + 2 * grow + 1;
        if w <= 0 || h <= 0 {
            continue;
        }
        let (x, y) = (region.x as i64 - grow, region.y as i64 - grow);
        let (Ok(x), Ok(y), Ok(w), Ok(h)) = (
            i32::try_from(x),
            i32::try_from(y),
            u32::try_from(w),
            u32::try_from(h),
        ) else {
            continue;
        };
        draw_hollow_rect_mut(img, Rect::at(x, y).of_size(w, h), color);
    }
}

/// Color copy of `frame` with the four crop rectangles drawn on it.
pub fn annotate(frame: &Frame, regions: &LabeledRegions, style: &OverlayStyle) -> RgbImage {
    let mut img = to_rgb(frame);
    for (label, region) in regions.iter() {
        draw_region(&mut img, &region, style.color(label), style.thickness);
    }
    img
}

/// Overlay frames of a run, index-aligned with the input stack.
#[derive(Clone, Debug, Default)]
pub struct AnnotatedStack {
    pub names: Vec<String>,
    pub frames: Vec<RgbImage>,
}

impl AnnotatedStack {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn push(&mut self, name: impl Into<String>, frame: RgbImage) {
        self.names.push(name.into());
        self.frames.push(frame);
    }

    /// Flattened `[frames, width, height, 3]` array for a stack viewer.
    ///
    /// Frames are transposed so the second axis runs along x.
    pub fn viewer_array(&self) -> ([usize; 4], Vec<u8>) {
        let Some(first) = self.frames.first() else {
            return ([0, 0, 0, 3], Vec::new());
        };
        let (w, h) = (first.width() as usize, first.height() as usize);
        let mut data = Vec::with_capacity(self.frames.len() * w * h * 3);
        for frame in &self.frames {
            for x in 0..w as u32 {
                for y in 0..h as u32 {
                    data.extend_from_slice(&frame.get_pixel(x, y).0);
                }
            }
        }
        ([self.frames.len(), w, h, 3], data)
    }

    /// Write every overlay as `<dir>/<source name>`.
    pub fn write_pngs(&self, dir: &Path) -> Result<(), image::ImageError> {
        fs::create_dir_all(dir)?;
        for (name, frame) in self.names.iter().zip(&self.frames) {
            frame.save(dir.join(name))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point2;

    #[test]
    fn outline_straddles_the_region_edges() {
        let mut img = RgbImage::new(40, 40);
        let red = Rgb([255, 0, 0]);
        draw_region(&mut img, &Region::square(Point2::new(10, 10), 20), red, 4);

        // corners (10,10) and (30,30); two lines outward, one on the edge, one inward
        for (x, y) in [(8, 8), (11, 20), (20, 32), (29, 20), (32, 32), (10, 10)] {
            assert_eq!(*img.get_pixel(x, y), red, "({x}, {y})");
        }
        for (x, y) in [(7, 20), (12, 20), (20, 20), (28, 20), (33, 20), (20, 33)] {
            assert_eq!(*img.get_pixel(x, y), Rgb([0, 0, 0]), "({x}, {y})");
        }
    }

    #[test]
    fn single_pixel_outline_hits_both_corners() {
        let mut img = RgbImage::new(20, 20);
        let c = Rgb([9, 9, 9]);
        draw_region(&mut img, &Region::square(Point2::new(2, 3), 5), c, 1);
        assert_eq!(*img.get_pixel(2, 3), c);
        assert_eq!(*img.get_pixel(7, 8), c);
        assert_eq!(*img.get_pixel(4, 5), Rgb([0, 0, 0]));
        assert_eq!(*img.get_pixel(8, 8), Rgb([0, 0, 0]));
    }

    #[test]
    fn outline_is_clipped_at_image_border() {
        let mut img = RgbImage::new(20, 20);
        let c = Rgb([1, 2, 3]);
        draw_region(&mut img, &Region::square(Point2::new(-5, -5), 10), c, 1);
        assert_eq!(*img.get_pixel(5, 0), c);
        assert_eq!(*img.get_pixel(0, 5), c);
        assert_eq!(*img.get_pixel(6, 6), Rgb([0, 0, 0]));
    }

    #[test]
    fn annotate_uses_label_colors() {
        let frame = Frame::filled(200, 200, 128.0);
        let style = OverlayStyle::default();
        let regions = LabeledRegions {
            head: Region::square(Point2::new(100, 20), 30),
            tail_tip: Region::square(Point2::new(20, 140), 30),
            tail_base: Region::square(Point2::new(100, 140), 30),
            background: Region::square(Point2::new(10, 10), 30),
        };
        let img = annotate(&frame, &regions, &style);
        assert_eq!(*img.get_pixel(100, 30), Rgb(style.head));
        assert_eq!(*img.get_pixel(20, 150), Rgb(style.tail_tip));
        assert_eq!(*img.get_pixel(100, 150), Rgb(style.tail_base));
        assert_eq!(*img.get_pixel(10, 20), Rgb(style.background));
        assert_eq!(*img.get_pixel(60, 60), Rgb([128, 128, 128]));
    }

    #[test]
    fn viewer_array_is_frame_x_y_channel() {
        let mut stack = AnnotatedStack::default();
        let mut img = RgbImage::new(3, 2);
        img.put_pixel(2, 1, Rgb([9, 8, 7]));
        stack.push("a.png", img);

        let (shape, data) = stack.viewer_array();
        assert_eq!(shape, [1, 3, 2, 3]);
        // index of (x=2, y=1)
        let idx = (2 * 2 + 1) * 3;
        assert_eq!(&data[idx..idx + 3], &[9, 8, 7]);
    }
}
