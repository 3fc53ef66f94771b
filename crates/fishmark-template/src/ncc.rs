//! Zero-mean normalized cross-correlation over "valid" placements.
//!
//! Window means and energies come from summed-area tables; the numerator is a
//! direct dot product with the zero-mean template, so the cost is
//! `O(W * H * w * h)` per frame.

use fishmark_core::{Frame, FrameView};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Windows (or templates) with less energy than this score zero.
const FLAT_ENERGY_EPS: f64 = 1e-6;

/// The template cannot be matched against the frame.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidTemplateError {
    #[error("template has zero area ({width}x{height})")]
    Empty { width: usize, height: usize },

    #[error(
        "template {template_width}x{template_height} is larger than frame {frame_width}x{frame_height}"
    )]
    LargerThanFrame {
        template_width: usize,
        template_height: usize,
        frame_width: usize,
        frame_height: usize,
    },

    #[error("template contains non-finite samples")]
    NonFinite,
}

/// Reference pattern with precomputed zero-mean samples.
#[derive(Clone, Debug)]
pub struct Template {
    frame: Frame,
    centered: Vec<f64>,
    energy: f64,
}

impl Template {
    /// Validate a pattern and prepare it for matching.
    pub fn new(frame: Frame) -> Result<Self, InvalidTemplateError> {
        if frame.is_empty() {
            return Err(InvalidTemplateError::Empty {
                width: frame.width,
                height: frame.height,
            });
        }
        if frame.data.iter().any(|v| !v.is_finite()) {
            return Err(InvalidTemplateError::NonFinite);
        }

        let n = frame.data.len() as f64;
        let mean = frame.data.iter().map(|&v| v as f64).sum::<f64>() / n;
        let centered: Vec<f64> = frame.data.iter().map(|&v| v as f64 - mean).collect();
        let energy = centered.iter().map(|v| v * v).sum();

        Ok(Self {
            frame,
            centered,
            energy,
        })
    }

    pub fn width(&self) -> usize {
        self.frame.width
    }

    pub fn height(&self) -> usize {
        self.frame.height
    }

    /// Check that the template fits inside a `width x height` frame.
    pub fn check_fits(&self, width: usize, height: usize) -> Result<(), InvalidTemplateError> {
        if self.width() > width || self.height() > height {
            return Err(InvalidTemplateError::LargerThanFrame {
                template_width: self.width(),
                template_height: self.height(),
                frame_width: width,
                frame_height: height,
            });
        }
        Ok(())
    }
}

/// Best placement of the template's top-left corner.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TemplateMatch {
    /// `(x = column, y = row)` of the template's top-left corner.
    pub position: Point2<i32>,
    /// Correlation score in `[-1, 1]`.
    pub score: f32,
}

/// Summed-area tables of samples and squared samples, `(w + 1) x (h + 1)`.
struct IntegralImages {
    stride: usize,
    sum: Vec<f64>,
    sum_sq: Vec<f64>,
}

impl IntegralImages {
    fn new(img: &FrameView<'_>) -> Self {
        let stride = img.width + 1;
        let mut sum = vec![0.0; stride * (img.height + 1)];
        let mut sum_sq = vec![0.0; stride * (img.height + 1)];
        for y in 0..img.height {
            let mut row_sum = 0.0;
            let mut row_sq = 0.0;
            for (x, &v) in img.row(y).iter().enumerate() {
                let v = v as f64;
                row_sum += v;
                row_sq += v * v;
                let idx = (y + 1) * stride + x + 1;
                sum[idx] = sum[idx - stride] + row_sum;
                sum_sq[idx] = sum_sq[idx - stride] + row_sq;
            }
        }
        Self {
            stride,
            sum,
            sum_sq,
        }
    }

    #[inline]
    fn window(&self, table: &[f64], x: usize, y: usize, w: usize, h: usize) -> f64 {
        let s = self.stride;
        table[(y + h) * s + x + w] - table[y * s + x + w] - table[(y + h) * s + x]
            + table[y * s + x]
    }
}

/// Correlation score for every valid placement, `(W - w + 1) x (H - h + 1)`.
#[cfg_attr(
    feature = "tracing",
    instrument(
        level = "debug",
        skip(img, template),
        fields(width = img.width, height = img.height, tw = template.width(), th = template.height())
    )
)]
pub fn correlation_surface(
    img: &FrameView<'_>,
    template: &Template,
) -> Result<Frame, InvalidTemplateError> {
    template.check_fits(img.width, img.height)?;

    let (tw, th) = (template.width(), template.height());
    let out_w = img.width - tw + 1;
    let out_h = img.height - th + 1;
    let n = (tw * th) as f64;
    let tables = IntegralImages::new(img);

    let mut scores = Vec::with_capacity(out_w * out_h);
    for y in 0..out_h {
        for x in 0..out_w {
            let sum = tables.window(&tables.sum, x, y, tw, th);
            let sum_sq = tables.window(&tables.sum_sq, x, y, tw, th);
            let window_energy = (sum_sq - sum * sum / n).max(0.0);
            if window_energy <= FLAT_ENERGY_EPS || template.energy <= FLAT_ENERGY_EPS {
                scores.push(0.0);
                continue;
            }

            let mut num = 0.0f64;
            for j in 0..th {
                let row = &img.row(y + j)[x..x + tw];
                let t_row = &template.centered[j * tw..(j + 1) * tw];
                num += row
                    .iter()
                    .zip(t_row)
                    .map(|(&v, &t)| v as f64 * t)
                    .sum::<f64>();
            }
            let score = num / (window_energy * template.energy).sqrt();
            scores.push(score.clamp(-1.0, 1.0) as f32);
        }
    }

    Ok(Frame {
        width: out_w,
        height: out_h,
        data: scores,
    })
}

/// Global maximum of the correlation surface.
///
/// Ties resolve to the first placement in row-major order, so a uniform frame
/// yields `(0, 0)`.
pub fn best_match(
    img: &FrameView<'_>,
    template: &Template,
) -> Result<TemplateMatch, InvalidTemplateError> {
    let surface = correlation_surface(img, template)?;

    let mut best_idx = 0usize;
    let mut best_score = f32::NEG_INFINITY;
    for (idx, &score) in surface.data.iter().enumerate() {
        if score > best_score {
            best_score = score;
            best_idx = idx;
        }
    }

    let x = best_idx % surface.width;
    let y = best_idx / surface.width;
    log::debug!("eye template best match at ({x}, {y}) score {best_score:.4}");

    Ok(TemplateMatch {
        position: Point2::new(x as i32, y as i32),
        score: best_score,
    })
}

/// Pixel location `(x, y)` of the template's best placement.
pub fn locate(
    img: &FrameView<'_>,
    template: &Template,
) -> Result<Point2<i32>, InvalidTemplateError> {
    best_match(img, template).map(|m| m.position)
}
