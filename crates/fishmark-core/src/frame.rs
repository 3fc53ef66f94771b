/// Errors raised when building a frame from a raw buffer.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("invalid frame buffer length (expected {expected} samples, got {got})")]
    InvalidBuffer { expected: usize, got: usize },

    #[error("invalid frame dimensions (width={width}, height={height})")]
    InvalidDimensions { width: usize, height: usize },
}

/// Borrowed grayscale frame, `f32` samples in row-major order.
#[derive(Clone, Copy, Debug)]
pub struct FrameView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [f32], // row-major, len = w*h
}

/// Owned grayscale frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    pub width: usize,
    pub height: usize,
    pub data: Vec<f32>,
}

fn checked_len(width: usize, height: usize) -> Result<usize, FrameError> {
    width
        .checked_mul(height)
        .ok_or(FrameError::InvalidDimensions { width, height })
}

impl Frame {
    /// Wrap a row-major sample buffer.
    pub fn new(width: usize, height: usize, data: Vec<f32>) -> Result<Self, FrameError> {
        let expected = checked_len(width, height)?;
        if data.len() != expected {
            return Err(FrameError::InvalidBuffer {
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Promote an 8-bit grayscale buffer to `f32` samples.
    pub fn from_gray_u8(width: usize, height: usize, pixels: &[u8]) -> Result<Self, FrameError> {
        Self::new(width, height, pixels.iter().map(|&v| v as f32).collect())
    }

    /// Frame with every sample set to `value`.
    pub fn filled(width: usize, height: usize, value: f32) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    pub fn view(&self) -> FrameView<'_> {
        FrameView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Option<f32> {
        self.view().get(x, y)
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: f32) {
        if x < self.width && y < self.height {
            self.data[y * self.width + x] = value;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Convert to 8-bit samples, rounding and saturating to `0..=255`.
    pub fn to_gray_u8(&self) -> Vec<u8> {
        self.data.iter().map(|&v| saturate_u8(v)).collect()
    }
}

impl<'a> FrameView<'a> {
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.data[y * self.width + x])
    }

    #[inline]
    pub fn row(&self, y: usize) -> &'a [f32] {
        let start = y * self.width;
        &self.data[start..start + self.width]
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Copy the `w x h` window starting at `(x0, y0)`.
    ///
    /// The window must lie inside the frame; callers validate bounds first.
    pub(crate) fn copy_window(&self, x0: usize, y0: usize, w: usize, h: usize) -> Frame {
        let mut data = Vec::with_capacity(w * h);
        for y in y0..y0 + h {
            data.extend_from_slice(&self.row(y)[x0..x0 + w]);
        }
        Frame {
            width: w,
            height: h,
            data,
        }
    }
}

#[inline]
pub fn saturate_u8(v: f32) -> u8 {
    if v.is_nan() {
        return 0;
    }
    v.round().clamp(0.0, 255.0) as u8
}
