use serde::{Deserialize, Serialize};

/// Value written to a mask for foreground pixels.
pub const FOREGROUND: u8 = 255;
/// Value written to a mask for background pixels.
pub const BACKGROUND: u8 = 0;

/// Errors raised while wrapping or comparing grids.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GridError {
    #[error("invalid grid buffer length (expected {expected} bytes, got {got})")]
    BufferLength { expected: usize, got: usize },

    #[error("invalid grid dimensions (width={width}, height={height})")]
    InvalidDimensions { width: usize, height: usize },

    #[error("grid dimensions differ ({left_width}x{left_height} vs {right_width}x{right_height})")]
    DimensionMismatch {
        left_width: usize,
        left_height: usize,
        right_width: usize,
        right_height: usize,
    },
}

#[derive(Clone, Copy, Debug)]
pub struct GrayImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8], // row-major, len = w*h
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrayImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

fn expected_len(width: usize, height: usize) -> Result<usize, GridError> {
    width
        .checked_mul(height)
        .ok_or(GridError::InvalidDimensions { width, height })
}

impl<'a> GrayImageView<'a> {
    /// Wrap a row-major buffer, checking that its length matches the shape.
    pub fn new(width: usize, height: usize, data: &'a [u8]) -> Result<Self, GridError> {
        let expected = expected_len(width, height)?;
        if data.len() != expected {
            return Err(GridError::BufferLength {
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

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }

    /// Number of pixels with a nonzero value.
    pub fn count_nonzero(&self) -> usize {
        self.data.iter().filter(|&&v| v != 0).count()
    }

    pub fn same_shape(&self, other: &GrayImageView<'_>) -> bool {
        self.width == other.width && self.height == other.height
    }

    /// Fail with [`GridError::DimensionMismatch`] unless both grids share a shape.
    pub fn ensure_same_shape(&self, other: &GrayImageView<'_>) -> Result<(), GridError> {
        if self.same_shape(other) {
            Ok(())
        } else {
            Err(GridError::DimensionMismatch {
                left_width: self.width,
                left_height: self.height,
                right_width: other.width,
                right_height: other.height,
            })
        }
    }

    pub fn to_owned_image(&self) -> GrayImage {
        GrayImage {
            width: self.width,
            height: self.height,
            data: self.data.to_vec(),
        }
    }
}

impl GrayImage {
    pub fn new(width: usize, height: usize, data: Vec<u8>) -> Result<Self, GridError> {
        let expected = expected_len(width, height)?;
        if data.len() != expected {
            return Err(GridError::BufferLength {
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

    /// All-zero grid of the given shape.
    pub fn zeros(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0; width * height],
        }
    }

    /// Build a grid by evaluating `f(x, y)` for every pixel.
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> u8) -> Self {
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    #[inline]
    pub fn view(&self) -> GrayImageView<'_> {
        GrayImageView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: u8) {
        self.data[y * self.width + x] = value;
    }

    pub fn count_nonzero(&self) -> usize {
        self.view().count_nonzero()
    }

    /// True when every value is either [`BACKGROUND`] or [`FOREGROUND`].
    pub fn is_binary(&self) -> bool {
        self.data
            .iter()
            .all(|&v| v == BACKGROUND || v == FOREGROUND)
    }
}
