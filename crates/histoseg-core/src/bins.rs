//! Mapping between the 8-bit intensity scale and histogram bins.

use serde::{Deserialize, Serialize};

/// Number of distinct 8-bit intensity levels.
pub const INTENSITY_LEVELS: usize = 256;
/// Largest 8-bit intensity.
pub const MAX_INTENSITY: f64 = 255.0;

/// Maps intensities in `[0, 255]` to bin indices in `[0, bins)`.
///
/// Every histogram in the workspace goes through this mapping so that the
/// 1D and 2D paths agree on bin boundaries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinMapper {
    bins: usize,
}

impl BinMapper {
    /// Create a mapper. `bins` is clamped to `[1, 256]`.
    pub fn new(bins: usize) -> Self {
        Self {
            bins: bins.clamp(1, INTENSITY_LEVELS),
        }
    }

    #[inline]
    pub fn bins(&self) -> usize {
        self.bins
    }

    /// `floor(value * B / 256)` clamped to `[0, B-1]`.
    #[inline]
    pub fn bin(&self, value: f64) -> usize {
        if value.is_nan() || value <= 0.0 {
            return 0;
        }
        let idx = (value * self.bins as f64 / INTENSITY_LEVELS as f64).floor() as usize;
        idx.min(self.bins - 1)
    }

    #[inline]
    pub fn bin_u8(&self, value: u8) -> usize {
        value as usize * self.bins / INTENSITY_LEVELS
    }

    /// Threshold-index scale used by the 2D path: `index * 255 / (B-1)`.
    #[inline]
    pub fn index_to_intensity(&self, index: usize) -> f64 {
        if self.bins < 2 {
            return 0.0;
        }
        index as f64 * MAX_INTENSITY / (self.bins - 1) as f64
    }

    /// Intensity at the center of a bin.
    #[inline]
    pub fn bin_center(&self, index: usize) -> f64 {
        (index as f64 + 0.5) * self.bin_width()
    }

    /// Exclusive upper intensity edge of a bin; every value in the bin is below it.
    #[inline]
    pub fn bin_upper_edge(&self, index: usize) -> f64 {
        (index as f64 + 1.0) * self.bin_width()
    }

    #[inline]
    pub fn bin_width(&self) -> f64 {
        INTENSITY_LEVELS as f64 / self.bins as f64
    }
}
