//! Joint (intensity, neighborhood feature) histogram.
//!
//! Every pixel contributes one unit of weight to the cell
//! `(bin(intensity), bin(feature))`, where the feature blends the raw
//! intensity with the caller-supplied neighborhood aggregate:
//!
//! ```text
//! feature = α · intensity + (1 − α) · neighborhood
//! ```
//!
//! Optional transforms run in a fixed order: Gaussian smoothing, `log1p`,
//! normalization.

use histoseg_core::{BinMapper, GrayImageView};
use log::debug;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::params::{validate_sigma, validate_weight_factor};
use crate::{Otsu2dError, Otsu2dParams};

/// `B × B` grid of non-negative weights, indexed `[intensity_bin][feature_bin]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Histogram2D {
    bins: usize,
    data: Vec<f64>,
    pub flags: HistogramFlags,
}

/// Which transforms were applied after accumulation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistogramFlags {
    pub smoothed: bool,
    pub log_scaled: bool,
    pub normalized: bool,
}

/// Summary of a 2D histogram, for reporting.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistogramStats2D {
    pub bins: usize,
    pub total: f64,
    /// Zero means nothing was accumulated; thresholds derived from such a
    /// histogram are fallbacks.
    pub non_zero_bins: usize,
    pub peak: [usize; 2],
    pub peak_value: f64,
    /// Weighted mean `[i, j]` bin, `None` for an empty histogram.
    pub mean_bin: Option<[f64; 2]>,
}

impl Histogram2D {
    /// All-zero histogram with `bins × bins` cells.
    pub fn zeros(bins: usize) -> Self {
        Self {
            bins,
            data: vec![0.0; bins * bins],
            flags: HistogramFlags::default(),
        }
    }

    /// Wrap raw row-major cell weights. Returns `None` when the length is not `bins²`.
    pub fn from_cells(bins: usize, data: Vec<f64>) -> Option<Self> {
        (data.len() == bins * bins).then_some(Self {
            bins,
            data,
            flags: HistogramFlags::default(),
        })
    }

    #[inline]
    pub fn bins(&self) -> usize {
        self.bins
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.bins + j]
    }

    #[inline]
    pub fn add(&mut self, i: usize, j: usize, weight: f64) {
        self.data[i * self.bins + j] += weight;
    }

    #[inline]
    pub fn cells(&self) -> &[f64] {
        &self.data
    }

    pub fn total(&self) -> f64 {
        self.data.iter().sum()
    }

    pub fn non_zero_bins(&self) -> usize {
        self.data.iter().filter(|&&w| w > 0.0).count()
    }

    pub fn stats(&self) -> HistogramStats2D {
        let mut peak = [0usize; 2];
        let mut peak_value = 0.0f64;
        let mut moments = [0.0f64; 2];
        for (idx, &w) in self.data.iter().enumerate() {
            let (i, j) = (idx / self.bins, idx % self.bins);
            if w > peak_value {
                peak_value = w;
                peak = [i, j];
            }
            moments[0] += w * i as f64;
            moments[1] += w * j as f64;
        }
        let total = self.total();
        HistogramStats2D {
            bins: self.bins,
            total,
            non_zero_bins: self.non_zero_bins(),
            peak,
            peak_value,
            mean_bin: (total > 0.0).then(|| [moments[0] / total, moments[1] / total]),
        }
    }

    /// Convolve with a normalized Gaussian, zero padding at the edges.
    ///
    /// Kernel size is `2·round(3σ) + 1`. The 2D kernel is separable, so two
    /// normalized 1D passes give the same result as the full 2D convolution.
    pub fn smooth_gaussian(&mut self, sigma: f64) {
        if sigma.is_nan() || sigma <= 0.0 || self.bins == 0 {
            return;
        }
        let kernel = gaussian_kernel(sigma);
        let radius = (kernel.len() / 2) as isize;
        let n = self.bins as isize;

        let mut rows_pass = vec![0.0f64; self.data.len()];
        for i in 0..n {
            for j in 0..n {
                let mut acc = 0.0;
                for (k, &w) in kernel.iter().enumerate() {
                    let jj = j + k as isize - radius;
                    if (0..n).contains(&jj) {
                        acc += w * self.data[(i * n + jj) as usize];
                    }
                }
                rows_pass[(i * n + j) as usize] = acc;
            }
        }

        for i in 0..n {
            for j in 0..n {
                let mut acc = 0.0;
                for (k, &w) in kernel.iter().enumerate() {
                    let ii = i + k as isize - radius;
                    if (0..n).contains(&ii) {
                        acc += w * rows_pass[(ii * n + j) as usize];
                    }
                }
                self.data[(i * n + j) as usize] = acc;
            }
        }
        self.flags.smoothed = true;
    }

    /// Replace every strictly positive cell `w` by `ln(1 + w)`.
    pub fn apply_log1p(&mut self) {
        for w in self.data.iter_mut().filter(|w| **w > 0.0) {
            *w = w.ln_1p();
        }
        self.flags.log_scaled = true;
    }

    /// Scale so that the cells sum to one. No-op on an empty histogram or
    /// one whose total is not finite.
    pub fn normalize(&mut self) {
        let total = self.total();
        if !(total.is_finite() && total > 0.0) {
            return;
        }
        for w in &mut self.data {
            *w /= total;
        }
        self.flags.normalized = true;
    }
}

/// Normalized 1D Gaussian of length `2·round(3σ) + 1`.
///
/// A zero radius yields the identity kernel `[1.0]`; for tiny σ the
/// exponent would otherwise be `0/0`.
pub fn gaussian_kernel(sigma: f64) -> Vec<f64> {
    let radius = (3.0 * sigma).round().max(0.0) as usize;
    if radius == 0 {
        return vec![1.0];
    }
    let denom = 2.0 * sigma * sigma;
    let mut kernel: Vec<f64> = (0..=2 * radius)
        .map(|k| {
            let d = k as f64 - radius as f64;
            (-d * d / denom).exp()
        })
        .collect();
    let sum: f64 = kernel.iter().sum();
    for k in &mut kernel {
        *k /= sum;
    }
    kernel
}

/// `α · intensity + (1 − α) · neighborhood`.
#[inline]
pub fn blend_feature(alpha: f64, intensity: u8, neighborhood: u8) -> f64 {
    alpha * intensity as f64 + (1.0 - alpha) * neighborhood as f64
}

/// Accumulates a [`Histogram2D`] from an intensity grid and a feature grid.
#[derive(Clone, Debug)]
pub struct Histogram2DBuilder {
    bins: usize,
    pixel_weight_factor: f64,
    smoothing_sigma: f64,
    log_scale: bool,
    normalize: bool,
}

impl Histogram2DBuilder {
    /// Plain counting histogram: `α = 1`, no transforms.
    pub fn new(bins: usize) -> Self {
        Self {
            bins,
            pixel_weight_factor: 1.0,
            smoothing_sigma: 0.0,
            log_scale: false,
            normalize: false,
        }
    }

    pub fn from_params(params: &Otsu2dParams) -> Self {
        Self {
            bins: params.histogram_bins,
            pixel_weight_factor: params.pixel_weight_factor,
            smoothing_sigma: params.smoothing_sigma,
            log_scale: params.use_log_histogram,
            normalize: params.normalize_histogram,
        }
    }

    pub fn pixel_weight_factor(mut self, alpha: f64) -> Self {
        self.pixel_weight_factor = alpha;
        self
    }

    pub fn smoothing_sigma(mut self, sigma: f64) -> Self {
        self.smoothing_sigma = sigma;
        self
    }

    pub fn log_scale(mut self, enabled: bool) -> Self {
        self.log_scale = enabled;
        self
    }

    pub fn normalize(mut self, enabled: bool) -> Self {
        self.normalize = enabled;
        self
    }

    /// Build the histogram. Fails on invalid settings or mismatched grids.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip_all, fields(width = intensity.width, height = intensity.height, bins = self.bins))
    )]
    pub fn build(
        &self,
        intensity: &GrayImageView<'_>,
        feature: &GrayImageView<'_>,
    ) -> Result<Histogram2D, Otsu2dError> {
        if !(2..=256).contains(&self.bins) {
            return Err(Otsu2dError::InvalidBins {
                bins: self.bins,
                min: 2,
            });
        }
        validate_weight_factor(self.pixel_weight_factor)?;
        validate_sigma(self.smoothing_sigma)?;
        intensity.ensure_same_shape(feature)?;

        let mapper = BinMapper::new(self.bins);
        let mut hist = Histogram2D::zeros(self.bins);
        for (&v, &n) in intensity.data.iter().zip(feature.data.iter()) {
            let f = blend_feature(self.pixel_weight_factor, v, n);
            hist.add(mapper.bin_u8(v), mapper.bin(f), 1.0);
        }

        if self.smoothing_sigma > 0.0 {
            hist.smooth_gaussian(self.smoothing_sigma);
        }
        if self.log_scale {
            hist.apply_log1p();
        }
        if self.normalize {
            hist.normalize();
        }

        debug!(
            "2D histogram: bins={} pixels={} nonzero={} flags={:?}",
            self.bins,
            intensity.len(),
            hist.non_zero_bins(),
            hist.flags
        );
        Ok(hist)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use histoseg_core::{GrayImage, GridError};

    fn ramp(width: usize, height: usize) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| ((x * 37 + y * 11) % 256) as u8)
    }

    #[test]
    fn counts_sum_to_pixel_count() {
        let img = ramp(13, 7);
        let hist = Histogram2DBuilder::new(16)
            .build(&img.view(), &img.view())
            .expect("histogram");
        assert_relative_eq!(hist.total(), (13 * 7) as f64);
        assert_eq!(hist.flags, HistogramFlags::default());
    }

    #[test]
    fn identical_grids_fill_the_diagonal() {
        let img = ramp(9, 9);
        let hist = Histogram2DBuilder::new(32)
            .pixel_weight_factor(0.5)
            .build(&img.view(), &img.view())
            .expect("histogram");
        for i in 0..32 {
            for j in 0..32 {
                if i != j {
                    assert_eq!(hist.get(i, j), 0.0);
                }
            }
        }
    }

    #[test]
    fn normalized_histogram_sums_to_one() {
        let img = ramp(20, 11);
        let blur = GrayImage::from_fn(20, 11, |x, _| (x * 12) as u8);
        let hist = Histogram2DBuilder::new(64)
            .smoothing_sigma(1.5)
            .log_scale(true)
            .normalize(true)
            .build(&img.view(), &blur.view())
            .expect("histogram");
        assert!((hist.total() - 1.0).abs() < 1e-9);
        assert!(hist.flags.smoothed && hist.flags.log_scaled && hist.flags.normalized);
    }

    #[test]
    fn smoothing_keeps_interior_mass() {
        let mut hist = Histogram2D::zeros(21);
        hist.add(10, 10, 100.0);
        hist.smooth_gaussian(1.0);
        assert_relative_eq!(hist.total(), 100.0, epsilon = 1e-9);
        assert!(hist.get(10, 10) < 100.0);
        assert_relative_eq!(hist.get(9, 10), hist.get(11, 10), epsilon = 1e-12);
        assert_relative_eq!(hist.get(10, 9), hist.get(9, 10), epsilon = 1e-12);
    }

    #[test]
    fn smoothing_loses_mass_at_edges() {
        let mut hist = Histogram2D::zeros(8);
        hist.add(0, 0, 10.0);
        hist.smooth_gaussian(1.0);
        assert!(hist.total() < 10.0);
    }

    #[test]
    fn kernel_is_odd_and_normalized() {
        for sigma in [0.3, 1.0, 1.7, 4.0] {
            let k = gaussian_kernel(sigma);
            assert_eq!(k.len() % 2, 1);
            assert_eq!(k.len(), 2 * (3.0f64 * sigma).round() as usize + 1);
            assert_relative_eq!(k.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn tiny_sigma_smoothing_is_identity() {
        assert_eq!(gaussian_kernel(1e-200), vec![1.0]);
        assert_eq!(gaussian_kernel(0.1), vec![1.0]);

        let mut hist = Histogram2D::zeros(4);
        hist.add(1, 2, 3.0);
        hist.add(3, 0, 1.0);
        let before = hist.cells().to_vec();
        hist.smooth_gaussian(1e-200);
        assert_eq!(hist.cells(), &before[..]);
        assert!(hist.flags.smoothed);
    }

    #[test]
    fn normalize_skips_non_finite_total() {
        let mut hist = Histogram2D::from_cells(2, vec![f64::NAN, 1.0, 0.0, 0.0]).expect("cells");
        hist.normalize();
        assert!(!hist.flags.normalized);
        assert_eq!(hist.get(0, 1), 1.0);
    }

    #[test]
    fn log1p_only_touches_positive_cells() {
        let mut hist = Histogram2D::from_cells(2, vec![0.0, 1.0, 3.0, 0.0]).expect("cells");
        hist.apply_log1p();
        assert_eq!(hist.get(0, 0), 0.0);
        assert_relative_eq!(hist.get(0, 1), 2f64.ln());
        assert_relative_eq!(hist.get(1, 0), 4f64.ln());
    }

    #[test]
    fn normalize_is_noop_on_empty() {
        let mut hist = Histogram2D::zeros(4);
        hist.normalize();
        assert!(!hist.flags.normalized);
        assert_eq!(hist.stats().non_zero_bins, 0);
    }

    #[test]
    fn rejects_mismatched_grids() {
        let a = GrayImage::zeros(4, 4);
        let b = GrayImage::zeros(5, 4);
        let err = Histogram2DBuilder::new(8)
            .build(&a.view(), &b.view())
            .unwrap_err();
        assert!(matches!(
            err,
            Otsu2dError::Grid(GridError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn rejects_invalid_settings() {
        let a = GrayImage::zeros(2, 2);
        assert!(matches!(
            Histogram2DBuilder::new(1).build(&a.view(), &a.view()),
            Err(Otsu2dError::InvalidBins { .. })
        ));
        assert!(matches!(
            Histogram2DBuilder::new(8)
                .pixel_weight_factor(-0.5)
                .build(&a.view(), &a.view()),
            Err(Otsu2dError::InvalidWeightFactor(_))
        ));
    }

    #[test]
    fn stats_report_peak() {
        let mut hist = Histogram2D::zeros(4);
        hist.add(2, 1, 5.0);
        hist.add(0, 3, 1.0);
        let s = hist.stats();
        assert_eq!(s.peak, [2, 1]);
        assert_eq!(s.non_zero_bins, 2);
        assert_relative_eq!(s.total, 6.0);
        let [mi, mj] = s.mean_bin.expect("non-empty");
        assert_relative_eq!(mi, 10.0 / 6.0);
        assert_relative_eq!(mj, 8.0 / 6.0);
        assert_eq!(Histogram2D::zeros(4).stats().mean_bin, None);
    }
}
