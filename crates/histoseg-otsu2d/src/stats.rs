//! Moments of a 2D histogram, globally and per candidate split.

use serde::{Deserialize, Serialize};

use crate::{Histogram2D, Otsu2dError};

/// Weighted moments of the `(i, j)` bin coordinates over the whole histogram.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GlobalStatistics2D {
    pub total_weight: f64,
    pub mean_i: f64,
    pub mean_j: f64,
    pub variance_i: f64,
    pub variance_j: f64,
    pub covariance: f64,
}

impl GlobalStatistics2D {
    pub fn compute(hist: &Histogram2D) -> Result<Self, Otsu2dError> {
        let b = hist.bins();
        let (mut w, mut si, mut sj, mut sii, mut sjj, mut sij) = (0.0f64, 0.0, 0.0, 0.0, 0.0, 0.0);
        for i in 0..b {
            let fi = i as f64;
            for j in 0..b {
                let h = hist.get(i, j);
                if h == 0.0 {
                    continue;
                }
                let fj = j as f64;
                w += h;
                si += h * fi;
                sj += h * fj;
                sii += h * fi * fi;
                sjj += h * fj * fj;
                sij += h * fi * fj;
            }
        }
        if w <= 0.0 {
            return Err(Otsu2dError::EmptyHistogram);
        }

        let mean_i = si / w;
        let mean_j = sj / w;
        Ok(Self {
            total_weight: w,
            mean_i,
            mean_j,
            // Clamp tiny negative values from cancellation.
            variance_i: (sii / w - mean_i * mean_i).max(0.0),
            variance_j: (sjj / w - mean_j * mean_j).max(0.0),
            covariance: sij / w - mean_i * mean_j,
        })
    }
}

/// Inclusive summed-area tables of weight and first moments.
///
/// `rect(t1, t2)` returns the sums over `i ≤ t1 ∧ j ≤ t2` in O(1), which keeps
/// the exhaustive split search at O(B²).
#[derive(Clone, Debug)]
pub struct MomentTable {
    bins: usize,
    weight: Vec<f64>,
    moment_i: Vec<f64>,
    moment_j: Vec<f64>,
}

/// Weight and first-moment sums over a set of bins.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MomentSums {
    pub weight: f64,
    pub moment_i: f64,
    pub moment_j: f64,
}

impl MomentTable {
    pub fn new(hist: &Histogram2D) -> Self {
        let b = hist.bins();
        let mut weight = vec![0.0f64; b * b];
        let mut moment_i = vec![0.0f64; b * b];
        let mut moment_j = vec![0.0f64; b * b];

        for i in 0..b {
            let (mut row_w, mut row_i, mut row_j) = (0.0f64, 0.0f64, 0.0f64);
            for j in 0..b {
                let h = hist.get(i, j);
                row_w += h;
                row_i += h * i as f64;
                row_j += h * j as f64;
                let idx = i * b + j;
                let (up_w, up_i, up_j) = if i > 0 {
                    let up = idx - b;
                    (weight[up], moment_i[up], moment_j[up])
                } else {
                    (0.0, 0.0, 0.0)
                };
                weight[idx] = up_w + row_w;
                moment_i[idx] = up_i + row_i;
                moment_j[idx] = up_j + row_j;
            }
        }

        Self {
            bins: b,
            weight,
            moment_i,
            moment_j,
        }
    }

    #[inline]
    pub fn bins(&self) -> usize {
        self.bins
    }

    /// Sums over the whole histogram.
    #[inline]
    pub fn total(&self) -> MomentSums {
        match self.bins {
            0 => MomentSums::default(),
            b => self.rect(b - 1, b - 1),
        }
    }

    /// Sums over the rectangle `i ≤ t1 ∧ j ≤ t2`.
    #[inline]
    pub fn rect(&self, t1: usize, t2: usize) -> MomentSums {
        let idx = t1 * self.bins + t2;
        MomentSums {
            weight: self.weight[idx],
            moment_i: self.moment_i[idx],
            moment_j: self.moment_j[idx],
        }
    }
}

/// Two-way partition of the histogram at `(t1, t2)`.
///
/// Background is the rectangle `i ≤ t1 ∧ j ≤ t2`; foreground is the
/// L-shaped remainder.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassStatistics2D {
    pub t1: usize,
    pub t2: usize,
    pub total_weight: f64,
    pub weight_background: f64,
    pub weight_foreground: f64,
    /// `[mean_i, mean_j]` of the background class.
    pub mean_background: [f64; 2],
    /// `[mean_i, mean_j]` of the foreground class.
    pub mean_foreground: [f64; 2],
}

impl ClassStatistics2D {
    /// Partition statistics, or `None` when either class carries no weight.
    pub fn compute(table: &MomentTable, t1: usize, t2: usize) -> Option<Self> {
        let total = table.total();
        if total.weight <= 0.0 {
            return None;
        }
        let bg = table.rect(t1, t2);
        let fg = MomentSums {
            weight: total.weight - bg.weight,
            moment_i: total.moment_i - bg.moment_i,
            moment_j: total.moment_j - bg.moment_j,
        };

        // Below this the class is empty up to summation error.
        let floor = total.weight * 1e-12;
        if bg.weight <= floor || fg.weight <= floor {
            return None;
        }

        Some(Self {
            t1,
            t2,
            total_weight: total.weight,
            weight_background: bg.weight,
            weight_foreground: fg.weight,
            mean_background: [bg.moment_i / bg.weight, bg.moment_j / bg.weight],
            mean_foreground: [fg.moment_i / fg.weight, fg.moment_j / fg.weight],
        })
    }

    /// `w0 · w1 · |μ1 − μ0|²` with weights as fractions of the total.
    ///
    /// Within-class covariance is ignored.
    #[inline]
    pub fn between_class_separation(&self) -> f64 {
        let w0 = self.weight_background / self.total_weight;
        let w1 = self.weight_foreground / self.total_weight;
        let di = self.mean_foreground[0] - self.mean_background[0];
        let dj = self.mean_foreground[1] - self.mean_background[1];
        w0 * w1 * (di * di + dj * dj)
    }

    /// Difference between the class weight sum and the total weight.
    #[inline]
    pub fn weight_residual(&self) -> f64 {
        (self.weight_background + self.weight_foreground - self.total_weight).abs()
    }
}
