//! Split search maximizing the 2D between-class separation.

use histoseg_core::BinMapper;
use log::debug;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::stats::{ClassStatistics2D, MomentTable};
use crate::{Histogram2D, Quality};

/// Radius of the step-1 refinement window around a coarse optimum.
const REFINE_RADIUS: usize = 2;

/// Pair of bin indices plus the separation score achieved at that split.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Threshold2D {
    pub pixel_threshold: usize,
    pub feature_threshold: usize,
    pub variance: f64,
}

impl Threshold2D {
    /// Both indices in `[0, bins)` and a finite, non-negative score.
    pub fn is_valid(&self, bins: usize) -> bool {
        self.pixel_threshold < bins
            && self.feature_threshold < bins
            && self.variance.is_finite()
            && self.variance >= 0.0
    }

    /// Thresholds on the 8-bit scale, `index · 255 / (B − 1)`.
    pub fn to_intensity(&self, mapper: &BinMapper) -> [f64; 2] {
        [
            mapper.index_to_intensity(self.pixel_threshold),
            mapper.index_to_intensity(self.feature_threshold),
        ]
    }
}

/// Threshold plus bookkeeping about the search that produced it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub threshold: Threshold2D,
    /// Splits with two non-empty classes that were scored.
    pub evaluated: usize,
    /// Splits skipped because one class was empty.
    pub degenerate: usize,
    /// True when no split scored above zero and the fallback was returned.
    pub fallback: bool,
}

/// Scans `t1, t2 ∈ [1, B − 2]` for the split with the largest separation.
#[derive(Clone, Copy, Debug, Default)]
pub struct ThresholdOptimizer2D {
    quality: Quality,
}

struct Search<'a> {
    table: &'a MomentTable,
    best: Threshold2D,
    evaluated: usize,
    degenerate: usize,
}

impl Search<'_> {
    fn scan(
        &mut self,
        t1s: impl Iterator<Item = usize>,
        t2s: impl Iterator<Item = usize> + Clone,
    ) {
        for t1 in t1s {
            for t2 in t2s.clone() {
                let Some(stats) = ClassStatistics2D::compute(self.table, t1, t2) else {
                    self.degenerate += 1;
                    continue;
                };
                debug_assert!(
                    stats.weight_residual() <= 1e-6 * stats.total_weight.max(1.0),
                    "class weights do not reconcile at ({t1}, {t2})"
                );
                self.evaluated += 1;
                let score = stats.between_class_separation();
                if score > self.best.variance {
                    self.best = Threshold2D {
                        pixel_threshold: t1,
                        feature_threshold: t2,
                        variance: score,
                    };
                }
            }
        }
    }
}

impl ThresholdOptimizer2D {
    pub fn new(quality: Quality) -> Self {
        Self { quality }
    }

    pub fn quality(&self) -> Quality {
        self.quality
    }

    /// Find the best split.
    ///
    /// Ties keep the first split in scan order (`t1` ascending, then `t2`).
    /// When nothing scores above zero the result is `(B/2, B/2)` with score 0.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip_all, fields(bins = hist.bins(), quality = ?self.quality))
    )]
    pub fn optimize(&self, hist: &Histogram2D) -> OptimizationResult {
        let b = hist.bins();
        let table = MomentTable::new(hist);
        let mut search = Search {
            table: &table,
            best: Threshold2D {
                pixel_threshold: b / 2,
                feature_threshold: b / 2,
                variance: 0.0,
            },
            evaluated: 0,
            degenerate: 0,
        };

        if b >= 3 {
            let hi = b - 2;
            let step = self.quality.step();
            search.scan((1..=hi).step_by(step), (1..=hi).step_by(step));

            if step > 1 && search.best.variance > 0.0 {
                let c = search.best;
                let t1s = c.pixel_threshold.saturating_sub(REFINE_RADIUS).max(1)
                    ..=(c.pixel_threshold + REFINE_RADIUS).min(hi);
                let t2s = c.feature_threshold.saturating_sub(REFINE_RADIUS).max(1)
                    ..=(c.feature_threshold + REFINE_RADIUS).min(hi);
                search.scan(t1s, t2s);
            }
        }

        let threshold = search.best;
        assert!(
            threshold.is_valid(b.max(1)),
            "optimizer produced an invalid threshold: {threshold:?}"
        );
        let fallback = threshold.variance <= 0.0;
        debug!(
            "2D split search: best=({}, {}) score={:.6} evaluated={} degenerate={} fallback={}",
            threshold.pixel_threshold,
            threshold.feature_threshold,
            threshold.variance,
            search.evaluated,
            search.degenerate,
            fallback
        );

        OptimizationResult {
            threshold,
            evaluated: search.evaluated,
            degenerate: search.degenerate,
            fallback,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use histoseg_core::GrayImage;

    use crate::Histogram2DBuilder;

    fn blobs(bins: usize, a: (usize, usize), b: (usize, usize)) -> Histogram2D {
        let mut h = Histogram2D::zeros(bins);
        h.add(a.0, a.1, 50.0);
        h.add(b.0, b.1, 50.0);
        h
    }

    #[test]
    fn uniform_image_falls_back_to_center() {
        let img = GrayImage::from_fn(4, 4, |_, _| 100);
        let hist = Histogram2DBuilder::new(4)
            .build(&img.view(), &img.view())
            .expect("histogram");
        assert_eq!(hist.non_zero_bins(), 1);

        let res = ThresholdOptimizer2D::new(Quality::Best).optimize(&hist);
        assert!(res.fallback);
        assert_eq!(res.evaluated, 0);
        assert_eq!(res.threshold.pixel_threshold, 2);
        assert_eq!(res.threshold.feature_threshold, 2);
        assert_relative_eq!(res.threshold.variance, 0.0);
    }

    #[test]
    fn separates_two_blobs() {
        let hist = blobs(32, (4, 5), (25, 27));
        let res = ThresholdOptimizer2D::new(Quality::Best).optimize(&hist);
        let t = res.threshold;
        assert!(!res.fallback);
        // Background rectangle must contain the low blob and exclude the high one.
        assert!(t.pixel_threshold >= 4 && t.feature_threshold >= 5);
        assert!(t.pixel_threshold < 25 || t.feature_threshold < 27);
        assert!(t.variance > 0.0);
    }

    #[test]
    fn ties_resolve_to_first_in_scan_order() {
        let hist = blobs(16, (2, 2), (13, 13));
        let res = ThresholdOptimizer2D::new(Quality::Best).optimize(&hist);
        // Every split containing only the low blob scores the same; the
        // first one scanned is (2, 2).
        assert_eq!(res.threshold.pixel_threshold, 2);
        assert_eq!(res.threshold.feature_threshold, 2);
    }

    #[test]
    fn fast_refinement_matches_best_score() {
        let mut hist = Histogram2D::zeros(32);
        for d in 0..5 {
            hist.add(6 + d, 7, 10.0 - d as f64);
            hist.add(21, 20 + d, 12.0 - d as f64);
        }
        hist.add(3, 19, 4.0);
        let fast = ThresholdOptimizer2D::new(Quality::Fast).optimize(&hist);
        let best = ThresholdOptimizer2D::new(Quality::Best).optimize(&hist);
        assert!(fast.evaluated < best.evaluated);
        assert!(fast.threshold.variance <= best.threshold.variance + 1e-12);
        assert!(fast.threshold.variance >= 0.95 * best.threshold.variance);
    }

    #[test]
    fn every_evaluated_split_reconciles() {
        let hist = blobs(16, (3, 4), (12, 9));
        let table = MomentTable::new(&hist);
        for t1 in 1..=14 {
            for t2 in 1..=14 {
                if let Some(c) = ClassStatistics2D::compute(&table, t1, t2) {
                    assert!(
                        (c.weight_background + c.weight_foreground - c.total_weight).abs() < 1e-6
                    );
                }
            }
        }
    }

    #[test]
    fn threshold_validity() {
        let t = Threshold2D {
            pixel_threshold: 3,
            feature_threshold: 1,
            variance: 0.5,
        };
        assert!(t.is_valid(4));
        assert!(!t.is_valid(3));
        assert!(!Threshold2D { variance: f64::NAN, ..t }.is_valid(4));
        assert!(!Threshold2D { variance: -1.0, ..t }.is_valid(4));
        let mapper = BinMapper::new(4);
        assert_eq!(t.to_intensity(&mapper), [255.0, 85.0]);
    }
}
