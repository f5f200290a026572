//! 1D threshold extraction from an active-region histogram.

use serde::{Deserialize, Serialize};

use crate::{Histogram1D, ThresholdMethod};

/// Threshold returned for a histogram with no counts.
pub const EMPTY_HISTOGRAM_THRESHOLD: f64 = 127.5;

/// Picks a threshold on the 8-bit scale with the configured method.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdSelector1D {
    method: ThresholdMethod,
}

impl ThresholdSelector1D {
    pub fn new(method: ThresholdMethod) -> Self {
        Self { method }
    }

    pub fn method(&self) -> ThresholdMethod {
        self.method
    }

    pub fn select(&self, hist: &Histogram1D) -> f64 {
        match self.method {
            ThresholdMethod::Otsu => otsu_threshold(hist),
            ThresholdMethod::Mean => mean_threshold(hist),
            ThresholdMethod::Median => median_threshold(hist),
        }
    }
}

/// Otsu's criterion over bin centers.
///
/// Returns the upper edge of the last background bin of the first split
/// with the largest between-class variance. A histogram with no separable
/// split (one occupied bin) yields its mean.
pub fn otsu_threshold(hist: &Histogram1D) -> f64 {
    let total = hist.total() as f64;
    if total <= 0.0 {
        return EMPTY_HISTOGRAM_THRESHOLD;
    }
    let mapper = hist.mapper();
    let sum_total: f64 = hist
        .counts()
        .iter()
        .enumerate()
        .map(|(i, &c)| mapper.bin_center(i) * c as f64)
        .sum();

    let mut w_b = 0f64;
    let mut sum_b = 0f64;
    let mut best_var = 0f64;
    let mut best_t = None;

    for (t, &c) in hist.counts().iter().enumerate().take(hist.bins().saturating_sub(1)) {
        w_b += c as f64;
        sum_b += mapper.bin_center(t) * c as f64;
        let w_f = total - w_b;
        if w_b <= 0.0 || w_f <= 0.0 {
            continue;
        }
        let m_b = sum_b / w_b;
        let m_f = (sum_total - sum_b) / w_f;
        let var_between = w_b * w_f * (m_b - m_f) * (m_b - m_f);
        if var_between > best_var {
            best_var = var_between;
            best_t = Some(t);
        }
    }

    match best_t {
        Some(t) => mapper.bin_upper_edge(t),
        None => sum_total / total,
    }
}

/// Count-weighted mean of the bin centers.
pub fn mean_threshold(hist: &Histogram1D) -> f64 {
    let total = hist.total();
    if total == 0 {
        return EMPTY_HISTOGRAM_THRESHOLD;
    }
    let mapper = hist.mapper();
    let sum: f64 = hist
        .counts()
        .iter()
        .enumerate()
        .map(|(i, &c)| mapper.bin_center(i) * c as f64)
        .sum();
    sum / total as f64
}

/// Upper edge of the first bin at which the cumulative count reaches half
/// of the total.
pub fn median_threshold(hist: &Histogram1D) -> f64 {
    let total = hist.total();
    if total == 0 {
        return EMPTY_HISTOGRAM_THRESHOLD;
    }
    let mut cumulative = 0u64;
    for (i, &c) in hist.counts().iter().enumerate() {
        cumulative += c;
        if 2 * cumulative >= total {
            return hist.mapper().bin_upper_edge(i);
        }
    }
    hist.mapper().bin_upper_edge(hist.bins() - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn two_level(bins: usize, lo: u8, hi: u8, n_lo: u64, n_hi: u64) -> Histogram1D {
        let mut counts = vec![0u64; bins];
        let mapper = histoseg_core::BinMapper::new(bins);
        counts[mapper.bin_u8(lo)] += n_lo;
        counts[mapper.bin_u8(hi)] += n_hi;
        Histogram1D::from_counts(counts).expect("counts")
    }

    #[test]
    fn empty_histogram_falls_back_for_every_method() {
        let h = Histogram1D::zeros(16);
        for method in [ThresholdMethod::Otsu, ThresholdMethod::Mean, ThresholdMethod::Median] {
            assert_relative_eq!(ThresholdSelector1D::new(method).select(&h), 127.5);
        }
    }

    #[test]
    fn otsu_separates_two_levels_at_first_gap_edge() {
        let h = two_level(16, 10, 250, 8, 8);
        // Bins 0 and 15 occupied; every split ties and the first wins.
        assert_relative_eq!(otsu_threshold(&h), 16.0);
    }

    #[test]
    fn otsu_single_bin_returns_mean() {
        let h = two_level(16, 100, 100, 4, 4);
        assert_relative_eq!(otsu_threshold(&h), h.mapper().bin_center(6));
    }

    #[test]
    fn otsu_prefers_larger_gap() {
        let mut counts = vec![0u64; 8];
        counts[1] = 10;
        counts[2] = 10;
        counts[6] = 10;
        let h = Histogram1D::from_counts(counts).expect("counts");
        // Splitting after bin 2 isolates the far cluster.
        assert_relative_eq!(otsu_threshold(&h), 96.0);
    }

    #[test]
    fn mean_uses_bin_centers() {
        let h = two_level(16, 10, 250, 1, 1);
        assert_relative_eq!(mean_threshold(&h), (8.0 + 248.0) / 2.0);
    }

    #[test]
    fn median_is_upper_edge_of_half_bin() {
        let h = two_level(16, 10, 250, 2, 2);
        assert_relative_eq!(median_threshold(&h), 16.0);
        let h = two_level(16, 10, 250, 1, 3);
        assert_relative_eq!(median_threshold(&h), 256.0);
    }
}
