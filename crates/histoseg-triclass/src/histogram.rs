use histoseg_core::{BinMapper, GrayImageView};
use serde::{Deserialize, Serialize};

/// Integer counts over `B` intensity bins.
///
/// Built only from pixels with value `> 0`: zero marks a pixel outside the
/// active region.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Histogram1D {
    mapper: BinMapper,
    counts: Vec<u64>,
}

/// Summary of a [`Histogram1D`]; `non_zero_bins == 0` means the threshold
/// derived from it is the 127.5 fallback.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistogramStats1D {
    pub bins: usize,
    pub total: u64,
    pub non_zero_bins: usize,
    pub peak: usize,
    pub peak_count: u64,
    /// Count-weighted mean bin index, `None` for an empty histogram.
    pub mean_bin: Option<f64>,
}

impl Histogram1D {
    pub fn zeros(bins: usize) -> Self {
        let mapper = BinMapper::new(bins);
        Self {
            counts: vec![0; mapper.bins()],
            mapper,
        }
    }

    /// Wrap precomputed counts; the bin count is `counts.len()`.
    pub fn from_counts(counts: Vec<u64>) -> Option<Self> {
        if counts.is_empty() || counts.len() > 256 {
            return None;
        }
        Some(Self {
            mapper: BinMapper::new(counts.len()),
            counts,
        })
    }

    /// Count every nonzero pixel of `region`.
    pub fn from_view(region: &GrayImageView<'_>, bins: usize) -> Self {
        let mut hist = Self::zeros(bins);
        for &v in region.data.iter().filter(|&&v| v > 0) {
            let b = hist.mapper.bin_u8(v);
            hist.counts[b] += 1;
        }
        hist
    }

    #[inline]
    pub fn bins(&self) -> usize {
        self.counts.len()
    }

    #[inline]
    pub fn mapper(&self) -> &BinMapper {
        &self.mapper
    }

    #[inline]
    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.iter().all(|&c| c == 0)
    }

    pub fn non_zero_bins(&self) -> usize {
        self.counts.iter().filter(|&&c| c > 0).count()
    }

    pub fn stats(&self) -> HistogramStats1D {
        let total = self.total();
        let (peak, peak_count) = self
            .counts
            .iter()
            .enumerate()
            .fold((0, 0), |best, (i, &c)| if c > best.1 { (i, c) } else { best });
        let mean_bin = (total > 0).then(|| {
            let moment: f64 = self
                .counts
                .iter()
                .enumerate()
                .map(|(i, &c)| i as f64 * c as f64)
                .sum();
            moment / total as f64
        });
        HistogramStats1D {
            bins: self.bins(),
            total,
            non_zero_bins: self.non_zero_bins(),
            peak,
            peak_count,
            mean_bin,
        }
    }
}
