use histoseg_core::{BinMapper, GrayImage, GrayImageView};
use log::{info, warn};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    Binarizer2D, GlobalStatistics2D, Histogram2DBuilder, HistogramFlags, HistogramStats2D,
    Otsu2dError, Otsu2dParams, Threshold2D, ThresholdOptimizer2D,
};

/// Output of one 2D Otsu run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Otsu2dResult {
    pub mask: GrayImage,
    pub threshold: Threshold2D,
    /// `[pixel, feature]` thresholds on the 8-bit scale.
    pub threshold_intensity: [f64; 2],
    pub histogram_flags: HistogramFlags,
    pub histogram_stats: HistogramStats2D,
    /// `None` when the histogram carried no weight.
    pub global: Option<GlobalStatistics2D>,
    pub evaluated_splits: usize,
    /// The threshold is the `(B/2, B/2)` fallback; treat the mask as low confidence.
    pub fallback: bool,
}

/// Histogram → split search → binarization, with validated parameters.
#[derive(Clone, Debug)]
pub struct Otsu2dSegmenter {
    params: Otsu2dParams,
}

impl Otsu2dSegmenter {
    pub fn new(params: Otsu2dParams) -> Result<Self, Otsu2dError> {
        params.validate()?;
        Ok(Self { params })
    }

    #[inline]
    pub fn params(&self) -> &Otsu2dParams {
        &self.params
    }

    /// Segment `intensity` using the caller's neighborhood `feature` grid.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip_all, fields(width = intensity.width, height = intensity.height))
    )]
    pub fn segment(
        &self,
        intensity: &GrayImageView<'_>,
        feature: &GrayImageView<'_>,
    ) -> Result<Otsu2dResult, Otsu2dError> {
        let p = &self.params;
        let hist = Histogram2DBuilder::from_params(p).build(intensity, feature)?;
        let histogram_stats = hist.stats();
        let global = match GlobalStatistics2D::compute(&hist) {
            Ok(g) => Some(g),
            Err(Otsu2dError::EmptyHistogram) => {
                warn!("2D histogram is empty; using fallback threshold");
                None
            }
            Err(e) => return Err(e),
        };

        let search = ThresholdOptimizer2D::new(p.quality).optimize(&hist);
        let binarizer = Binarizer2D::new(
            &search.threshold,
            p.histogram_bins,
            p.pixel_weight_factor,
            p.decision_rule,
        );
        let mask = binarizer.apply(intensity, feature)?;
        let threshold_intensity = search
            .threshold
            .to_intensity(&BinMapper::new(p.histogram_bins));

        info!(
            "2D Otsu: threshold=({}, {}) -> ({:.1}, {:.1}) score={:.6} foreground={}/{}",
            search.threshold.pixel_threshold,
            search.threshold.feature_threshold,
            threshold_intensity[0],
            threshold_intensity[1],
            search.threshold.variance,
            mask.count_nonzero(),
            mask.data.len()
        );

        Ok(Otsu2dResult {
            mask,
            threshold: search.threshold,
            threshold_intensity,
            histogram_flags: hist.flags,
            histogram_stats,
            global,
            evaluated_splits: search.evaluated,
            fallback: search.fallback,
        })
    }
}
