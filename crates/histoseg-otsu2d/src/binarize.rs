use histoseg_core::{BinMapper, GrayImage, GrayImageView, BACKGROUND, FOREGROUND};

use crate::histogram::blend_feature;
use crate::{DecisionRule, Otsu2dError, Threshold2D};

/// Applies a [`Threshold2D`] to a pair of grids.
///
/// Thresholds are compared on the 8-bit scale with strict `>`. The
/// binarizer holds no state besides its cut points, so applying it twice
/// yields the same mask.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Binarizer2D {
    pub pixel_cut: f64,
    pub feature_cut: f64,
    pub pixel_weight_factor: f64,
    pub rule: DecisionRule,
}

impl Binarizer2D {
    pub fn new(
        threshold: &Threshold2D,
        bins: usize,
        pixel_weight_factor: f64,
        rule: DecisionRule,
    ) -> Self {
        let [pixel_cut, feature_cut] = threshold.to_intensity(&BinMapper::new(bins));
        Self {
            pixel_cut,
            feature_cut,
            pixel_weight_factor,
            rule,
        }
    }

    #[inline]
    pub fn is_foreground(&self, intensity: u8, neighborhood: u8) -> bool {
        let above_pixel = intensity as f64 > self.pixel_cut;
        let above_feature =
            blend_feature(self.pixel_weight_factor, intensity, neighborhood) > self.feature_cut;
        match self.rule {
            DecisionRule::BothAxes => above_pixel && above_feature,
            DecisionRule::EitherAxis => above_pixel || above_feature,
        }
    }

    /// Binary mask (0/255) with the shape of the inputs.
    pub fn apply(
        &self,
        intensity: &GrayImageView<'_>,
        feature: &GrayImageView<'_>,
    ) -> Result<GrayImage, Otsu2dError> {
        intensity.ensure_same_shape(feature)?;
        let data = intensity
            .data
            .iter()
            .zip(feature.data.iter())
            .map(|(&v, &n)| {
                if self.is_foreground(v, n) {
                    FOREGROUND
                } else {
                    BACKGROUND
                }
            })
            .collect();
        Ok(GrayImage {
            width: intensity.width,
            height: intensity.height,
            data,
        })
    }
}
