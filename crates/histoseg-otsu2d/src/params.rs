use serde::{Deserialize, Serialize};

use crate::Otsu2dError;

/// Smallest bin count accepted in a parameter set.
pub const MIN_PARAM_BINS: usize = 8;

/// Search resolution of the threshold optimizer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Quality {
    /// Step-2 scan followed by a step-1 refinement around the coarse optimum.
    #[default]
    Fast,
    /// Exhaustive step-1 scan.
    Best,
}

impl Quality {
    #[inline]
    pub fn step(self) -> usize {
        match self {
            Quality::Fast => 2,
            Quality::Best => 1,
        }
    }
}

/// How the two thresholds combine into a foreground decision.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionRule {
    /// Foreground iff intensity AND blended feature exceed their thresholds.
    #[default]
    BothAxes,
    /// Foreground iff intensity OR blended feature exceeds its threshold.
    ///
    /// This is the complement of the background rectangle the optimizer
    /// scores, so mask and objective describe the same partition.
    EitherAxis,
}

/// Parameters of the 2D Otsu segmenter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Otsu2dParams {
    /// Bins per histogram axis.
    pub histogram_bins: usize,
    /// Weight of the raw intensity in the blended feature (`0` = neighborhood only).
    pub pixel_weight_factor: f64,
    /// Gaussian smoothing of the joint histogram; `0` disables it.
    pub smoothing_sigma: f64,
    pub use_log_histogram: bool,
    pub normalize_histogram: bool,
    pub quality: Quality,
    pub decision_rule: DecisionRule,
}

impl Default for Otsu2dParams {
    fn default() -> Self {
        Self {
            histogram_bins: 64,
            pixel_weight_factor: 0.5,
            smoothing_sigma: 1.0,
            use_log_histogram: false,
            normalize_histogram: true,
            quality: Quality::Fast,
            decision_rule: DecisionRule::BothAxes,
        }
    }
}

impl Otsu2dParams {
    pub fn validate(&self) -> Result<(), Otsu2dError> {
        if !(MIN_PARAM_BINS..=256).contains(&self.histogram_bins) {
            return Err(Otsu2dError::InvalidBins {
                bins: self.histogram_bins,
                min: MIN_PARAM_BINS,
            });
        }
        validate_weight_factor(self.pixel_weight_factor)?;
        validate_sigma(self.smoothing_sigma)?;
        Ok(())
    }
}

pub(crate) fn validate_weight_factor(alpha: f64) -> Result<(), Otsu2dError> {
    if alpha.is_finite() && (0.0..=1.0).contains(&alpha) {
        Ok(())
    } else {
        Err(Otsu2dError::InvalidWeightFactor(alpha))
    }
}

pub(crate) fn validate_sigma(sigma: f64) -> Result<(), Otsu2dError> {
    if sigma.is_finite() && sigma >= 0.0 {
        Ok(())
    } else {
        Err(Otsu2dError::InvalidSmoothingSigma(sigma))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(Otsu2dParams::default().validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_values() {
        let p = Otsu2dParams {
            histogram_bins: 4,
            ..Default::default()
        };
        assert_eq!(
            p.validate(),
            Err(Otsu2dError::InvalidBins { bins: 4, min: 8 })
        );

        let p = Otsu2dParams {
            pixel_weight_factor: 1.5,
            ..Default::default()
        };
        assert_eq!(p.validate(), Err(Otsu2dError::InvalidWeightFactor(1.5)));

        let p = Otsu2dParams {
            smoothing_sigma: -0.1,
            ..Default::default()
        };
        assert!(matches!(
            p.validate(),
            Err(Otsu2dError::InvalidSmoothingSigma(_))
        ));
    }

    #[test]
    fn deserializes_partial_json() {
        let p: Otsu2dParams =
            serde_json::from_str(r#"{ "quality": "Best", "decision_rule": "either_axis" }"#)
                .expect("parse");
        assert_eq!(p.quality, Quality::Best);
        assert_eq!(p.decision_rule, DecisionRule::EitherAxis);
        assert_eq!(p.histogram_bins, Otsu2dParams::default().histogram_bins);
    }
}
