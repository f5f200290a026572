use serde::{Deserialize, Serialize};

use crate::TriclassError;

/// Smallest bin count accepted in a parameter set.
pub const MIN_PARAM_BINS: usize = 8;

pub const MAX_ITERATIONS_LIMIT: usize = 100;

/// How each iteration picks its 1D threshold.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdMethod {
    /// Maximize the between-class variance of the active histogram.
    #[default]
    Otsu,
    /// Count-weighted mean of the bin centers.
    Mean,
    /// Upper edge of the bin where the cumulative count reaches half.
    Median,
}

/// Parameters of the iterative triclass segmenter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriclassParams {
    pub histogram_bins: usize,
    pub initial_threshold_method: ThresholdMethod,
    /// Threshold change (intensity units) below which the run has converged.
    pub convergence_epsilon: f64,
    pub max_iterations: usize,
    /// Stop once the TBD share of all pixels drops below this.
    pub minimum_tbd_fraction: f64,
    /// Half-width of the TBD band as a fraction of the threshold.
    pub lower_upper_gap_factor: f64,
}

impl Default for TriclassParams {
    fn default() -> Self {
        Self {
            histogram_bins: 256,
            initial_threshold_method: ThresholdMethod::Otsu,
            convergence_epsilon: 1.0,
            max_iterations: 10,
            minimum_tbd_fraction: 0.01,
            lower_upper_gap_factor: 0.1,
        }
    }
}

impl TriclassParams {
    pub fn validate(&self) -> Result<(), TriclassError> {
        if !(MIN_PARAM_BINS..=256).contains(&self.histogram_bins) {
            return Err(TriclassError::InvalidBins {
                bins: self.histogram_bins,
                min: MIN_PARAM_BINS,
            });
        }
        let eps = self.convergence_epsilon;
        if !(eps.is_finite() && eps > 0.0 && eps <= 50.0) {
            return Err(TriclassError::InvalidEpsilon(eps));
        }
        if !(1..=MAX_ITERATIONS_LIMIT).contains(&self.max_iterations) {
            return Err(TriclassError::InvalidMaxIterations(self.max_iterations));
        }
        let f = self.minimum_tbd_fraction;
        if !(f.is_finite() && (0.0001..=0.5).contains(&f)) {
            return Err(TriclassError::InvalidTbdFraction(f));
        }
        let g = self.lower_upper_gap_factor;
        if !(g.is_finite() && (0.0..=1.0).contains(&g)) {
            return Err(TriclassError::InvalidGapFactor(g));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(TriclassParams::default().validate().is_ok());
    }

    #[test]
    fn range_edges() {
        let ok = |p: TriclassParams| p.validate().is_ok();
        let base = TriclassParams::default();

        assert!(ok(TriclassParams {
            convergence_epsilon: 50.0,
            ..base.clone()
        }));
        assert!(!ok(TriclassParams {
            convergence_epsilon: 0.0,
            ..base.clone()
        }));
        assert!(ok(TriclassParams {
            max_iterations: 1,
            ..base.clone()
        }));
        assert_eq!(
            TriclassParams {
                max_iterations: 101,
                ..base.clone()
            }
            .validate(),
            Err(TriclassError::InvalidMaxIterations(101))
        );
        assert!(ok(TriclassParams {
            minimum_tbd_fraction: 0.0001,
            ..base.clone()
        }));
        assert!(!ok(TriclassParams {
            minimum_tbd_fraction: 0.6,
            ..base.clone()
        }));
        assert!(ok(TriclassParams {
            lower_upper_gap_factor: 0.0,
            ..base.clone()
        }));
        assert!(!ok(TriclassParams {
            lower_upper_gap_factor: f64::NAN,
            ..base.clone()
        }));
        assert!(!ok(TriclassParams {
            histogram_bins: 7,
            ..base
        }));
    }

    #[test]
    fn method_names_are_lowercase() {
        let p: TriclassParams =
            serde_json::from_str(r#"{ "initial_threshold_method": "median", "max_iterations": 3 }"#)
                .expect("parse");
        assert_eq!(p.initial_threshold_method, ThresholdMethod::Median);
        assert_eq!(p.max_iterations, 3);
        assert_eq!(p.histogram_bins, 256);
        assert!(serde_json::from_str::<TriclassParams>(r#"{ "initial_threshold_method": "Otsu" }"#)
            .is_err());
    }
}
