use histoseg_core::GridError;

/// Errors returned by the iterative triclass path.
///
/// Every variant is raised before any pixel is touched.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum TriclassError {
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error("histogram_bins must be in [{min}, 256], got {bins}")]
    InvalidBins { bins: usize, min: usize },
    #[error("convergence_epsilon must be in (0, 50], got {0}")]
    InvalidEpsilon(f64),
    #[error("max_iterations must be in [1, 100], got {0}")]
    InvalidMaxIterations(usize),
    #[error("minimum_tbd_fraction must be in [0.0001, 0.5], got {0}")]
    InvalidTbdFraction(f64),
    #[error("lower_upper_gap_factor must be in [0, 1], got {0}")]
    InvalidGapFactor(f64),
}
