use histoseg_core::GridError;

/// Errors returned by the 2D Otsu path.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Otsu2dError {
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error("histogram_bins must be in [{min}, 256], got {bins}")]
    InvalidBins { bins: usize, min: usize },
    #[error("pixel_weight_factor must be in [0, 1], got {0}")]
    InvalidWeightFactor(f64),
    #[error("smoothing_sigma must be finite and >= 0, got {0}")]
    InvalidSmoothingSigma(f64),
    #[error("histogram has no weight")]
    EmptyHistogram,
}
