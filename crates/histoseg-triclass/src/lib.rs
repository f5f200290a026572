//! Iterative three-class thresholding.
//!
//! Each pass builds a histogram of the still-undecided pixels, picks a 1D
//! threshold θ, and widens it into a band `[θ(1−g), θ(1+g)]`. Pixels above
//! the band become foreground, pixels below it background, and the rest
//! (TBD, "to be determined") form the active region of the next pass. The
//! loop stops on convergence, depletion, the iteration budget, oscillation
//! or stagnation; leftover TBD pixels are then assigned by `value ≥ θ`.
//! Zero-valued pixels are background from the start and never enter a pass.
//!
//! ```
//! use histoseg_core::GrayImage;
//! use histoseg_triclass::{TerminationReason, TriclassParams, TriclassRunner};
//!
//! let image = GrayImage::from_fn(16, 4, |x, _| if x < 8 { 10 } else { 250 });
//! let params = TriclassParams {
//!     histogram_bins: 16,
//!     lower_upper_gap_factor: 0.0,
//!     ..TriclassParams::default()
//! };
//! let result = TriclassRunner::new(params).unwrap().segment(&image.view()).unwrap();
//! assert_eq!(result.termination, TerminationReason::Depleted);
//! assert_eq!(result.history.len(), 1);
//! ```

mod controller;
mod error;
mod histogram;
mod monitor;
mod params;
mod runner;
mod segment;
mod selector;

pub use controller::{ControllerState, IterativeController, TerminationReason, TriclassResult};
pub use error::TriclassError;
pub use histogram::{Histogram1D, HistogramStats1D};
pub use monitor::{
    detect_oscillation, ConvergenceMonitor, ConvergenceReport, IterationRecord, SeriesStatistics,
    Stability,
};
pub use params::{ThresholdMethod, TriclassParams, MAX_ITERATIONS_LIMIT, MIN_PARAM_BINS};
pub use runner::TriclassRunner;
pub use segment::{ActiveRegion, Partition, PixelClass, ThresholdBand, TriclassSegmenter};
pub use selector::{
    mean_threshold, median_threshold, otsu_threshold, ThresholdSelector1D,
    EMPTY_HISTOGRAM_THRESHOLD,
};
