//! Two-dimensional Otsu thresholding.
//!
//! ## Quickstart
//!
//! ```
//! use histoseg_core::GrayImage;
//! use histoseg_otsu2d::{Otsu2dParams, Otsu2dSegmenter};
//!
//! let image = GrayImage::from_fn(32, 32, |x, _| if x < 16 { 20 } else { 220 });
//! // The neighborhood grid normally comes from a blur of `image`.
//! let feature = image.clone();
//!
//! let segmenter = Otsu2dSegmenter::new(Otsu2dParams::default()).unwrap();
//! let result = segmenter.segment(&image.view(), &feature.view()).unwrap();
//! assert_eq!(result.mask.get(0, 0), 0);
//! assert_eq!(result.mask.get(31, 0), 255);
//! ```
//!
//! Pipeline:
//! 1. Accumulate the joint histogram of (intensity, blended feature) bins.
//! 2. Optionally smooth, log-scale and normalize it.
//! 3. Scan candidate splits `(t1, t2)`, scoring the background rectangle
//!    `i ≤ t1 ∧ j ≤ t2` against its complement by weighted squared centroid
//!    distance. The fast mode scans every second split, then refines.
//! 4. Binarize the image with the winning pair of cut points.

mod binarize;
mod error;
mod histogram;
mod optimizer;
mod params;
mod segmenter;
mod stats;

pub use binarize::Binarizer2D;
pub use error::Otsu2dError;
pub use histogram::{
    blend_feature, gaussian_kernel, Histogram2D, Histogram2DBuilder, HistogramFlags,
    HistogramStats2D,
};
pub use optimizer::{OptimizationResult, Threshold2D, ThresholdOptimizer2D};
pub use params::{DecisionRule, Otsu2dParams, Quality, MIN_PARAM_BINS};
pub use segmenter::{Otsu2dResult, Otsu2dSegmenter};
pub use stats::{ClassStatistics2D, GlobalStatistics2D, MomentSums, MomentTable};
