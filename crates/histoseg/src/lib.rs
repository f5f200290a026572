//! Histogram-based binary segmentation.
//!
//! This crate provides:
//! - re-exports of the algorithm crates (`core`, `otsu2d`, `triclass`)
//! - an [`AlgorithmRegistry`] holding default parameter sets with JSON
//!   overrides
//! - the [`MaskPostprocessor`] contract for external cleanup stages
//! - (feature `image`) helpers that run a segmenter on an `image::GrayImage`
//!
//! ## Quickstart
//!
//! ```no_run
//! use histoseg::{detect, AlgorithmKind, AlgorithmRegistry};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let img = detect::load_gray("cells.png")?;
//! let registry = AlgorithmRegistry::new();
//! let segmenter = registry.segmenter(
//!     AlgorithmKind::Otsu2d,
//!     Some(&serde_json::json!({ "quality": "Best" })),
//! )?;
//!
//! let outcome = detect::segment_image(&img, &segmenter, 1.5)?;
//! println!("foreground pixels: {}", outcome.mask().count_nonzero());
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `histoseg::core`: grids, bin mapping, logger.
//! - `histoseg::otsu2d`: joint histogram, split search, 2D binarization.
//! - `histoseg::triclass`: iterative triclass controller and convergence monitor.
//! - `histoseg::detect` (feature `image`): end-to-end helpers from `image::GrayImage`.

pub use histoseg_core as core;
pub use histoseg_otsu2d as otsu2d;
pub use histoseg_triclass as triclass;

pub use histoseg_core::{GrayImage, GrayImageView};
pub use histoseg_otsu2d::{Otsu2dParams, Otsu2dResult};
pub use histoseg_triclass::{TriclassParams, TriclassResult};

mod error;
pub mod postprocess;
pub mod registry;

pub use error::SegmentError;
pub use postprocess::{MaskPostprocessor, PostprocessChain, PostprocessError};
pub use registry::{
    AlgorithmKind, AlgorithmParams, AlgorithmRegistry, SegmentationOutcome, Segmenter,
};

#[cfg(feature = "image")]
pub mod detect;
