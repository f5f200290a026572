//! Core types shared by the histogram thresholding crates.
//!
//! This crate is intentionally small. It owns the grid views handed in by
//! callers, the intensity-to-bin mapping used by every histogram, and a
//! minimal logger. It does not depend on any concrete image library.

mod bins;
mod grid;
mod logger;

pub use bins::{BinMapper, INTENSITY_LEVELS, MAX_INTENSITY};
pub use grid::{GrayImage, GrayImageView, GridError, BACKGROUND, FOREGROUND};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
