use std::path::PathBuf;

use crate::core::GridError;
use crate::otsu2d::Otsu2dError;
use crate::postprocess::PostprocessError;
use crate::triclass::TriclassError;

/// Errors produced by the facade: configuration, dispatch and I/O.
#[derive(thiserror::Error, Debug)]
pub enum SegmentError {
    #[error(transparent)]
    Grid(#[from] GridError),

    #[error(transparent)]
    Otsu2d(#[from] Otsu2dError),

    #[error(transparent)]
    Triclass(#[from] TriclassError),

    #[error(transparent)]
    Postprocess(#[from] PostprocessError),

    #[error("unknown algorithm `{0}` (expected `otsu_2d` or `iterative_triclass`)")]
    UnknownAlgorithm(String),

    #[error("unknown option `{key}` for {algorithm}")]
    UnknownOption { algorithm: &'static str, key: String },

    #[error("{context}: {source}")]
    Config {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("the 2D Otsu path needs a neighborhood feature grid")]
    MissingFeatureGrid,

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "image")]
    #[error(transparent)]
    Image(#[from] ::image::ImageError),

    #[error("invalid grayscale image buffer length (expected {expected} bytes, got {got})")]
    InvalidGrayBuffer { expected: usize, got: usize },

    #[error("invalid grayscale image dimensions (width={width}, height={height})")]
    InvalidGrayDimensions { width: u32, height: u32 },
}
