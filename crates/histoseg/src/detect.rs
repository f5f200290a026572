//! Glue between `image::GrayImage` and the segmentation crates.

use crate::core::{GrayImage, GrayImageView};
use crate::{SegmentError, SegmentationOutcome, Segmenter};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Borrow an `image::GrayImage` as a grid view.
pub fn gray_view(img: &::image::GrayImage) -> GrayImageView<'_> {
    GrayImageView {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw(),
    }
}

/// Build an `image::GrayImage` from a raw grayscale buffer.
pub fn gray_image_from_slice(
    width: u32,
    height: u32,
    pixels: &[u8],
) -> Result<::image::GrayImage, SegmentError> {
    let w = usize::try_from(width).ok();
    let h = usize::try_from(height).ok();
    let Some((w, h)) = w.zip(h) else {
        return Err(SegmentError::InvalidGrayDimensions { width, height });
    };
    let Some(expected) = w.checked_mul(h) else {
        return Err(SegmentError::InvalidGrayDimensions { width, height });
    };
    if pixels.len() != expected {
        return Err(SegmentError::InvalidGrayBuffer {
            expected,
            got: pixels.len(),
        });
    }
    ::image::GrayImage::from_raw(width, height, pixels.to_vec())
        .ok_or(SegmentError::InvalidGrayDimensions { width, height })
}

/// Convert a mask (or any grid) into an `image::GrayImage` for saving.
pub fn to_image(grid: &GrayImage) -> Result<::image::GrayImage, SegmentError> {
    let (Ok(width), Ok(height)) = (u32::try_from(grid.width), u32::try_from(grid.height)) else {
        return Err(SegmentError::InvalidGrayDimensions {
            width: saturating_u32(grid.width),
            height: saturating_u32(grid.height),
        });
    };
    gray_image_from_slice(width, height, &grid.data)
}

fn saturating_u32(v: usize) -> u32 {
    u32::try_from(v).unwrap_or(u32::MAX)
}

/// Neighborhood feature grid: Gaussian blur with standard deviation `sigma`.
///
/// `sigma <= 0` returns an unblurred copy.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(img), fields(width = img.width(), height = img.height()))
)]
pub fn neighborhood_feature(img: &::image::GrayImage, sigma: f32) -> ::image::GrayImage {
    if !(sigma.is_finite() && sigma > 0.0) {
        return img.clone();
    }
    ::image::imageops::blur(img, sigma)
}

/// Segment an image, computing the feature grid with [`neighborhood_feature`]
/// when the algorithm needs one.
#[cfg_attr(
    feature = "tracing",
    instrument(
        level = "info",
        skip(img, segmenter),
        fields(width = img.width(), height = img.height(), algorithm = %segmenter.kind())
    )
)]
pub fn segment_image(
    img: &::image::GrayImage,
    segmenter: &Segmenter,
    blur_sigma: f32,
) -> Result<SegmentationOutcome, SegmentError> {
    let intensity = gray_view(img);
    if segmenter.kind().needs_feature_grid() {
        let feature = neighborhood_feature(img, blur_sigma);
        segmenter.segment(&intensity, Some(&gray_view(&feature)))
    } else {
        segmenter.segment(&intensity, None)
    }
}

/// Load an image from disk as 8-bit grayscale.
pub fn load_gray(path: impl AsRef<std::path::Path>) -> Result<::image::GrayImage, SegmentError> {
    let path = path.as_ref();
    let io_error = |source| SegmentError::Io {
        path: path.to_path_buf(),
        source,
    };
    let reader = ::image::ImageReader::open(path)
        .map_err(io_error)?
        .with_guessed_format()
        .map_err(io_error)?;
    Ok(reader.decode()?.to_luma8())
}
