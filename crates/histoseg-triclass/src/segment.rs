use histoseg_core::{GrayImage, GrayImageView, MAX_INTENSITY};
use serde::{Deserialize, Serialize};

/// Indecision band `[lower, upper]` around a threshold.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ThresholdBand {
    pub threshold: f64,
    pub lower: f64,
    pub upper: f64,
}

impl ThresholdBand {
    /// `θ·(1 − g)` and `θ·(1 + g)` clamped to `[0, 255]`.
    ///
    /// A collapsed band is widened to `upper = lower + 1` so the two cuts
    /// never coincide, except at the top of the scale.
    pub fn around(threshold: f64, gap_factor: f64) -> Self {
        let lower = (threshold * (1.0 - gap_factor)).clamp(0.0, MAX_INTENSITY);
        let mut upper = (threshold * (1.0 + gap_factor)).clamp(0.0, MAX_INTENSITY);
        if upper <= lower {
            upper = (lower + 1.0).min(MAX_INTENSITY);
        }
        Self {
            threshold,
            lower,
            upper,
        }
    }

    #[inline]
    pub fn classify(&self, value: u8) -> PixelClass {
        let v = value as f64;
        if v > self.upper {
            PixelClass::Foreground
        } else if v < self.lower {
            PixelClass::Background
        } else {
            PixelClass::Undetermined
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelClass {
    Foreground,
    Background,
    /// Inside the band; revisited on the next iteration.
    Undetermined,
}

/// One classification pass over the active pixels.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Partition {
    /// Linear indices of new foreground pixels.
    pub foreground: Vec<usize>,
    pub background_count: usize,
    /// Linear indices of pixels that stay active.
    pub undetermined: Vec<usize>,
}

impl Partition {
    pub fn foreground_count(&self) -> usize {
        self.foreground.len()
    }

    pub fn tbd_count(&self) -> usize {
        self.undetermined.len()
    }
}

/// Pixels still waiting for a class.
///
/// `region` carries the original intensity at active pixels and 0
/// elsewhere; `pixels` lists the active indices. Zero-valued pixels are
/// never active: they are background from the start.
#[derive(Clone, Debug, PartialEq)]
pub struct ActiveRegion {
    region: GrayImage,
    pixels: Vec<usize>,
}

impl ActiveRegion {
    /// Every nonzero pixel of `image` is active.
    pub fn from_nonzero(image: &GrayImageView<'_>) -> Self {
        Self {
            region: image.to_owned_image(),
            pixels: image
                .data
                .iter()
                .enumerate()
                .filter(|(_, &v)| v > 0)
                .map(|(idx, _)| idx)
                .collect(),
        }
    }

    #[inline]
    pub fn view(&self) -> GrayImageView<'_> {
        self.region.view()
    }

    #[inline]
    pub fn pixels(&self) -> &[usize] {
        &self.pixels
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Wipe the region and keep only `undetermined`, restoring their
    /// original values from `image`. The active set never grows.
    pub fn shrink_to(&mut self, image: &GrayImageView<'_>, undetermined: Vec<usize>) {
        debug_assert!(undetermined.len() <= self.pixels.len());
        self.region.data.fill(0);
        for &idx in &undetermined {
            self.region.data[idx] = image.data[idx];
        }
        self.pixels = undetermined;
    }
}

/// Splits active pixels into foreground, background and TBD.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TriclassSegmenter {
    gap_factor: f64,
}

impl TriclassSegmenter {
    pub fn new(gap_factor: f64) -> Self {
        Self { gap_factor }
    }

    pub fn gap_factor(&self) -> f64 {
        self.gap_factor
    }

    pub fn band(&self, threshold: f64) -> ThresholdBand {
        ThresholdBand::around(threshold, self.gap_factor)
    }

    /// Classify the active pixels of `image` against `band`.
    pub fn classify(
        &self,
        band: &ThresholdBand,
        image: &GrayImageView<'_>,
        active: &ActiveRegion,
    ) -> Partition {
        let mut out = Partition::default();
        for &idx in active.pixels() {
            match band.classify(image.data[idx]) {
                PixelClass::Foreground => out.foreground.push(idx),
                PixelClass::Background => out.background_count += 1,
                PixelClass::Undetermined => out.undetermined.push(idx),
            }
        }
        out
    }
}
