//! Change detection: derive a raw mask of the pixels that belong to the
//! element being extracted.
//!
//! This module defines the [`ChangeDetector`] trait for pluggable detection
//! strategies and the [`DetectionStrategy`] enum for selecting one from
//! configuration.
//!
//! # Strategy pattern
//!
//! The two detectors expect different kinds of "after" image:
//!
//! - [`Threshold`](DetectionStrategy::Threshold) expects a *silhouette*:
//!   the element painted near-black on a near-white field.
//! - [`Similarity`](DetectionStrategy::Similarity) expects a naturally
//!   edited image with the element removed, and marks the pixels that
//!   stopped looking like the source.
//!
//! Each strategy also owns the [`CleanParams`] suited to its noise profile,
//! so callers never branch on the strategy themselves.

use serde::{Deserialize, Serialize};

use crate::clean::CleanParams;
use crate::types::{BinaryMask, PipelineError, RgbaImage};

/// Parameters for silhouette thresholding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdParams {
    /// A pixel belongs to the silhouette when its R, G and B channels are
    /// all strictly below this value.
    pub darkness: u8,
    /// Connected regions smaller than this many pixels are discarded.
    pub min_region_area: u32,
    /// Iterations of morphological closing applied after noise removal.
    pub close_iterations: u8,
}

impl ThresholdParams {
    /// Default darkness threshold.
    pub const DEFAULT_DARKNESS: u8 = 30;
    /// Default minimum region area in pixels.
    pub const DEFAULT_MIN_REGION_AREA: u32 = 100;
    /// Default closing iterations.
    pub const DEFAULT_CLOSE_ITERATIONS: u8 = 2;
}

impl Default for ThresholdParams {
    fn default() -> Self {
        Self {
            darkness: Self::DEFAULT_DARKNESS,
            min_region_area: Self::DEFAULT_MIN_REGION_AREA,
            close_iterations: Self::DEFAULT_CLOSE_ITERATIONS,
        }
    }
}

/// Parameters for structural-similarity differencing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityParams {
    /// Pixels whose SSIM score is below this value are considered changed.
    pub threshold: f64,
    /// Sigma of the Gaussian blur applied to both images first.
    pub blur_sigma: f32,
    /// Half-width of the SSIM window.
    pub window_radius: u32,
    /// Connected regions smaller than this many pixels are discarded.
    pub min_region_area: u32,
    /// Erosion applied before region filtering and restored afterwards.
    pub edge_erosion: u8,
    /// Iterations of morphological closing.
    pub close_iterations: u8,
    /// Iterations of the final smoothing opening.
    pub open_iterations: u8,
}

impl SimilarityParams {
    /// Default SSIM threshold.
    pub const DEFAULT_THRESHOLD: f64 = 0.70;
    /// Default pre-comparison blur sigma.
    pub const DEFAULT_BLUR_SIGMA: f32 = 1.0;
    /// Default window half-width (7×7 window).
    pub const DEFAULT_WINDOW_RADIUS: u32 = 3;
    /// Default minimum region area in pixels.
    pub const DEFAULT_MIN_REGION_AREA: u32 = 200;
    /// Default edge erosion iterations.
    pub const DEFAULT_EDGE_EROSION: u8 = 2;
    /// Default closing iterations.
    pub const DEFAULT_CLOSE_ITERATIONS: u8 = 3;
    /// Default opening iterations.
    pub const DEFAULT_OPEN_ITERATIONS: u8 = 1;
}

impl Default for SimilarityParams {
    fn default() -> Self {
        Self {
            threshold: Self::DEFAULT_THRESHOLD,
            blur_sigma: Self::DEFAULT_BLUR_SIGMA,
            window_radius: Self::DEFAULT_WINDOW_RADIUS,
            min_region_area: Self::DEFAULT_MIN_REGION_AREA,
            edge_erosion: Self::DEFAULT_EDGE_EROSION,
            close_iterations: Self::DEFAULT_CLOSE_ITERATIONS,
            open_iterations: Self::DEFAULT_OPEN_ITERATIONS,
        }
    }
}

/// Selects which change detector to use.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DetectionStrategy {
    /// Hard darkness threshold over a silhouette image.
    Threshold(ThresholdParams),
    /// Perceptual SSIM difference against an edited image.
    Similarity(SimilarityParams),
}

impl Default for DetectionStrategy {
    fn default() -> Self {
        Self::Threshold(ThresholdParams::default())
    }
}

impl DetectionStrategy {
    /// The threshold strategy with default parameters.
    #[must_use]
    pub fn threshold() -> Self {
        Self::Threshold(ThresholdParams::default())
    }

    /// The similarity strategy with default parameters.
    #[must_use]
    pub fn similarity() -> Self {
        Self::Similarity(SimilarityParams::default())
    }

    /// Whether this strategy compares against a silhouette (and therefore
    /// needs a separate isolate step before removal).
    #[must_use]
    pub const fn uses_silhouette(&self) -> bool {
        matches!(self, Self::Threshold(_))
    }

    /// Short name for logs and reports.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Threshold(_) => "threshold",
            Self::Similarity(_) => "similarity",
        }
    }

    /// Check parameter ranges.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] for an SSIM threshold
    /// outside `(-1, 1]`, a negative blur sigma, or a zero minimum region
    /// area.
    pub fn validate(&self) -> Result<(), PipelineError> {
        match self {
            Self::Threshold(p) => {
                if p.min_region_area == 0 {
                    return Err(PipelineError::InvalidConfig(
                        "min_region_area must be at least 1".to_string(),
                    ));
                }
            }
            Self::Similarity(p) => {
                if !(p.threshold > -1.0 && p.threshold <= 1.0) {
                    return Err(PipelineError::InvalidConfig(format!(
                        "similarity threshold must be in (-1, 1], got {}",
                        p.threshold
                    )));
                }
                if p.blur_sigma.is_nan() || p.blur_sigma < 0.0 {
                    return Err(PipelineError::InvalidConfig(format!(
                        "blur_sigma must be non-negative, got {}",
                        p.blur_sigma
                    )));
                }
                if p.min_region_area == 0 {
                    return Err(PipelineError::InvalidConfig(
                        "min_region_area must be at least 1".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Trait for change detection strategies.
///
/// Input: the source image and a comparison image of the **same**
/// dimensions (callers resample first).
/// Output: the raw, uncleaned mask plus the cleaning parameters suited to
/// this detector.
pub trait ChangeDetector {
    /// Detect the pixels belonging to the element.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::DimensionMismatch`] if the images differ in
    /// size.
    fn detect(&self, before: &RgbaImage, after: &RgbaImage) -> Result<BinaryMask, PipelineError>;

    /// Cleaning parameters matching this detector's noise profile.
    fn clean_params(&self) -> CleanParams;
}

impl ChangeDetector for DetectionStrategy {
    fn detect(&self, before: &RgbaImage, after: &RgbaImage) -> Result<BinaryMask, PipelineError> {
        if before.dimensions() != after.dimensions() {
            return Err(PipelineError::DimensionMismatch {
                expected: crate::types::Dimensions::of(before),
                actual: crate::types::Dimensions::of(after),
            });
        }
        match *self {
            Self::Threshold(p) => Ok(dark_pixels(after, p.darkness)),
            Self::Similarity(p) => {
                let a = crate::blur::blurred_luma(before, p.blur_sigma);
                let b = crate::blur::blurred_luma(after, p.blur_sigma);
                let map = crate::similarity::ssim_map(&a, &b, p.window_radius)?;
                Ok(map.below(p.threshold))
            }
        }
    }

    fn clean_params(&self) -> CleanParams {
        match *self {
            Self::Threshold(p) => CleanParams {
                edge_erosion: 0,
                min_region_area: p.min_region_area,
                close_iterations: p.close_iterations,
                open_iterations: 0,
            },
            Self::Similarity(p) => CleanParams {
                edge_erosion: p.edge_erosion,
                min_region_area: p.min_region_area,
                close_iterations: p.close_iterations,
                open_iterations: p.open_iterations,
            },
        }
    }
}

/// Mask of pixels whose R, G and B channels are all below `darkness`.
///
/// Alpha is ignored: silhouettes come back from edit services fully
/// opaque, and a transparent black pixel still marks the shape.
#[must_use]
pub fn dark_pixels(image: &RgbaImage, darkness: u8) -> BinaryMask {
    BinaryMask::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b, _] = image.get_pixel(x, y).0;
        r < darkness && g < darkness && b < darkness
    })
}
