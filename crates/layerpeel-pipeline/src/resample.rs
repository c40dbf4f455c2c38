//! Dimension normalization between compared image states.
//!
//! Generative edit services are free to return an image at a different
//! size than the one they were given. Before any per-pixel comparison the
//! returned image is resampled to the source image's dimensions; this is a
//! recoverable normalization step, never an error.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::RgbaImage;

/// Resampling filter used when matching dimensions.
///
/// Ordered from fastest/lowest-quality to slowest/highest-quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ResampleFilter {
    /// Nearest-neighbor: fastest, blocky artifacts.
    Nearest,
    /// Bilinear interpolation: fast, decent quality.
    Triangle,
    /// Bicubic (Catmull-Rom): moderate speed, good quality.
    CatmullRom,
    /// Gaussian: moderate speed, smooth output.
    Gaussian,
    /// Lanczos with 3 lobes: slowest, sharpest.
    #[default]
    Lanczos3,
}

impl ResampleFilter {
    /// Convert to the `image` crate's `FilterType`.
    const fn to_image_filter(self) -> image::imageops::FilterType {
        match self {
            Self::Nearest => image::imageops::FilterType::Nearest,
            Self::Triangle => image::imageops::FilterType::Triangle,
            Self::CatmullRom => image::imageops::FilterType::CatmullRom,
            Self::Gaussian => image::imageops::FilterType::Gaussian,
            Self::Lanczos3 => image::imageops::FilterType::Lanczos3,
        }
    }
}

impl fmt::Display for ResampleFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nearest => f.write_str("Nearest"),
            Self::Triangle => f.write_str("Triangle"),
            Self::CatmullRom => f.write_str("CatmullRom"),
            Self::Gaussian => f.write_str("Gaussian"),
            Self::Lanczos3 => f.write_str("Lanczos3"),
        }
    }
}

/// Resize `image` to exactly `width`×`height`, ignoring aspect ratio.
///
/// Returns the input borrowed when it already has the requested size.
#[must_use]
pub fn match_dimensions(
    image: &RgbaImage,
    width: u32,
    height: u32,
    filter: ResampleFilter,
) -> Cow<'_, RgbaImage> {
    if image.dimensions() == (width, height) {
        return Cow::Borrowed(image);
    }

    Cow::Owned(image::imageops::resize(
        image,
        width,
        height,
        filter.to_image_filter(),
    ))
}
