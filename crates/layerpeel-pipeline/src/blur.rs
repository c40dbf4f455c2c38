//! Gaussian blur for suppressing compression artifacts before comparison.
//!
//! Wraps [`imageproc::filter::gaussian_blur_f32`]. Generative edit services
//! re-encode the whole image, so even untouched regions come back with
//! slightly shifted pixel values. A mild blur on both sides of a
//! comparison keeps that noise out of the similarity map.

use image::GrayImage;

use crate::types::RgbaImage;

/// Apply Gaussian blur to a grayscale image.
///
/// Non-positive sigma values return the image unchanged, since
/// `imageproc`'s underlying function panics on `sigma <= 0.0`.
#[must_use = "returns the blurred image"]
pub fn gaussian_blur(image: &GrayImage, sigma: f32) -> GrayImage {
    if sigma <= 0.0 {
        return image.clone();
    }

    imageproc::filter::gaussian_blur_f32(image, sigma)
}

/// Convert to luma and blur in one step.
///
/// Uses the standard `0.299*R + 0.587*G + 0.114*B` weighting provided by
/// the `image` crate.
#[must_use = "returns the blurred luma image"]
pub fn blurred_luma(image: &RgbaImage, sigma: f32) -> GrayImage {
    gaussian_blur(&image::imageops::grayscale(image), sigma)
}
