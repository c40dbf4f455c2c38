//! Diff extraction: carve one element out of an image state.
//!
//! Given the current image (`before`) and a comparison image (`after`,
//! either a silhouette or an edited state), [`extract`]:
//!
//! 1. resamples `after` to `before`'s dimensions if they differ,
//! 2. detects the raw mask with the configured [`ChangeDetector`],
//! 3. cleans it with [`clean`](crate::clean),
//! 4. copies the selected pixels of `before` into a transparent buffer,
//! 5. trims the buffer to its visible rectangle.
//!
//! The pixels always come from `before`: the comparison image only decides
//! *which* pixels belong to the element.

use crate::clean::{CleanReport, clean_with_report};
use crate::detect::ChangeDetector;
use crate::types::{BinaryMask, DiffConfig, PipelineError, RgbaImage, Sprite};

/// Result of a diff extraction, with the statistics that explain it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    /// The positioned, trimmed element pixels.
    pub sprite: Sprite,
    /// The cleaned mask that selected the pixels.
    pub mask: BinaryMask,
    /// Set pixels in the raw detector mask.
    pub raw_pixel_count: u64,
    /// Whether `after` had to be resampled to match `before`.
    pub resampled: bool,
    /// What the mask cleaner did.
    pub cleaning: CleanReport,
}

/// Extract the element distinguishing `before` from `after`.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyImage`] if either input has no pixels.
/// Dimension differences are not an error; `after` is resampled.
pub fn extract(
    before: &RgbaImage,
    after: &RgbaImage,
    config: &DiffConfig,
) -> Result<Extraction, PipelineError> {
    for image in [before, after] {
        if image.width() == 0 || image.height() == 0 {
            return Err(PipelineError::EmptyImage {
                width: image.width(),
                height: image.height(),
            });
        }
    }

    let (width, height) = before.dimensions();
    let resampled = after.dimensions() != (width, height);
    let after = crate::resample::match_dimensions(after, width, height, config.resample);

    let raw = config.strategy.detect(before, &after)?;
    let raw_pixel_count = raw.count();
    let (mask, cleaning) = clean_with_report(&raw, &config.strategy.clean_params());

    let sprite = crate::trim::trim(carve(before, &mask));

    Ok(Extraction {
        sprite,
        mask,
        raw_pixel_count,
        resampled,
        cleaning,
    })
}

/// Copy the pixels of `image` selected by `mask`; everything else becomes
/// fully transparent black.
///
/// `mask` must have the same dimensions as `image`.
#[must_use = "returns the carved image"]
pub fn carve(image: &RgbaImage, mask: &BinaryMask) -> RgbaImage {
    debug_assert_eq!(image.dimensions(), (mask.width(), mask.height()));
    RgbaImage::from_fn(image.width(), image.height(), |x, y| {
        if mask.get(x, y) {
            *image.get_pixel(x, y)
        } else {
            image::Rgba([0, 0, 0, 0])
        }
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::detect::DetectionStrategy;

    fn canvas_with_square(w: u32, h: u32, x0: u32, y0: u32, side: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, y| {
            if (x0..x0 + side).contains(&x) && (y0..y0 + side).contains(&y) {
                image::Rgba([0, 0, 0, 255])
            } else {
                image::Rgba([255, 255, 255, 255])
            }
        })
    }

    #[test]
    fn carve_clears_unselected_pixels() {
        let img = RgbaImage::from_pixel(4, 4, image::Rgba([9, 8, 7, 255]));
        let mask = BinaryMask::from_fn(4, 4, |x, y| x == y);
        let carved = carve(&img, &mask);
        assert_eq!(carved.get_pixel(2, 2).0, [9, 8, 7, 255]);
        assert_eq!(carved.get_pixel(1, 2).0, [0, 0, 0, 0]);
    }

    #[test]
    fn threshold_square_against_itself() {
        let img = canvas_with_square(100, 100, 10, 10, 20);
        let result = extract(&img, &img, &DiffConfig::default()).unwrap();
        let sprite = &result.sprite;
        assert_eq!((sprite.x, sprite.y), (10, 10));
        assert_eq!((sprite.width(), sprite.height()), (20, 20));
        assert!(sprite.pixels.pixels().all(|p| p.0[3] == 255));
        assert!(!result.resampled);
        assert_eq!(result.raw_pixel_count, 400);
    }

    #[test]
    fn pixels_come_from_before_not_silhouette() {
        let before = RgbaImage::from_pixel(60, 60, image::Rgba([10, 200, 90, 255]));
        let silhouette = canvas_with_square(60, 60, 20, 20, 15);
        let result = extract(&before, &silhouette, &DiffConfig::default()).unwrap();
        assert_eq!((result.sprite.x, result.sprite.y), (20, 20));
        assert!(
            result
                .sprite
                .pixels
                .pixels()
                .all(|p| p.0 == [10, 200, 90, 255])
        );
    }

    #[test]
    fn silhouette_at_half_size_is_resampled() {
        let before = RgbaImage::from_pixel(120, 120, image::Rgba([50, 60, 70, 255]));
        let silhouette = canvas_with_square(60, 60, 15, 15, 30);
        let result = extract(&before, &silhouette, &DiffConfig::default()).unwrap();
        assert!(result.resampled);
        assert_eq!(result.mask.dimensions(), crate::types::Dimensions::of(&before));
        // The square maps to roughly (30..90) on the larger canvas.
        let s = &result.sprite;
        assert!((28..=32).contains(&s.x), "x = {}", s.x);
        assert!((56..=64).contains(&s.width()), "width = {}", s.width());
    }

    #[test]
    fn blank_silhouette_yields_untrimmed_transparent_result() {
        let before = canvas_with_square(40, 40, 5, 5, 10);
        let blank = RgbaImage::from_pixel(40, 40, image::Rgba([255, 255, 255, 255]));
        let result = extract(&before, &blank, &DiffConfig::default()).unwrap();
        assert!(result.sprite.is_blank());
        assert_eq!((result.sprite.x, result.sprite.y), (0, 0));
        assert_eq!(result.sprite.width(), 40);
    }

    #[test]
    fn similarity_identical_images_yield_blank_result() {
        let img = RgbaImage::from_pixel(50, 50, image::Rgba([120, 30, 220, 255]));
        let config = DiffConfig {
            strategy: DetectionStrategy::similarity(),
            ..DiffConfig::default()
        };
        let result = extract(&img, &img, &config).unwrap();
        assert!(result.sprite.is_blank());
        assert_eq!(result.raw_pixel_count, 0);
    }

    #[test]
    fn similarity_removed_element_is_extracted() {
        let background = image::Rgba([235, 230, 220, 255]);
        let before = RgbaImage::from_fn(80, 80, |x, y| {
            if (20..50).contains(&x) && (25..55).contains(&y) {
                image::Rgba([30, 60, 160, 255])
            } else {
                background
            }
        });
        let after = RgbaImage::from_pixel(80, 80, background);
        let config = DiffConfig {
            strategy: DetectionStrategy::similarity(),
            ..DiffConfig::default()
        };
        let result = extract(&before, &after, &config).unwrap();
        let s = &result.sprite;
        assert!(!s.is_blank());
        // The extracted rectangle must cover the removed block and stay
        // near it.
        assert!(s.x <= 20 && s.y <= 25, "origin ({}, {})", s.x, s.y);
        assert!(s.x + s.width() >= 50 && s.y + s.height() >= 55);
        assert!(s.x >= 10 && s.y >= 15);
        assert!(s.x + s.width() <= 60 && s.y + s.height() <= 65);
    }

    #[test]
    fn empty_inputs_are_rejected() {
        let empty = RgbaImage::new(0, 0);
        let img = RgbaImage::new(4, 4);
        assert!(matches!(
            extract(&empty, &img, &DiffConfig::default()),
            Err(PipelineError::EmptyImage { .. })
        ));
        assert!(matches!(
            extract(&img, &empty, &DiffConfig::default()),
            Err(PipelineError::EmptyImage { .. })
        ));
    }
}
