//! Crop a mostly-transparent buffer to its occupied rectangle.

use crate::types::{RgbaImage, Sprite};

/// Tight bounding rectangle `(x, y, width, height)` of all pixels with
/// non-zero alpha, or `None` if every pixel is transparent.
#[must_use]
pub fn alpha_bounds(image: &RgbaImage) -> Option<(u32, u32, u32, u32)> {
    let mut min_x = u32::MAX;
    let mut min_y = u32::MAX;
    let mut max_x = 0;
    let mut max_y = 0;
    let mut any = false;

    for (x, y, pixel) in image.enumerate_pixels() {
        if pixel.0[3] != 0 {
            any = true;
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
    }

    any.then(|| (min_x, min_y, max_x - min_x + 1, max_y - min_y + 1))
}

/// Crop `image` to the bounding box of its visible pixels.
///
/// A fully transparent image is a legitimate result (a mask that cleaned
/// to nothing) and comes back untrimmed at the origin with its original
/// dimensions.
#[must_use = "returns the trimmed sprite"]
pub fn trim(image: RgbaImage) -> Sprite {
    let Some((x, y, width, height)) = alpha_bounds(&image) else {
        return Sprite::full_canvas(image);
    };

    if (x, y, width, height) == (0, 0, image.width(), image.height()) {
        return Sprite::full_canvas(image);
    }

    let pixels = image::imageops::crop_imm(&image, x, y, width, height).to_image();
    Sprite { x, y, pixels }
}
