//! Per-pixel structural similarity (SSIM) between two grayscale images.
//!
//! For each pixel, local means, variances and the covariance of the two
//! images are taken over a square window centred on it (clipped at the
//! image border) and combined with the usual SSIM formula:
//!
//! ```text
//!          (2·μa·μb + C1) · (2·σab + C2)
//! SSIM = ─────────────────────────────────────
//!        (μa² + μb² + C1) · (σa² + σb² + C2)
//! ```
//!
//! with `C1 = (0.01·255)²` and `C2 = (0.03·255)²`. Variances use the
//! sample normalization `n / (n - 1)`.
//!
//! # Memory
//!
//! Window sums come from five `u64` summed-area tables (`a`, `b`, `a²`,
//! `b²`, `a·b`). The map is built in bands of [`BAND_ROWS`] output rows,
//! so the tables only ever span `BAND_ROWS + 2·radius` rows of the image.
//! The integer tables keep the sums exact regardless of image size.

use std::ops::Range;

use image::GrayImage;

use crate::types::{BinaryMask, Dimensions, PipelineError};

const C1: f64 = (0.01 * 255.0) * (0.01 * 255.0);
const C2: f64 = (0.03 * 255.0) * (0.03 * 255.0);

/// Output rows computed per pass.
pub const BAND_ROWS: usize = 256;

/// Dense SSIM scores, one per pixel, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityMap {
    width: u32,
    height: u32,
    scores: Vec<f32>,
}

impl SimilarityMap {
    /// Map dimensions.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.width,
            height: self.height,
        }
    }

    /// SSIM score at `(x, y)`, in `[-1, 1]`.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` is out of bounds.
    #[must_use]
    pub fn score(&self, x: u32, y: u32) -> f32 {
        self.scores[y as usize * self.width as usize + x as usize]
    }

    /// Mean SSIM over the whole image (`1.0` for an empty map).
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mean(&self) -> f64 {
        if self.scores.is_empty() {
            return 1.0;
        }
        self.scores.iter().map(|&s| f64::from(s)).sum::<f64>() / self.scores.len() as f64
    }

    /// Mask of pixels whose score is strictly below `threshold`.
    #[must_use]
    pub fn below(&self, threshold: f64) -> BinaryMask {
        BinaryMask::from_fn(self.width, self.height, |x, y| {
            f64::from(self.score(x, y)) < threshold
        })
    }
}

/// Summed-area table over a horizontal strip of rows, with a zero row and
/// column prepended. Row coordinates stay in image space.
struct Integral {
    first_row: usize,
    stride: usize,
    sums: Vec<u64>,
}

impl Integral {
    fn build(width: usize, rows: Range<usize>, value: impl Fn(usize, usize) -> u64) -> Self {
        let stride = width + 1;
        let mut sums = vec![0_u64; stride * (rows.len() + 1)];
        for (i, y) in rows.clone().enumerate() {
            let mut row = 0_u64;
            for x in 0..width {
                row += value(x, y);
                sums[(i + 1) * stride + x + 1] = sums[i * stride + x + 1] + row;
            }
        }
        Self {
            first_row: rows.start,
            stride,
            sums,
        }
    }

    /// Sum over the half-open rectangle `[x0, x1) × [y0, y1)`, which must
    /// lie inside the strip.
    fn window(&self, x0: usize, y0: usize, x1: usize, y1: usize) -> u64 {
        let s = self.stride;
        let (y0, y1) = (y0 - self.first_row, y1 - self.first_row);
        self.sums[y1 * s + x1] + self.sums[y0 * s + x0]
            - self.sums[y0 * s + x1]
            - self.sums[y1 * s + x0]
    }
}

/// Compute the SSIM map of two equally-sized grayscale images.
///
/// `radius` is the half-width of the square window (`radius = 3` gives the
/// customary 7×7 window). A radius of zero degenerates to a pure luminance
/// comparison.
///
/// # Errors
///
/// Returns [`PipelineError::DimensionMismatch`] if the images differ in
/// size.
pub fn ssim_map(a: &GrayImage, b: &GrayImage, radius: u32) -> Result<SimilarityMap, PipelineError> {
    ssim_map_banded(a, b, radius, BAND_ROWS)
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
fn ssim_map_banded(
    a: &GrayImage,
    b: &GrayImage,
    radius: u32,
    band_rows: usize,
) -> Result<SimilarityMap, PipelineError> {
    if a.dimensions() != b.dimensions() {
        return Err(PipelineError::DimensionMismatch {
            expected: Dimensions {
                width: a.width(),
                height: a.height(),
            },
            actual: Dimensions {
                width: b.width(),
                height: b.height(),
            },
        });
    }

    let (width, height) = (a.width() as usize, a.height() as usize);
    let pa = a.as_raw();
    let pb = b.as_raw();
    let at = |raw: &[u8], x: usize, y: usize| u64::from(raw[y * width + x]);

    let r = radius as usize;
    let band_rows = band_rows.max(1);
    let mut scores = Vec::with_capacity(width * height);
    for band_start in (0..height).step_by(band_rows) {
        let band_end = (band_start + band_rows).min(height);
        let rows = band_start.saturating_sub(r)..(band_end + r).min(height);

        let sum_a = Integral::build(width, rows.clone(), |x, y| at(pa, x, y));
        let sum_b = Integral::build(width, rows.clone(), |x, y| at(pb, x, y));
        let sum_aa = Integral::build(width, rows.clone(), |x, y| at(pa, x, y).pow(2));
        let sum_bb = Integral::build(width, rows.clone(), |x, y| at(pb, x, y).pow(2));
        let sum_ab = Integral::build(width, rows, |x, y| at(pa, x, y) * at(pb, x, y));

        for y in band_start..band_end {
            let (y0, y1) = (y.saturating_sub(r), (y + r + 1).min(height));
            for x in 0..width {
                let (x0, x1) = (x.saturating_sub(r), (x + r + 1).min(width));
                let n = ((x1 - x0) * (y1 - y0)) as f64;

                let sa = sum_a.window(x0, y0, x1, y1) as f64;
                let sb = sum_b.window(x0, y0, x1, y1) as f64;
                let mean_a = sa / n;
                let mean_b = sb / n;

                let (var_a, var_b, cov) = if n > 1.0 {
                    let saa = sum_aa.window(x0, y0, x1, y1) as f64;
                    let sbb = sum_bb.window(x0, y0, x1, y1) as f64;
                    let sab = sum_ab.window(x0, y0, x1, y1) as f64;
                    (
                        sa.mul_add(-mean_a, saa) / (n - 1.0),
                        sb.mul_add(-mean_b, sbb) / (n - 1.0),
                        sa.mul_add(-mean_b, sab) / (n - 1.0),
                    )
                } else {
                    (0.0, 0.0, 0.0)
                };

                let numerator = (2.0 * mean_a).mul_add(mean_b, C1) * 2.0_f64.mul_add(cov, C2);
                let denominator =
                    mean_a.mul_add(mean_a, mean_b.mul_add(mean_b, C1)) * (var_a + var_b + C2);
                scores.push((numerator / denominator) as f32);
            }
        }
    }

    Ok(SimilarityMap {
        width: a.width(),
        height: a.height(),
        scores,
    })
}
