//! Morphological cleanup of raw change masks.
//!
//! Raw masks from either detector carry speckle noise (stray dark pixels in
//! a silhouette, compression ringing in an SSIM map) and small holes. The
//! cleaner removes the former and fills the latter without ever making an
//! element vanish:
//!
//! 1. Optional erosion to detach artifact fringes from real regions.
//! 2. 8-connected component labelling; regions below the minimum area are
//!    dropped. If that would drop everything, the floor is halved once.
//! 3. If every region is still dropped, the raw input mask is returned
//!    untouched.
//! 4. Morphological closing to fill small holes.
//! 5. Optional dilation restoring the eroded margin, then a light opening
//!    to smooth jagged edges.
//!
//! All neighborhoods use the Chebyshev (`L∞`) norm, so `k` iterations of a
//! 3×3 structuring element are a single `imageproc` call with radius `k`.
//!
//! `imageproc` never treats pixels outside the raster as background, so a
//! closing next to the canvas edge would fill the gap out to the border.
//! The mask is framed in a zero margin wider than any pass can reach and
//! cropped back at the end.

use image::{GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::region_labelling::{Connectivity, connected_components};
use serde::{Deserialize, Serialize};

use crate::types::BinaryMask;

/// Parameters for [`clean`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanParams {
    /// Erosion iterations before region filtering, restored by dilation
    /// afterwards. Zero disables both.
    pub edge_erosion: u8,
    /// Regions with fewer pixels than this are treated as noise.
    pub min_region_area: u32,
    /// Closing iterations (hole filling).
    pub close_iterations: u8,
    /// Opening iterations applied last (edge smoothing).
    pub open_iterations: u8,
}

/// What [`clean_with_report`] did to a mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanReport {
    /// Connected regions found after the optional erosion.
    pub regions_found: usize,
    /// Regions that survived the area filter.
    pub regions_kept: usize,
    /// The area floor that was finally applied.
    pub floor_used: u32,
    /// Whether the raw input mask was returned because filtering would
    /// have erased every region.
    pub fell_back: bool,
}

/// Clean a raw mask. See the [module documentation](self) for the steps.
#[must_use = "returns the cleaned mask"]
pub fn clean(mask: &BinaryMask, params: &CleanParams) -> BinaryMask {
    clean_with_report(mask, params).0
}

/// Clean a raw mask and report what happened.
#[must_use = "returns the cleaned mask and its report"]
pub fn clean_with_report(mask: &BinaryMask, params: &CleanParams) -> (BinaryMask, CleanReport) {
    let mut report = CleanReport {
        regions_found: 0,
        regions_kept: 0,
        floor_used: params.min_region_area,
        fell_back: false,
    };

    if mask.is_empty() {
        return (mask.clone(), report);
    }

    let margin = frame_margin(params);
    let framed = frame(mask.as_gray(), margin);
    let eroded = if params.edge_erosion > 0 {
        imageproc::morphology::erode(&framed, Norm::LInf, params.edge_erosion)
    } else {
        framed
    };

    let labels = connected_components(&eroded, Connectivity::Eight, Luma([0_u8]));
    let areas = region_areas(&labels);
    report.regions_found = areas.len().saturating_sub(1);

    let mut kept = keep_regions(&labels, &areas, params.min_region_area);
    if kept.is_none() {
        let half = (params.min_region_area / 2).max(1);
        report.floor_used = half;
        kept = keep_regions(&labels, &areas, half);
    }

    let Some((filtered, regions_kept)) = kept else {
        report.fell_back = true;
        return (mask.clone(), report);
    };
    report.regions_kept = regions_kept;

    let mut out = filtered;
    if params.close_iterations > 0 {
        out = imageproc::morphology::close(&out, Norm::LInf, params.close_iterations);
    }
    if params.edge_erosion > 0 {
        out = imageproc::morphology::dilate(&out, Norm::LInf, params.edge_erosion);
    }
    if params.open_iterations > 0 {
        out = imageproc::morphology::open(&out, Norm::LInf, params.open_iterations);
    }

    let cropped = image::imageops::crop_imm(&out, margin, margin, mask.width(), mask.height());
    (BinaryMask::from_gray(&cropped.to_image()), report)
}

/// Zero margin that keeps every pass clear of the raster border.
fn frame_margin(params: &CleanParams) -> u32 {
    u32::from(params.edge_erosion)
        + u32::from(params.close_iterations)
        + u32::from(params.open_iterations)
        + 1
}

/// Copy of `gray` centred in a zero frame `margin` pixels wide.
fn frame(gray: &GrayImage, margin: u32) -> GrayImage {
    let mut framed = GrayImage::new(gray.width() + 2 * margin, gray.height() + 2 * margin);
    image::imageops::replace(&mut framed, gray, i64::from(margin), i64::from(margin));
    framed
}

/// Pixel count per label; index 0 is the background.
fn region_areas(labels: &image::ImageBuffer<Luma<u32>, Vec<u32>>) -> Vec<u64> {
    let mut areas: Vec<u64> = vec![0];
    for p in labels.pixels() {
        let label = p.0[0] as usize;
        if label >= areas.len() {
            areas.resize(label + 1, 0);
        }
        areas[label] += 1;
    }
    areas
}

/// Raster of the regions with at least `floor` pixels, and how many there
/// were. `None` when no region qualifies.
fn keep_regions(
    labels: &image::ImageBuffer<Luma<u32>, Vec<u32>>,
    areas: &[u64],
    floor: u32,
) -> Option<(GrayImage, usize)> {
    let keep: Vec<bool> = areas
        .iter()
        .enumerate()
        .map(|(label, &area)| label != 0 && area >= u64::from(floor))
        .collect();
    let count = keep.iter().filter(|&&k| k).count();
    if count == 0 {
        return None;
    }

    let raster = GrayImage::from_fn(labels.width(), labels.height(), |x, y| {
        let label = labels.get_pixel(x, y).0[0] as usize;
        Luma([if keep[label] { BinaryMask::SET } else { 0 }])
    });
    Some((raster, count))
}
