//! Integration test: encoded images through decode -> extract -> encode.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use layerpeel_pipeline::decode::{decode_rgba, encode_png};
use layerpeel_pipeline::{DetectionStrategy, DiffConfig, RgbaImage, extract};

fn square_on_white(size: u32, x0: u32, y0: u32, side: u32) -> RgbaImage {
    RgbaImage::from_fn(size, size, |x, y| {
        if (x0..x0 + side).contains(&x) && (y0..y0 + side).contains(&y) {
            image::Rgba([0, 0, 0, 255])
        } else {
            image::Rgba([255, 255, 255, 255])
        }
    })
}

#[test]
fn square_silhouette_round_trips_through_png() {
    let canvas = square_on_white(100, 10, 10, 20);
    let before = decode_rgba(&encode_png(&canvas).unwrap()).unwrap();
    let after = decode_rgba(&encode_png(&canvas).unwrap()).unwrap();

    let result = extract(&before, &after, &DiffConfig::default()).expect("extract should succeed");
    let sprite = result.sprite;
    assert_eq!(
        (sprite.x, sprite.y, sprite.width(), sprite.height()),
        (10, 10, 20, 20)
    );
    assert!(sprite.pixels.pixels().all(|p| p.0[3] == 255));

    let png = encode_png(&sprite.pixels).unwrap();
    let reloaded = decode_rgba(&png).unwrap();
    assert_eq!(reloaded, sprite.pixels);
}

#[test]
fn square_near_the_edge_keeps_its_exact_bounds() {
    let canvas = square_on_white(100, 2, 10, 20);
    let result = extract(&canvas, &canvas, &DiffConfig::default()).unwrap();
    let sprite = result.sprite;
    assert_eq!(
        (sprite.x, sprite.y, sprite.width(), sprite.height()),
        (2, 10, 20, 20)
    );
    assert_eq!(result.mask.count(), 400);
    assert!(sprite.pixels.pixels().all(|p| p.0[..3] == [0, 0, 0]));
}

#[test]
fn speckled_silhouette_still_yields_one_tight_region() {
    let mut silhouette = square_on_white(120, 40, 30, 25);
    // Stray dark pixels an edit service might leave behind.
    for (x, y) in [(3, 3), (110, 8), (5, 100), (100, 110)] {
        silhouette.put_pixel(x, y, image::Rgba([5, 5, 5, 255]));
    }
    let before = RgbaImage::from_pixel(120, 120, image::Rgba([240, 200, 10, 255]));

    let result = extract(&before, &silhouette, &DiffConfig::default()).unwrap();
    assert_eq!(result.cleaning.regions_found, 5);
    assert_eq!(result.cleaning.regions_kept, 1);
    assert_eq!(
        (
            result.sprite.x,
            result.sprite.y,
            result.sprite.width(),
            result.sprite.height()
        ),
        (40, 30, 25, 25)
    );
}

#[test]
fn similarity_on_identical_solid_images_is_blank_not_error() {
    let img = RgbaImage::from_pixel(50, 50, image::Rgba([77, 77, 77, 255]));
    let config = DiffConfig {
        strategy: DetectionStrategy::similarity(),
        ..DiffConfig::default()
    };
    let result = extract(&img, &img, &config).unwrap();
    assert!(result.sprite.is_blank());
}
