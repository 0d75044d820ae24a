use fidelity_core::compare::{Comparator, VisualComparator};
use fidelity_core::{Modality, SiteSnapshot, VisualConfig};
use image::{ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

fn png(image: &RgbImage) -> Vec<u8> {
    let mut bytes = Cursor::new(Vec::new());
    image.write_to(&mut bytes, ImageFormat::Png).unwrap();
    bytes.into_inner()
}

fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 4 % 256) as u8, (y * 3 % 256) as u8, ((x + y) % 256) as u8])
    })
}

fn comparator(width: u32) -> VisualComparator {
    VisualComparator::new(&VisualConfig {
        canvas_width: width,
    })
}

#[test]
fn test_identical_screenshots_score_one() {
    let bytes = png(&gradient(48, 32));
    let result = comparator(64).compare_images(&bytes, &bytes);

    assert!((result.score() - 1.0).abs() < 1e-9);
    assert!((result.detail_f64("ssim").unwrap() - 1.0).abs() < 1e-9);
    assert_eq!(result.detail_f64("mse"), Some(0.0));
    assert_eq!(result.detail_f64("color_similarity"), Some(1.0));
    assert!(result.error().is_none());
}

#[test]
fn test_canvas_uses_configured_width_and_taller_height() {
    let short = png(&gradient(40, 20));
    let tall = png(&gradient(40, 50));
    let result = comparator(32).compare_images(&short, &tall);

    assert_eq!(result.detail_f64("canvas_width"), Some(32.0));
    assert_eq!(result.detail_f64("canvas_height"), Some(50.0));
    assert_eq!(
        result.detail("source_dimensions").and_then(|v| v.as_str()),
        Some("40x20")
    );
}

#[test]
fn test_different_screenshots_score_lower() {
    let white = png(&RgbImage::from_pixel(40, 40, Rgb([255, 255, 255])));
    let black = png(&RgbImage::from_pixel(40, 40, Rgb([0, 0, 0])));
    let result = comparator(40).compare_images(&white, &black);

    assert!(result.score() < 0.2, "score was {}", result.score());
    assert_eq!(result.detail_f64("normalized_mse"), Some(0.0));
}

#[test]
fn test_visual_is_symmetric() {
    let a = png(&gradient(30, 30));
    let b = png(&RgbImage::from_fn(30, 45, |x, y| {
        Rgb([(y * 5 % 256) as u8, (x * 2 % 256) as u8, 128])
    }));
    let comparator = comparator(30);
    assert_eq!(
        comparator.compare_images(&a, &b).score(),
        comparator.compare_images(&b, &a).score()
    );
}

#[test]
fn test_undecodable_target_scores_zero_with_error() {
    let good = png(&gradient(16, 16));
    let result = comparator(16).compare_images(&good, b"definitely not an image");

    assert_eq!(result.score(), 0.0);
    let error = result.error().expect("error detail");
    assert!(error.contains("target"), "error was {}", error);
}

#[test]
fn test_empty_source_bytes_score_zero_with_error() {
    let good = png(&gradient(16, 16));
    let result = comparator(16).compare_images(&[], &good);
    assert_eq!(result.score(), 0.0);
    assert!(result.error().unwrap().contains("source"));
}

#[test]
fn test_tiny_screenshots_are_scored() {
    let a = png(&RgbImage::from_pixel(2, 3, Rgb([10, 20, 30])));
    let result = comparator(3).compare_images(&a, &a);
    assert!((result.score() - 1.0).abs() < 1e-9);
}

#[test]
fn test_compare_reads_snapshot_screenshots() {
    let bytes = png(&gradient(20, 20));
    let source = SiteSnapshot::new(bytes.clone(), vec![]);
    let target = SiteSnapshot::new(bytes, vec![]);
    let comparator = comparator(20);

    assert_eq!(comparator.modality(), Modality::Visual);
    assert!((comparator.compare(&source, &target).score() - 1.0).abs() < 1e-9);
}
