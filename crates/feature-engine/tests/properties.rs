//! Property-based tests for the feature encoder.
//!
//! Random small images and bounding boxes; every case runs the full
//! 224x224 pipeline, so the case count is kept low.
//!
//! Run with: cargo test -p feature-engine --test properties

use feature_engine::{layout, BoundingBox, FeatureEncoder, FEATURE_DIMENSION};
use image::{Rgb, RgbImage};
use proptest::prelude::*;

// =============================================================================
// Strategies
// =============================================================================

/// Random RGB image between 1x1 and 48x48
fn arb_image() -> impl Strategy<Value = RgbImage> {
    (1u32..=48, 1u32..=48).prop_flat_map(|(width, height)| {
        prop::collection::vec(any::<[u8; 3]>(), (width * height) as usize).prop_map(move |pixels| {
            RgbImage::from_fn(width, height, |x, y| Rgb(pixels[(y * width + x) as usize]))
        })
    })
}

/// Random image together with a valid bounding box inside it
fn arb_image_with_bbox() -> impl Strategy<Value = (RgbImage, BoundingBox)> {
    arb_image().prop_flat_map(|image| {
        let (w, h) = (i64::from(image.width()), i64::from(image.height()));
        (0..w, 0..h).prop_flat_map(move |(xmin, ymin)| {
            let image = image.clone();
            (xmin + 1..=w, ymin + 1..=h).prop_map(move |(xmax, ymax)| {
                (image.clone(), BoundingBox::new(xmin, ymin, xmax, ymax))
            })
        })
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    #[test]
    fn encode_is_deterministic(image in arb_image()) {
        let encoder = FeatureEncoder::default();
        let a = encoder.encode(&image, None).unwrap();
        let b = encoder.encode(&image, None).unwrap();

        let bits_a: Vec<u64> = a.values().iter().map(|v| v.to_bits()).collect();
        let bits_b: Vec<u64> = b.values().iter().map(|v| v.to_bits()).collect();
        prop_assert_eq!(bits_a, bits_b);
    }

    #[test]
    fn encode_has_fixed_dimension_and_ranges((image, bbox) in arb_image_with_bbox()) {
        let v = FeatureEncoder::default().encode(&image, Some(&bbox)).unwrap();

        prop_assert_eq!(v.len(), FEATURE_DIMENSION);
        prop_assert!(v.values().iter().all(|x| x.is_finite()));
        for range in [layout::RGB_HISTOGRAM, layout::HSV_HISTOGRAM, layout::TEXTURE_HISTOGRAM] {
            prop_assert!(v.slice(range).iter().all(|&c| c >= 0.0));
        }
        prop_assert!((0.0..=1.0).contains(&v.edge_density()));
        prop_assert!(v.contour_area() >= 0.0);
        prop_assert!(v.circularity() >= 0.0);
    }

    #[test]
    fn bbox_encode_equals_crop_then_encode((image, bbox) in arb_image_with_bbox()) {
        let encoder = FeatureEncoder::default();
        let direct = encoder.encode(&image, Some(&bbox)).unwrap();

        let cropped = feature_engine::frame::crop(&image, &bbox).unwrap();
        let indirect = encoder.encode(&cropped, None).unwrap();
        prop_assert_eq!(direct, indirect);
    }

    #[test]
    fn constant_image_has_zero_skewness(rgb in any::<[u8; 3]>(), w in 1u32..=64, h in 1u32..=64) {
        let image = RgbImage::from_pixel(w, h, Rgb(rgb));
        let v = FeatureEncoder::default().encode(&image, None).unwrap();

        let moments = v.slice(layout::COLOR_MOMENTS);
        for channel in moments.chunks(3) {
            prop_assert_eq!(channel[2], 0.0);
        }
        prop_assert_eq!(v.circularity(), 0.0);
        prop_assert_eq!(v.edge_density(), 0.0);
    }
}
