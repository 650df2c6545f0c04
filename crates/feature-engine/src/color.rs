//! Color space conversions
//!
//! Both conversions use fixed-point integer arithmetic so the results are
//! exact and platform independent. The conventions are the usual 8-bit ones:
//! gray = 0.299 R + 0.587 G + 0.114 B, hue in [0, 180), saturation and value
//! in [0, 255].

use image::{GrayImage, Luma, Rgb, RgbImage};

const GRAY_SHIFT: u32 = 14;
const GRAY_R: u32 = 4899;
const GRAY_G: u32 = 9617;
const GRAY_B: u32 = 1868;

const HSV_SHIFT: i32 = 12;

/// Luminance of a single RGB pixel
#[inline]
pub fn luma(pixel: &Rgb<u8>) -> u8 {
    let [r, g, b] = pixel.0;
    let y = u32::from(r) * GRAY_R + u32::from(g) * GRAY_G + u32::from(b) * GRAY_B;
    ((y + (1 << (GRAY_SHIFT - 1))) >> GRAY_SHIFT) as u8
}

/// Convert to single-channel gray
pub fn to_gray(image: &RgbImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        Luma([luma(image.get_pixel(x, y))])
    })
}

/// Division tables for the HSV conversion, indexed by `v` (saturation) and
/// `max - min` (hue).
struct HsvTables {
    sdiv: [i32; 256],
    hdiv: [i32; 256],
}

impl HsvTables {
    fn new() -> Self {
        let mut sdiv = [0; 256];
        let mut hdiv = [0; 256];
        for i in 1..256 {
            sdiv[i] = ((255 << HSV_SHIFT) as f64 / i as f64).round() as i32;
            hdiv[i] = ((180 << HSV_SHIFT) as f64 / (6.0 * i as f64)).round() as i32;
        }
        Self { sdiv, hdiv }
    }

    #[inline]
    fn convert(&self, pixel: &Rgb<u8>) -> Rgb<u8> {
        let [r, g, b] = pixel.0.map(i32::from);
        let v = r.max(g).max(b);
        let diff = v - r.min(g).min(b);
        let round = 1 << (HSV_SHIFT - 1);

        let s = (diff * self.sdiv[v as usize] + round) >> HSV_SHIFT;

        let h = if v == r {
            g - b
        } else if v == g {
            b - r + 2 * diff
        } else {
            r - g + 4 * diff
        };
        let mut h = (h * self.hdiv[diff as usize] + round) >> HSV_SHIFT;
        if h < 0 {
            h += 180;
        }

        Rgb([h as u8, s as u8, v as u8])
    }
}

/// Convert to HSV, stored as a 3-channel image (H, S, V)
pub fn to_hsv(image: &RgbImage) -> RgbImage {
    let tables = HsvTables::new();
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        tables.convert(image.get_pixel(x, y))
    })
}
