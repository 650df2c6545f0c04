//! Local Binary Pattern texture codes

use std::f64::consts::PI;

use image::{GrayImage, ImageBuffer, Luma};
use rayon::prelude::*;

use crate::FeatureError;

/// Per-pixel LBP codes, same size as the source image
pub type LbpImage = ImageBuffer<Luma<u16>, Vec<u16>>;

/// Naive circular LBP.
///
/// Neighbor `k` sits at angle `2πk/n`, at row `i + r·cos` and column
/// `j + r·sin`, both truncated toward zero. Bit `k` is set when the neighbor is
/// at least as bright as the center, and bit 0 is the most significant bit of
/// the code. Pixels closer than `r` to the border get code 0.
#[derive(Debug, Clone)]
pub struct LbpComputer {
    radius: usize,
    /// (row offset, column offset) per neighbor, before truncation
    offsets: Vec<(f64, f64)>,
}

impl LbpComputer {
    /// Largest neighbor count whose codes fit the `u16` output
    pub const MAX_NEIGHBORS: usize = 16;

    pub fn new(radius: usize, neighbors: usize) -> Result<Self, FeatureError> {
        if radius == 0 {
            return Err(FeatureError::ExtractionFailure("LBP radius must be at least 1".into()));
        }
        if neighbors == 0 || neighbors > Self::MAX_NEIGHBORS {
            return Err(FeatureError::ExtractionFailure(format!(
                "LBP neighbor count {} outside 1..={}",
                neighbors,
                Self::MAX_NEIGHBORS
            )));
        }

        Ok(Self::sampled(radius, neighbors))
    }

    fn sampled(radius: usize, neighbors: usize) -> Self {
        let r = radius as f64;
        let offsets = (0..neighbors)
            .map(|k| {
                let angle = 2.0 * PI * k as f64 / neighbors as f64;
                (r * angle.cos(), r * angle.sin())
            })
            .collect();

        Self { radius, offsets }
    }

    /// Compute the code image. Rows are processed in parallel.
    pub fn compute(&self, gray: &GrayImage) -> Result<LbpImage, FeatureError> {
        let (width, height) = (gray.width() as usize, gray.height() as usize);
        if width == 0 || height == 0 {
            return Err(FeatureError::ExtractionFailure("LBP over an empty image".into()));
        }

        let src = gray.as_raw();
        let r = self.radius;
        let mut codes = vec![0u16; width * height];

        codes.par_chunks_mut(width).enumerate().for_each(|(i, row)| {
            if i < r || i + r >= height {
                return;
            }
            for j in r..width.saturating_sub(r) {
                row[j] = self.code_at(src, width, height, i, j);
            }
        });

        LbpImage::from_raw(width as u32, height as u32, codes)
            .ok_or_else(|| FeatureError::ExtractionFailure("LBP buffer size mismatch".into()))
    }

    #[inline]
    fn code_at(&self, src: &[u8], width: usize, height: usize, i: usize, j: usize) -> u16 {
        let center = src[i * width + j];
        let mut code = 0u16;

        for &(di, dj) in &self.offsets {
            let x = (i as f64 + di) as i64;
            let y = (j as f64 + dj) as i64;

            let bit = if (0..height as i64).contains(&x) && (0..width as i64).contains(&y) {
                u16::from(src[x as usize * width + y as usize] >= center)
            } else {
                0
            };
            code = (code << 1) | bit;
        }

        code
    }
}

impl Default for LbpComputer {
    fn default() -> Self {
        Self::sampled(1, 8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gray_from(rows: &[&[u8]]) -> GrayImage {
        let height = rows.len() as u32;
        let width = rows[0].len() as u32;
        GrayImage::from_fn(width, height, |x, y| Luma([rows[y as usize][x as usize]]))
    }

    #[test]
    fn test_flat_image_interior_is_all_ones() {
        let gray = GrayImage::from_pixel(5, 4, Luma([90]));
        let lbp = LbpComputer::default().compute(&gray).unwrap();

        for (x, y, code) in lbp.enumerate_pixels() {
            let border = x == 0 || y == 0 || x == 4 || y == 3;
            let expected = if border { 0 } else { 255 };
            assert_eq!(code[0], expected, "pixel ({}, {})", x, y);
        }
    }

    // With r = 1 the k = 1 sample (angle π/4) truncates back onto the center,
    // so bit 6 is always set for interior pixels.

    #[test]
    fn test_bit_ordering() {
        // Only the pixel directly below the center (k = 0, row + 1) is bright
        let gray = gray_from(&[
            &[0, 0, 0],
            &[0, 5, 0],
            &[0, 9, 0],
        ]);
        let lbp = LbpComputer::default().compute(&gray).unwrap();
        assert_eq!(lbp.get_pixel(1, 1)[0], 0b1100_0000);
    }

    #[test]
    fn test_single_bright_neighbors() {
        // k = 2 (angle π/2) lands on column + 1, same row
        let gray = gray_from(&[
            &[0, 0, 0],
            &[0, 5, 7],
            &[0, 0, 0],
        ]);
        let lbp = LbpComputer::default().compute(&gray).unwrap();
        assert_eq!(lbp.get_pixel(1, 1)[0], 0b0110_0000);
    }

    #[test]
    fn test_center_brighter_than_all_neighbors() {
        let gray = gray_from(&[
            &[1, 1, 1],
            &[1, 200, 1],
            &[1, 1, 1],
        ]);
        let lbp = LbpComputer::default().compute(&gray).unwrap();
        assert_eq!(lbp.get_pixel(1, 1)[0], 0b0100_0000);
    }

    #[test]
    fn test_codes_within_range() {
        let gray = GrayImage::from_fn(16, 12, |x, y| Luma([((x * 37 + y * 91) % 251) as u8]));
        let lbp = LbpComputer::default().compute(&gray).unwrap();
        assert!(lbp.pixels().all(|p| p[0] <= 255));
    }

    #[test]
    fn test_tiny_images() {
        let lbp = LbpComputer::default().compute(&GrayImage::from_pixel(1, 1, Luma([3]))).unwrap();
        assert_eq!(lbp.get_pixel(0, 0)[0], 0);

        let lbp = LbpComputer::default().compute(&GrayImage::from_pixel(2, 7, Luma([3]))).unwrap();
        assert!(lbp.pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn test_default_matches_explicit() {
        let gray = GrayImage::from_fn(9, 9, |x, y| Luma([(x * y) as u8]));
        let a = LbpComputer::default().compute(&gray).unwrap();
        let b = LbpComputer::new(1, 8).unwrap().compute(&gray).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(LbpComputer::new(0, 8).is_err());
        assert!(LbpComputer::new(1, 0).is_err());
        assert!(LbpComputer::new(1, 17).is_err());
    }
}
