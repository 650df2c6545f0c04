//! Canny-style edge detection
//!
//! Sobel gradients (replicated borders), L1 magnitude, non-maximum suppression
//! quantised to four directions, then double-threshold hysteresis over the
//! 8-neighbourhood.

use image::GrayImage;
use imageproc::gradients::{horizontal_sobel, vertical_sobel};
use rayon::prelude::*;

use crate::FeatureError;

/// tan(22.5°) in Q15
const TG22: i64 = 13573;

const NOT_EDGE: u8 = 0;
const WEAK: u8 = 1;
const STRONG: u8 = 2;

/// Binary edge map
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeMask {
    width: u32,
    height: u32,
    edges: Vec<bool>,
}

impl EdgeMask {
    pub fn from_fn<F>(width: u32, height: u32, mut f: F) -> Self
    where
        F: FnMut(u32, u32) -> bool,
    {
        let mut edges = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                edges.push(f(x, y));
            }
        }
        Self { width, height, edges }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Edge test that treats everything outside the image as background
    #[inline]
    pub fn is_edge(&self, x: i64, y: i64) -> bool {
        x >= 0
            && y >= 0
            && x < i64::from(self.width)
            && y < i64::from(self.height)
            && self.edges[y as usize * self.width as usize + x as usize]
    }

    /// Number of edge pixels
    pub fn count(&self) -> usize {
        self.edges.iter().filter(|&&e| e).count()
    }

    /// Fraction of pixels that are edges, in [0, 1]
    pub fn density(&self) -> f64 {
        let total = self.edges.len();
        if total == 0 {
            return 0.0;
        }
        self.count() as f64 / total as f64
    }
}

/// Double-threshold edge detector
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeDetector {
    low: i64,
    high: i64,
}

impl Default for EdgeDetector {
    fn default() -> Self {
        Self { low: 50, high: 150 }
    }
}

impl EdgeDetector {
    /// Thresholds are on the 8-bit intensity scale; fractional parts are dropped
    pub fn new(low: f32, high: f32) -> Result<Self, FeatureError> {
        if !(low.is_finite() && high.is_finite()) || low < 0.0 || high < low {
            return Err(FeatureError::ExtractionFailure(format!(
                "invalid edge thresholds low={} high={}",
                low, high
            )));
        }
        Ok(Self {
            low: low.floor() as i64,
            high: high.floor() as i64,
        })
    }

    /// Compute the edge mask of a gray image
    pub fn detect(&self, gray: &GrayImage) -> Result<EdgeMask, FeatureError> {
        let (width, height) = (gray.width() as usize, gray.height() as usize);
        if width == 0 || height == 0 {
            return Err(FeatureError::ExtractionFailure("edge detection over an empty image".into()));
        }

        let gx = horizontal_sobel(gray).into_raw();
        let gy = vertical_sobel(gray).into_raw();

        let mut magnitude = vec![0i64; width * height];
        magnitude
            .par_chunks_mut(width)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, m) in row.iter_mut().enumerate() {
                    let i = y * width + x;
                    *m = i64::from(gx[i]).abs() + i64::from(gy[i]).abs();
                }
            });

        let mut classes = vec![NOT_EDGE; width * height];
        classes.par_chunks_mut(width).enumerate().for_each(|(y, row)| {
            for (x, class) in row.iter_mut().enumerate() {
                let i = y * width + x;
                *class = self.classify(&magnitude, width, height, x, y, gx[i], gy[i]);
            }
        });

        let edges = hysteresis(&classes, width, height);

        Ok(EdgeMask {
            width: width as u32,
            height: height as u32,
            edges,
        })
    }

    /// Non-maximum suppression plus thresholding for one pixel
    #[allow(clippy::too_many_arguments)]
    fn classify(
        &self,
        magnitude: &[i64],
        width: usize,
        height: usize,
        x: usize,
        y: usize,
        gx: i16,
        gy: i16,
    ) -> u8 {
        let m = magnitude[y * width + x];
        if m <= self.low {
            return NOT_EDGE;
        }

        // Magnitude with zero padding outside the image
        let mag = |dx: i64, dy: i64| -> i64 {
            let nx = x as i64 + dx;
            let ny = y as i64 + dy;
            if nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64 {
                0
            } else {
                magnitude[ny as usize * width + nx as usize]
            }
        };

        let ax = i64::from(gx).abs();
        let ay = i64::from(gy).abs() << 15;
        let tg22x = ax * TG22;

        let is_max = if ay < tg22x {
            // Horizontal gradient: compare left/right
            m > mag(-1, 0) && m >= mag(1, 0)
        } else {
            let tg67x = tg22x + (ax << 16);
            if ay > tg67x {
                // Vertical gradient: compare up/down
                m > mag(0, -1) && m >= mag(0, 1)
            } else {
                let s = if (i32::from(gx) ^ i32::from(gy)) < 0 { -1 } else { 1 };
                m > mag(-s, -1) && m > mag(s, 1)
            }
        };

        if !is_max {
            NOT_EDGE
        } else if m > self.high {
            STRONG
        } else {
            WEAK
        }
    }
}

/// Keep strong pixels and every weak pixel 8-connected to one
fn hysteresis(classes: &[u8], width: usize, height: usize) -> Vec<bool> {
    let mut edges = vec![false; width * height];
    let mut stack: Vec<usize> = classes
        .iter()
        .enumerate()
        .filter_map(|(i, &c)| (c == STRONG).then_some(i))
        .collect();

    for &i in &stack {
        edges[i] = true;
    }

    while let Some(i) = stack.pop() {
        let (x, y) = ((i % width) as i64, (i / width) as i64);
        for dy in -1..=1 {
            for dx in -1..=1 {
                let (nx, ny) = (x + dx, y + dy);
                if nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64 {
                    continue;
                }
                let n = ny as usize * width + nx as usize;
                if !edges[n] && classes[n] == WEAK {
                    edges[n] = true;
                    stack.push(n);
                }
            }
        }
    }

    edges
}
