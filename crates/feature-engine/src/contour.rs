//! Contour extraction and shape metrics over an edge mask

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::edges::EdgeMask;

/// 8-neighbourhood offsets, counter-clockwise on screen starting east
const DIRECTIONS: [(i64, i64); 8] = [
    (1, 0),
    (1, -1),
    (0, -1),
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

const WEST: usize = 4;

/// Closed outer boundary of one connected edge region
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contour {
    points: Vec<(i64, i64)>,
}

impl Contour {
    pub fn points(&self) -> &[(i64, i64)] {
        &self.points
    }

    /// Enclosed area of the boundary polygon (shoelace formula)
    pub fn area(&self) -> f64 {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }
        let twice: i64 = (0..n)
            .map(|i| {
                let (x0, y0) = self.points[i];
                let (x1, y1) = self.points[(i + 1) % n];
                x0 * y1 - x1 * y0
            })
            .sum();
        twice.abs() as f64 / 2.0
    }

    /// Length of the closed boundary polyline
    pub fn perimeter(&self) -> f64 {
        let n = self.points.len();
        if n < 2 {
            return 0.0;
        }
        (0..n)
            .map(|i| {
                let (x0, y0) = self.points[i];
                let (x1, y1) = self.points[(i + 1) % n];
                (((x1 - x0).pow(2) + (y1 - y0).pow(2)) as f64).sqrt()
            })
            .sum()
    }
}

/// Shape of the largest contour
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ShapeMetrics {
    pub area: f64,
    pub perimeter: f64,
    /// 4π·area / perimeter², 0 when the perimeter is 0. Not clamped to 1.
    pub circularity: f64,
}

impl ShapeMetrics {
    pub fn of(contour: &Contour) -> Self {
        let area = contour.area();
        let perimeter = contour.perimeter();
        let circularity = if perimeter > 0.0 {
            4.0 * PI * area / (perimeter * perimeter)
        } else {
            0.0
        };
        Self { area, perimeter, circularity }
    }

    /// Metrics of the contour with the largest area; all zeros without contours.
    /// Ties keep the first contour in raster order.
    pub fn largest(mask: &EdgeMask) -> Self {
        let mut best: Option<Self> = None;
        for contour in find_external_contours(mask) {
            let metrics = Self::of(&contour);
            if best.map_or(true, |b| metrics.area > b.area) {
                best = Some(metrics);
            }
        }
        best.unwrap_or_default()
    }
}

/// Outer boundaries of every 8-connected edge region, in raster order of their
/// first pixel.
pub fn find_external_contours(mask: &EdgeMask) -> Vec<Contour> {
    let (width, height) = (mask.width() as usize, mask.height() as usize);
    let mut labelled = vec![false; width * height];
    let mut contours = Vec::new();

    for y in 0..height {
        for x in 0..width {
            let start = (x as i64, y as i64);
            if labelled[y * width + x] || !mask.is_edge(start.0, start.1) {
                continue;
            }
            contours.push(trace_border(mask, start));
            label_region(mask, start, &mut labelled);
        }
    }

    contours
}

/// Follow the outer border of the region whose first raster pixel is `start`.
/// The pixel west of `start` is background by construction.
fn trace_border(mask: &EdgeMask, start: (i64, i64)) -> Contour {
    let step = |p: (i64, i64), d: usize| (p.0 + DIRECTIONS[d].0, p.1 + DIRECTIONS[d].1);
    let is_edge = |p: (i64, i64)| mask.is_edge(p.0, p.1);

    // Clockwise search from the west neighbour for the first border pixel
    let first = (0..8)
        .map(|t| (WEST + 8 - t) % 8)
        .map(|d| step(start, d))
        .find(|&p| is_edge(p));

    let Some(first) = first else {
        return Contour { points: vec![start] };
    };

    let mut points = Vec::new();
    let mut previous = first;
    let mut current = start;

    loop {
        let back = direction(current, previous);
        // Counter-clockwise search starting just after the pixel we came from;
        // the last candidate is `previous` itself, so this always succeeds.
        let next = (1..=8)
            .map(|t| step(current, (back + t) % 8))
            .find(|&p| is_edge(p))
            .unwrap_or(previous);

        points.push(current);

        if next == start && current == first {
            break;
        }
        previous = current;
        current = next;
    }

    Contour { points }
}

fn direction(from: (i64, i64), to: (i64, i64)) -> usize {
    let delta = (to.0 - from.0, to.1 - from.1);
    DIRECTIONS.iter().position(|&d| d == delta).unwrap_or(WEST)
}

/// Mark every pixel 8-connected to `start`
fn label_region(mask: &EdgeMask, start: (i64, i64), labelled: &mut [bool]) {
    let width = mask.width() as usize;
    let index = |p: (i64, i64)| p.1 as usize * width + p.0 as usize;

    labelled[index(start)] = true;
    let mut stack = vec![start];
    while let Some(p) = stack.pop() {
        for &(dx, dy) in &DIRECTIONS {
            let n = (p.0 + dx, p.1 + dy);
            if mask.is_edge(n.0, n.1) && !labelled[index(n)] {
                labelled[index(n)] = true;
                stack.push(n);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_from(rows: &[&str]) -> EdgeMask {
        EdgeMask::from_fn(rows[0].len() as u32, rows.len() as u32, |x, y| {
            rows[y as usize].as_bytes()[x as usize] == b'#'
        })
    }

    #[test]
    fn test_empty_mask() {
        let mask = mask_from(&["....", "...."]);
        assert!(find_external_contours(&mask).is_empty());
        assert_eq!(ShapeMetrics::largest(&mask), ShapeMetrics::default());
    }

    #[test]
    fn test_single_pixel() {
        let mask = mask_from(&["...", ".#.", "..."]);
        let contours = find_external_contours(&mask);
        assert_eq!(contours.len(), 1);
        assert_eq!(contours[0].points(), &[(1, 1)]);

        let shape = ShapeMetrics::largest(&mask);
        assert_eq!(shape.area, 0.0);
        assert_eq!(shape.circularity, 0.0);
    }

    #[test]
    fn test_horizontal_line() {
        let mask = mask_from(&["###"]);
        let contours = find_external_contours(&mask);
        assert_eq!(contours.len(), 1);
        assert_eq!(contours[0].area(), 0.0);
        // There and back again
        assert!((contours[0].perimeter() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_square_ring() {
        let mask = mask_from(&[
            "......",
            ".####.",
            ".#..#.",
            ".#..#.",
            ".####.",
            "......",
        ]);
        let contours = find_external_contours(&mask);
        assert_eq!(contours.len(), 1);
        assert_eq!(contours[0].points().len(), 12);

        let shape = ShapeMetrics::of(&contours[0]);
        assert!((shape.area - 9.0).abs() < 1e-12);
        assert!((shape.perimeter - 12.0).abs() < 1e-12);
        assert!((shape.circularity - std::f64::consts::PI / 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_filled_block_matches_ring() {
        let mask = mask_from(&["####", "####", "####", "####"]);
        let shape = ShapeMetrics::largest(&mask);
        assert!((shape.area - 9.0).abs() < 1e-12);
        assert!((shape.perimeter - 12.0).abs() < 1e-12);
    }

    #[test]
    fn test_diamond() {
        let mask = mask_from(&[
            "..#..",
            ".#.#.",
            "#...#",
            ".#.#.",
            "..#..",
        ]);
        let contours = find_external_contours(&mask);
        assert_eq!(contours.len(), 1);
        assert_eq!(contours[0].points().len(), 8);

        let shape = ShapeMetrics::of(&contours[0]);
        assert!((shape.area - 8.0).abs() < 1e-12);
        assert!((shape.perimeter - 8.0 * std::f64::consts::SQRT_2).abs() < 1e-9);
    }

    #[test]
    fn test_largest_of_several() {
        let mask = mask_from(&[
            "###.......",
            "#.#..#####",
            "###..#...#",
            ".....#...#",
            ".....#####",
        ]);
        let contours = find_external_contours(&mask);
        assert_eq!(contours.len(), 2);

        let shape = ShapeMetrics::largest(&mask);
        // 5x4 outline: polygon 4 wide, 3 tall
        assert!((shape.area - 12.0).abs() < 1e-12);
    }

    #[test]
    fn test_nested_region_is_separate_contour() {
        let mask = mask_from(&[
            "#######",
            "#.....#",
            "#..#..#",
            "#.....#",
            "#######",
        ]);
        let contours = find_external_contours(&mask);
        assert_eq!(contours.len(), 2);
        assert!((ShapeMetrics::largest(&mask).area - 24.0).abs() < 1e-12);
    }
}
