// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bounded Voronoi cells clipped to a planar region
//!
//! Every cell starts as the region's bounding box grown by a ring buffer and
//! is cut by the perpendicular bisector half-plane of each other seed. The
//! convex result is then intersected with the (possibly concave) region, so
//! cells are always closed even for seeds on the hull.

use crate::error::Result;
use crate::polygon::{contour_bounds, intersect_2d, region_area};
use nalgebra::{Point2, Vector2};

/// Seeds closer than this are treated as the same location
pub const COINCIDENT_TOLERANCE: f64 = 1e-9;

const MIN_CELL_AREA: f64 = 1e-12;

/// Why a seed did not receive a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellDefect {
    /// Seed shares its location with an earlier seed
    Coincident { with: usize },
    /// Clipped cell has no area inside the region
    Empty,
}

/// Voronoi cell of one seed, clipped to the region
#[derive(Debug, Clone)]
pub struct VoronoiCell {
    pub seed: usize,
    pub region: Vec<Vec<Point2<f64>>>,
    pub defect: Option<CellDefect>,
}

impl VoronoiCell {
    pub fn is_valid(&self) -> bool {
        self.defect.is_none()
    }

    pub fn area(&self) -> f64 {
        region_area(&self.region)
    }
}

/// Bounding box of `region` grown by `ring_buffer` on every side
pub fn ring_box(region: &[Vec<Point2<f64>>], ring_buffer: f64) -> Option<Vec<Point2<f64>>> {
    let all: Vec<Point2<f64>> = region.iter().flatten().cloned().collect();
    let (min, max) = contour_bounds(&all)?;
    let pad = ring_buffer.max(0.0);
    Some(vec![
        Point2::new(min.x - pad, min.y - pad),
        Point2::new(max.x + pad, min.y - pad),
        Point2::new(max.x + pad, max.y + pad),
        Point2::new(min.x - pad, max.y + pad),
    ])
}

/// Cell of seed `index`, clipped to `region`
///
/// `ring` is the starting polygon (see [`ring_box`]); it must be convex and
/// counter-clockwise.
pub fn voronoi_cell(
    seeds: &[Point2<f64>],
    index: usize,
    ring: &[Point2<f64>],
    region: &[Vec<Point2<f64>>],
) -> Result<VoronoiCell> {
    let seed = seeds[index];

    if let Some(with) = seeds[..index]
        .iter()
        .position(|s| (s - seed).norm() < COINCIDENT_TOLERANCE)
    {
        return Ok(VoronoiCell {
            seed: index,
            region: Vec::new(),
            defect: Some(CellDefect::Coincident { with }),
        });
    }

    let mut cell = ring.to_vec();
    for (j, other) in seeds.iter().enumerate() {
        if j == index {
            continue;
        }
        let normal = other - seed;
        if normal.norm() < COINCIDENT_TOLERANCE {
            continue;
        }
        let midpoint = Point2::from((seed.coords + other.coords) * 0.5);
        cell = clip_half_plane(&cell, &midpoint, &normal);
        if cell.len() < 3 {
            break;
        }
    }

    let clipped = if cell.len() < 3 {
        Vec::new()
    } else {
        intersect_2d(&[cell], region)?
    };

    let defect = if region_area(&clipped) <= MIN_CELL_AREA {
        Some(CellDefect::Empty)
    } else {
        None
    };

    Ok(VoronoiCell {
        seed: index,
        region: if defect.is_some() { Vec::new() } else { clipped },
        defect,
    })
}

/// Cells for every seed, in seed order
pub fn clipped_voronoi_cells(
    seeds: &[Point2<f64>],
    region: &[Vec<Point2<f64>>],
    ring_buffer: f64,
) -> Result<Vec<VoronoiCell>> {
    let ring = match ring_box(region, ring_buffer) {
        Some(ring) => ring,
        None => return Ok(Vec::new()),
    };
    (0..seeds.len())
        .map(|i| voronoi_cell(seeds, i, &ring, region))
        .collect()
}

/// Sutherland-Hodgman clip keeping the side where (p - origin) . normal <= 0
fn clip_half_plane(
    polygon: &[Point2<f64>],
    origin: &Point2<f64>,
    normal: &Vector2<f64>,
) -> Vec<Point2<f64>> {
    let side = |p: &Point2<f64>| (p - origin).dot(normal);
    let n = polygon.len();
    let mut out = Vec::with_capacity(n + 1);

    for i in 0..n {
        let current = polygon[i];
        let next = polygon[(i + 1) % n];
        let dc = side(&current);
        let dn = side(&next);

        if dc <= 0.0 {
            out.push(current);
        }
        if (dc < 0.0 && dn > 0.0) || (dc > 0.0 && dn < 0.0) {
            let t = dc / (dc - dn);
            out.push(current + (next - current) * t);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square(size: f64) -> Vec<Vec<Point2<f64>>> {
        vec![vec![
            Point2::new(0.0, 0.0),
            Point2::new(size, 0.0),
            Point2::new(size, size),
            Point2::new(0.0, size),
        ]]
    }

    #[test]
    fn test_cells_tile_region() {
        let seeds = vec![
            Point2::new(1.0, 1.0),
            Point2::new(3.0, 1.2),
            Point2::new(2.1, 3.0),
            Point2::new(0.5, 3.5),
        ];
        let cells = clipped_voronoi_cells(&seeds, &square(4.0), 20.0).unwrap();
        assert_eq!(cells.len(), 4);
        assert!(cells.iter().all(|c| c.is_valid()));
        let total: f64 = cells.iter().map(|c| c.area()).sum();
        assert_relative_eq!(total, 16.0, epsilon = 1e-6);
    }

    #[test]
    fn test_two_seeds_split_in_half() {
        let seeds = vec![Point2::new(1.0, 2.0), Point2::new(3.0, 2.0)];
        let cells = clipped_voronoi_cells(&seeds, &square(4.0), 20.0).unwrap();
        assert_relative_eq!(cells[0].area(), 8.0, epsilon = 1e-9);
        assert_relative_eq!(cells[1].area(), 8.0, epsilon = 1e-9);
    }

    #[test]
    fn test_coincident_seed_is_flagged() {
        let seeds = vec![
            Point2::new(1.0, 1.0),
            Point2::new(3.0, 3.0),
            Point2::new(1.0, 1.0),
        ];
        let cells = clipped_voronoi_cells(&seeds, &square(4.0), 20.0).unwrap();
        assert!(cells[0].is_valid());
        assert_eq!(cells[2].defect, Some(CellDefect::Coincident { with: 0 }));
        let total: f64 = cells.iter().map(|c| c.area()).sum();
        assert_relative_eq!(total, 16.0, epsilon = 1e-6);
    }

    #[test]
    fn test_seed_far_outside_gets_empty_cell() {
        let seeds = vec![Point2::new(2.0, 2.0), Point2::new(30.0, 2.0)];
        let cells = clipped_voronoi_cells(&seeds, &square(4.0), 20.0).unwrap();
        assert!(cells[0].is_valid());
        assert_eq!(cells[1].defect, Some(CellDefect::Empty));
    }

    #[test]
    fn test_single_seed_claims_whole_region() {
        let seeds = vec![Point2::new(10.0, 10.0)];
        let cells = clipped_voronoi_cells(&seeds, &square(4.0), 20.0).unwrap();
        assert_relative_eq!(cells[0].area(), 16.0, epsilon = 1e-9);
    }
}
