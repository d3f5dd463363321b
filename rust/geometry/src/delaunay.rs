// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Planar Delaunay triangulation via Bowyer-Watson incremental insertion.
//!
//! Used to interpolate scattered tap measurements. Edge and triangle order is
//! made deterministic so repeated runs produce bit-identical fields.

use crate::error::{Error, Result};
use nalgebra::Point2;
use rustc_hash::FxHashMap;

/// Triangulation result: the input points and CCW triangles indexing them
#[derive(Debug, Clone)]
pub struct Triangulation2D {
    pub points: Vec<Point2<f64>>,
    pub triangles: Vec<[usize; 3]>,
}

impl Triangulation2D {
    /// Neighbouring vertices of each vertex, sorted by index
    pub fn vertex_neighbors(&self) -> Vec<Vec<usize>> {
        let mut neighbors: Vec<Vec<usize>> = vec![Vec::new(); self.points.len()];
        for tri in &self.triangles {
            for k in 0..3 {
                let a = tri[k];
                let b = tri[(k + 1) % 3];
                neighbors[a].push(b);
                neighbors[b].push(a);
            }
        }
        for list in &mut neighbors {
            list.sort_unstable();
            list.dedup();
        }
        neighbors
    }

    /// Barycentric coordinates of `p` in triangle `t`, or None when outside
    pub fn barycentric(&self, t: usize, p: &Point2<f64>, tolerance: f64) -> Option<[f64; 3]> {
        let [a, b, c] = self.triangles[t];
        barycentric(&self.points[a], &self.points[b], &self.points[c], p)
            .filter(|w| w.iter().all(|&wi| wi >= -tolerance))
    }

    /// First triangle containing `p` with its barycentric weights
    pub fn locate(&self, p: &Point2<f64>, tolerance: f64) -> Option<(usize, [f64; 3])> {
        (0..self.triangles.len()).find_map(|t| self.barycentric(t, p, tolerance).map(|w| (t, w)))
    }
}

/// Internal triangle with cached circumcircle
struct BwTriangle {
    v: [usize; 3],
    center: Point2<f64>,
    radius_sq: f64,
}

/// Triangulate a set of planar points
///
/// Returns an error for fewer than three points or when all points are
/// collinear. Duplicate points are skipped (they never appear in a triangle).
pub fn triangulate_points(points: &[Point2<f64>]) -> Result<Triangulation2D> {
    let n = points.len();
    if n < 3 {
        return Err(Error::TriangulationError(
            "Need at least 3 points to triangulate".to_string(),
        ));
    }

    let (min, max) = crate::polygon::contour_bounds(points)
        .ok_or_else(|| Error::TriangulationError("empty point set".to_string()))?;
    let dx = (max.x - min.x).max(1e-6);
    let dy = (max.y - min.y).max(1e-6);
    let cx = (min.x + max.x) * 0.5;
    let cy = (min.y + max.y) * 0.5;
    let scale = 100.0 * dx.max(dy);

    // Super-triangle well outside every input point
    let mut all_points: Vec<Point2<f64>> = points.to_vec();
    all_points.push(Point2::new(cx - 2.0 * scale, cy - scale));
    all_points.push(Point2::new(cx + 2.0 * scale, cy - scale));
    all_points.push(Point2::new(cx, cy + 2.0 * scale));

    let si = [n, n + 1, n + 2];
    let mut triangles: Vec<BwTriangle> = Vec::new();
    if let Some(tri) = make_triangle(&all_points, si) {
        triangles.push(tri);
    }

    for i in 0..n {
        let pt = all_points[i];
        let duplicate = all_points[..i].iter().any(|q| (q - pt).norm() < 1e-12);
        if duplicate {
            continue;
        }

        let mut bad: Vec<usize> = Vec::new();
        for (ti, tri) in triangles.iter().enumerate() {
            let dist_sq = (tri.center - pt).norm_squared();
            // Open circumdisk: cocircular points do not invalidate a triangle
            if dist_sq < tri.radius_sq * (1.0 - 1e-12) {
                bad.push(ti);
            }
        }
        if bad.is_empty() {
            continue;
        }

        // Cavity boundary: edges shared by exactly one bad triangle
        let mut edge_count: FxHashMap<(usize, usize), (usize, (usize, usize))> =
            FxHashMap::default();
        for &bi in &bad {
            let v = triangles[bi].v;
            for k in 0..3 {
                let a = v[k];
                let b = v[(k + 1) % 3];
                let key = if a < b { (a, b) } else { (b, a) };
                edge_count
                    .entry(key)
                    .and_modify(|(count, _)| *count += 1)
                    .or_insert((1, (a, b)));
            }
        }
        let mut boundary: Vec<(usize, usize)> = edge_count
            .into_values()
            .filter(|(count, _)| *count == 1)
            .map(|(_, edge)| edge)
            .collect();
        boundary.sort_unstable();

        bad.sort_unstable();
        for &bi in bad.iter().rev() {
            triangles.swap_remove(bi);
        }

        for (a, b) in boundary {
            if let Some(tri) = make_triangle(&all_points, [a, b, i]) {
                triangles.push(tri);
            }
        }
    }

    let mut result: Vec<[usize; 3]> = triangles
        .into_iter()
        .filter(|t| t.v.iter().all(|&vi| vi < n))
        .map(|t| t.v)
        .filter(|v| triangle_area(&all_points[v[0]], &all_points[v[1]], &all_points[v[2]]) > 1e-14)
        .map(|mut v| {
            // Canonical rotation: smallest index first
            let min_pos = (0..3).min_by_key(|&k| v[k]).unwrap_or(0);
            v.rotate_left(min_pos);
            v
        })
        .collect();
    result.sort_unstable();

    if result.is_empty() {
        return Err(Error::TriangulationError(
            "all points are collinear".to_string(),
        ));
    }

    Ok(Triangulation2D {
        points: points.to_vec(),
        triangles: result,
    })
}

/// Build a CCW triangle with its circumcircle; None for collinear vertices
fn make_triangle(points: &[Point2<f64>], v: [usize; 3]) -> Option<BwTriangle> {
    let (a, b, c) = (points[v[0]], points[v[1]], points[v[2]]);
    let signed = signed_area(&a, &b, &c);
    if signed.abs() < 1e-18 {
        return None;
    }
    let v = if signed > 0.0 { v } else { [v[0], v[2], v[1]] };
    let (center, radius_sq) = circumcircle(&a, &b, &c)?;
    Some(BwTriangle {
        v,
        center,
        radius_sq,
    })
}

fn signed_area(a: &Point2<f64>, b: &Point2<f64>, c: &Point2<f64>) -> f64 {
    0.5 * ((b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x))
}

fn triangle_area(a: &Point2<f64>, b: &Point2<f64>, c: &Point2<f64>) -> f64 {
    signed_area(a, b, c).abs()
}

fn circumcircle(a: &Point2<f64>, b: &Point2<f64>, c: &Point2<f64>) -> Option<(Point2<f64>, f64)> {
    let d = 2.0 * (a.x * (b.y - c.y) + b.x * (c.y - a.y) + c.x * (a.y - b.y));
    if d.abs() < 1e-18 {
        return None;
    }
    let a2 = a.coords.norm_squared();
    let b2 = b.coords.norm_squared();
    let c2 = c.coords.norm_squared();
    let ux = (a2 * (b.y - c.y) + b2 * (c.y - a.y) + c2 * (a.y - b.y)) / d;
    let uy = (a2 * (c.x - b.x) + b2 * (a.x - c.x) + c2 * (b.x - a.x)) / d;
    let center = Point2::new(ux, uy);
    Some((center, (center - a).norm_squared()))
}

/// Barycentric coordinates of `p` with respect to triangle (a, b, c)
pub fn barycentric(
    a: &Point2<f64>,
    b: &Point2<f64>,
    c: &Point2<f64>,
    p: &Point2<f64>,
) -> Option<[f64; 3]> {
    let total = signed_area(a, b, c);
    if total.abs() < 1e-18 {
        return None;
    }
    let wa = signed_area(p, b, c) / total;
    let wb = signed_area(a, p, c) / total;
    let wc = 1.0 - wa - wb;
    Some([wa, wb, wc])
}
