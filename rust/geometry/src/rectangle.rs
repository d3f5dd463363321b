// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Convex hull and minimum-area bounding rectangle of a footprint.

use crate::error::{Error, Result};
use crate::polygon::compute_signed_area;
use nalgebra::{Point2, Vector2};

const EPSILON: f64 = 1e-9;

/// Oriented rectangle with corners in counter-clockwise order
#[derive(Debug, Clone, PartialEq)]
pub struct Rectangle {
    pub corners: [Point2<f64>; 4],
}

impl Rectangle {
    /// Axis-aligned rectangle centred on `center`
    pub fn axis_aligned(center: Point2<f64>, width: f64, height: f64) -> Self {
        let hw = width * 0.5;
        let hh = height * 0.5;
        Self {
            corners: [
                Point2::new(center.x - hw, center.y - hh),
                Point2::new(center.x + hw, center.y - hh),
                Point2::new(center.x + hw, center.y + hh),
                Point2::new(center.x - hw, center.y + hh),
            ],
        }
    }

    /// Length of edge `i` (from corner `i` to corner `i + 1`)
    pub fn edge_length(&self, i: usize) -> f64 {
        (self.corners[(i + 1) % 4] - self.corners[i % 4]).norm()
    }

    pub fn center(&self) -> Point2<f64> {
        Point2::from((self.corners[0].coords + self.corners[2].coords) * 0.5)
    }

    pub fn area(&self) -> f64 {
        self.edge_length(0) * self.edge_length(1)
    }

    pub fn contour(&self) -> Vec<Point2<f64>> {
        self.corners.to_vec()
    }
}

/// Convex hull via Andrew's monotone chain, counter-clockwise without
/// collinear points
pub fn convex_hull(points: &[Point2<f64>]) -> Vec<Point2<f64>> {
    let mut pts: Vec<Point2<f64>> = points
        .iter()
        .filter(|p| p.x.is_finite() && p.y.is_finite())
        .cloned()
        .collect();
    pts.sort_by(|a, b| {
        a.x.partial_cmp(&b.x)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.y.partial_cmp(&b.y).unwrap_or(std::cmp::Ordering::Equal))
    });
    pts.dedup_by(|a, b| (*a - *b).norm() < EPSILON);

    if pts.len() < 3 {
        return pts;
    }

    let cross = |o: &Point2<f64>, a: &Point2<f64>, b: &Point2<f64>| -> f64 {
        (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
    };

    let mut lower: Vec<Point2<f64>> = Vec::with_capacity(pts.len());
    for p in &pts {
        while lower.len() >= 2 && cross(&lower[lower.len() - 2], &lower[lower.len() - 1], p) <= EPSILON
        {
            lower.pop();
        }
        lower.push(*p);
    }

    let mut upper: Vec<Point2<f64>> = Vec::with_capacity(pts.len());
    for p in pts.iter().rev() {
        while upper.len() >= 2 && cross(&upper[upper.len() - 2], &upper[upper.len() - 1], p) <= EPSILON
        {
            upper.pop();
        }
        upper.push(*p);
    }

    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

/// Minimum-area bounding rectangle via rotating calipers over hull edges
///
/// The first hull edge direction achieving the minimum area wins, which
/// keeps the result deterministic for squares and other symmetric inputs.
pub fn min_area_rectangle(points: &[Point2<f64>]) -> Result<Rectangle> {
    let hull = convex_hull(points);
    if hull.len() < 3 || compute_signed_area(&hull).abs() <= EPSILON {
        return Err(Error::Degenerate(format!(
            "footprint with {} hull vertices has no area",
            hull.len()
        )));
    }

    let n = hull.len();
    let mut best: Option<(f64, Rectangle)> = None;

    for i in 0..n {
        let edge = hull[(i + 1) % n] - hull[i];
        let len = edge.norm();
        if len <= EPSILON {
            continue;
        }
        let u = edge / len;
        let v = Vector2::new(-u.y, u.x);

        let mut min_u = f64::INFINITY;
        let mut max_u = f64::NEG_INFINITY;
        let mut min_v = f64::INFINITY;
        let mut max_v = f64::NEG_INFINITY;
        for p in &hull {
            let pu = p.coords.dot(&u);
            let pv = p.coords.dot(&v);
            min_u = min_u.min(pu);
            max_u = max_u.max(pu);
            min_v = min_v.min(pv);
            max_v = max_v.max(pv);
        }

        let area = (max_u - min_u) * (max_v - min_v);
        let improves = best
            .as_ref()
            .map_or(true, |(best_area, _)| area < best_area - EPSILON * best_area.max(1.0));
        if improves {
            let corner = |a: f64, b: f64| Point2::from(u * a + v * b);
            best = Some((
                area,
                Rectangle {
                    corners: [
                        corner(min_u, min_v),
                        corner(max_u, min_v),
                        corner(max_u, max_v),
                        corner(min_u, max_v),
                    ],
                },
            ));
        }
    }

    best.map(|(_, rect)| rect)
        .ok_or_else(|| Error::Degenerate("no usable hull edge".to_string()))
}
