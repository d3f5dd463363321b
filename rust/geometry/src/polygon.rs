// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! 2D polygon utilities and boolean operations
//!
//! Boolean operations go through the i_overlay crate. A "region" is a list of
//! contours where outer boundaries wind counter-clockwise and holes wind
//! clockwise, so the signed areas of its contours sum to the enclosed area.

use crate::error::{Error, Result};
use i_overlay::core::fill_rule::FillRule;
use i_overlay::core::overlay_rule::OverlayRule;
use i_overlay::float::single::SingleFloatOverlay;
use nalgebra::Point2;

/// Epsilon for floating point comparisons in 2D operations
const EPSILON_2D: f64 = 1e-9;

/// Minimum area threshold - polygons smaller than this are considered degenerate
const MIN_AREA_THRESHOLD: f64 = 1e-10;

/// Compute the signed area of a 2D contour
/// Positive = counter-clockwise, Negative = clockwise
pub fn compute_signed_area(contour: &[Point2<f64>]) -> f64 {
    if contour.len() < 3 {
        return 0.0;
    }

    let mut area = 0.0;
    let n = contour.len();

    for i in 0..n {
        let j = (i + 1) % n;
        area += contour[i].x * contour[j].y;
        area -= contour[j].x * contour[i].y;
    }

    area * 0.5
}

/// Total enclosed area of a region (outer contours CCW, holes CW)
pub fn region_area(region: &[Vec<Point2<f64>>]) -> f64 {
    region.iter().map(|c| compute_signed_area(c)).sum::<f64>().max(0.0)
}

/// Ensure contour has counter-clockwise winding (positive area)
pub fn ensure_ccw(contour: &[Point2<f64>]) -> Vec<Point2<f64>> {
    let area = compute_signed_area(contour);
    if area < 0.0 {
        contour.iter().rev().cloned().collect()
    } else {
        contour.to_vec()
    }
}

/// Ensure contour has clockwise winding (for holes)
pub fn ensure_cw(contour: &[Point2<f64>]) -> Vec<Point2<f64>> {
    let area = compute_signed_area(contour);
    if area > 0.0 {
        contour.iter().rev().cloned().collect()
    } else {
        contour.to_vec()
    }
}

/// Check if a contour is valid (has area, not degenerate)
pub fn is_valid_contour(contour: &[Point2<f64>]) -> bool {
    if contour.len() < 3 {
        return false;
    }

    compute_signed_area(contour).abs() > MIN_AREA_THRESHOLD
}

/// Drop consecutive duplicate vertices and a closing vertex equal to the first
pub fn dedup_contour(contour: &[Point2<f64>]) -> Vec<Point2<f64>> {
    let mut result: Vec<Point2<f64>> = Vec::with_capacity(contour.len());
    for p in contour {
        if result
            .last()
            .map_or(true, |last| (p - last).norm() > EPSILON_2D)
        {
            result.push(*p);
        }
    }
    while result.len() > 1 && (result[0] - result[result.len() - 1]).norm() <= EPSILON_2D {
        result.pop();
    }
    result
}

/// Check if a point is inside a contour using ray casting
pub fn point_in_contour(point: &Point2<f64>, contour: &[Point2<f64>]) -> bool {
    if contour.len() < 3 {
        return false;
    }

    let mut inside = false;
    let n = contour.len();

    let mut j = n - 1;
    for i in 0..n {
        let pi = &contour[i];
        let pj = &contour[j];

        if ((pi.y > point.y) != (pj.y > point.y))
            && (point.x < (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x)
        {
            inside = !inside;
        }
        j = i;
    }

    inside
}

/// Compute bounding box of a contour
pub fn contour_bounds(contour: &[Point2<f64>]) -> Option<(Point2<f64>, Point2<f64>)> {
    if contour.is_empty() {
        return None;
    }

    let mut min = contour[0];
    let mut max = contour[0];

    for p in contour.iter().skip(1) {
        min.x = min.x.min(p.x);
        min.y = min.y.min(p.y);
        max.x = max.x.max(p.x);
        max.y = max.y.max(p.y);
    }

    Some((min, max))
}

/// Check if two bounding boxes overlap
pub fn bounds_overlap(
    a_min: &Point2<f64>,
    a_max: &Point2<f64>,
    b_min: &Point2<f64>,
    b_max: &Point2<f64>,
) -> bool {
    a_min.x <= b_max.x && a_max.x >= b_min.x && a_min.y <= b_max.y && a_max.y >= b_min.y
}

/// Closest point on segment `a`-`b`, with its parameter along the segment
pub fn closest_point_on_segment(
    point: &Point2<f64>,
    a: &Point2<f64>,
    b: &Point2<f64>,
) -> (Point2<f64>, f64) {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq <= EPSILON_2D * EPSILON_2D {
        return (*a, 0.0);
    }
    let t = ((point - a).dot(&ab) / len_sq).clamp(0.0, 1.0);
    (a + ab * t, t)
}

/// Closest point on the boundary of a closed contour
///
/// Returns the point, the index of the edge it lies on (edge `i` runs from
/// vertex `i` to vertex `i + 1`) and its distance along that edge.
pub fn closest_point_on_contour(
    point: &Point2<f64>,
    contour: &[Point2<f64>],
) -> Option<(Point2<f64>, usize, f64)> {
    let n = contour.len();
    if n < 2 {
        return None;
    }

    let mut best: Option<(Point2<f64>, usize, f64, f64)> = None;
    for i in 0..n {
        let a = &contour[i];
        let b = &contour[(i + 1) % n];
        let (closest, t) = closest_point_on_segment(point, a, b);
        let dist = (closest - point).norm();
        match best {
            Some((_, _, _, best_dist)) if dist >= best_dist - EPSILON_2D => {}
            _ => best = Some((closest, i, t * (b - a).norm(), dist)),
        }
    }

    best.map(|(p, edge, along, _)| (p, edge, along))
}

/// Distance from a point to the boundary of a contour
pub fn distance_to_contour(point: &Point2<f64>, contour: &[Point2<f64>]) -> f64 {
    closest_point_on_contour(point, contour)
        .map(|(p, _, _)| (p - point).norm())
        .unwrap_or(f64::INFINITY)
}

/// Distance from a point to a region; zero when the point lies inside
pub fn distance_to_region(point: &Point2<f64>, region: &[Vec<Point2<f64>>]) -> f64 {
    let inside = region
        .iter()
        .filter(|c| compute_signed_area(c) > 0.0)
        .any(|c| point_in_contour(point, c));
    if inside {
        return 0.0;
    }
    region
        .iter()
        .map(|c| distance_to_contour(point, c))
        .fold(f64::INFINITY, f64::min)
}

/// Perform 2D boolean intersection of two regions
pub fn intersect_2d(
    subject: &[Vec<Point2<f64>>],
    clip: &[Vec<Point2<f64>>],
) -> Result<Vec<Vec<Point2<f64>>>> {
    overlay_regions(subject, clip, OverlayRule::Intersect)
}

/// Perform 2D boolean difference: subject - clip
pub fn difference_2d(
    subject: &[Vec<Point2<f64>>],
    clip: &[Vec<Point2<f64>>],
) -> Result<Vec<Vec<Point2<f64>>>> {
    if clip.iter().all(|c| !is_valid_contour(c)) {
        return Ok(subject
            .iter()
            .filter(|c| is_valid_contour(c))
            .cloned()
            .collect());
    }
    overlay_regions(subject, clip, OverlayRule::Difference)
}

/// Union of any number of regions
pub fn union_2d(regions: &[Vec<Vec<Point2<f64>>>]) -> Result<Vec<Vec<Point2<f64>>>> {
    let mut acc: Vec<Vec<Point2<f64>>> = Vec::new();
    for region in regions {
        if acc.is_empty() {
            acc = region.iter().filter(|c| is_valid_contour(c)).cloned().collect();
            continue;
        }
        acc = overlay_regions(&acc, region, OverlayRule::Union)?;
    }
    Ok(acc)
}

/// Area of the intersection of two regions
pub fn intersection_area(subject: &[Vec<Point2<f64>>], clip: &[Vec<Point2<f64>>]) -> Result<f64> {
    Ok(region_area(&intersect_2d(subject, clip)?))
}

// ============================================================================
// Internal Helper Functions
// ============================================================================

fn overlay_regions(
    subject: &[Vec<Point2<f64>>],
    clip: &[Vec<Point2<f64>>],
    rule: OverlayRule,
) -> Result<Vec<Vec<Point2<f64>>>> {
    let subject_paths = region_to_paths(subject)?;
    let clip_paths = region_to_paths(clip)?;

    if subject_paths.is_empty() {
        return Ok(Vec::new());
    }
    if clip_paths.is_empty() {
        return Ok(match rule {
            OverlayRule::Intersect => Vec::new(),
            _ => subject.iter().filter(|c| is_valid_contour(c)).cloned().collect(),
        });
    }

    // Result is Vec<Vec<Vec<[f64; 2]>>> - Vec of shapes, each shape is Vec of contours
    let shapes = subject_paths.overlay(&clip_paths, rule, FillRule::EvenOdd);
    Ok(shapes_to_region(&shapes))
}

/// Convert a region to i_overlay path format, rejecting non-finite input
fn region_to_paths(region: &[Vec<Point2<f64>>]) -> Result<Vec<Vec<[f64; 2]>>> {
    let mut paths = Vec::with_capacity(region.len());
    for contour in region {
        if contour.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
            return Err(Error::InvalidPolygon(
                "contour contains non-finite coordinates".to_string(),
            ));
        }
        let contour = dedup_contour(contour);
        if is_valid_contour(&contour) {
            paths.push(contour.iter().map(|p| [p.x, p.y]).collect());
        }
    }
    Ok(paths)
}

/// Convert i_overlay result shapes back to a region
///
/// i_overlay returns Vec<Vec<Vec<[f64; 2]>>> where:
/// - Outer Vec: list of shapes
/// - Middle Vec: list of contours per shape (first is outer, rest are holes)
/// - Inner Vec: list of points per contour
fn shapes_to_region(shapes: &[Vec<Vec<[f64; 2]>>]) -> Vec<Vec<Point2<f64>>> {
    let mut region = Vec::new();
    for shape in shapes {
        for (idx, contour) in shape.iter().enumerate() {
            let points: Vec<Point2<f64>> =
                contour.iter().map(|p| Point2::new(p[0], p[1])).collect();
            if !is_valid_contour(&points) {
                continue;
            }
            if idx == 0 {
                region.push(ensure_ccw(&points));
            } else {
                region.push(ensure_cw(&points));
            }
        }
    }
    region
}
