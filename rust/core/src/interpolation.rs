// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Pressure field interpolator
//!
//! Turns the scattered taps of each surface into a regular grid of mean and
//! standard deviation Cp. Tap coordinates are first reflected into the real
//! building's frame for the direction quadrant and normalized to the unit
//! square of the surface, then the square is pinned at its corners and edges
//! with values copied from the nearest taps, triangulated, and sampled with
//! cubic Bézier triangles.

use crate::cancel::CancelToken;
use crate::catalog::{PressureTap, ReferenceDataset};
use crate::error::{Error, Result};
use crate::model_geometry::ModelGeometry;
use crate::orientation::Quadrant;
use crate::surfaces::{RoofPlane, SurfaceGeometry, SurfaceKind, SurfaceMap};
use cpmap_geometry::{triangulate_points, Triangulation2D};
use nalgebra::{Matrix2, Point2, Vector2};
use serde::{Deserialize, Serialize};

/// Boundary points synthesized per edge of the unit square
const EDGE_POINTS: usize = 8;

/// Points closer than this (unit-square units) are merged
const MERGE_TOLERANCE: f64 = 1e-9;

/// Barycentric slack when locating grid points on triangle edges
const LOCATE_TOLERANCE: f64 = 1e-9;

/// Interpolated grid of one surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceField {
    pub number: u8,
    pub resolution: usize,
    /// Unit-square coordinates in the real surface frame, row-major from the
    /// bottom-left corner
    pub points: Vec<Point2<f64>>,
    pub mean_cp: Vec<f64>,
    pub std_cp: Vec<f64>,
}

impl SurfaceField {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Measured tap reflected and normalized onto its real surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedTap {
    pub index: usize,
    pub surface: u8,
    pub point: Point2<f64>,
    pub mean_cp: f64,
    pub std_cp: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterpolatedSurfaces {
    pub fields: SurfaceMap<SurfaceField>,
    pub measured: Vec<NormalizedTap>,
}

/// Maps stored model coordinates of one surface into its real unit square
#[derive(Debug, Clone, Copy)]
pub struct SurfaceFrame {
    kind: SurfaceKind,
    flip: bool,
    signs: (f64, f64),
    breadth: f64,
    depth: f64,
    height: f64,
}

impl SurfaceFrame {
    pub fn new(dataset: &ReferenceDataset, surface: &SurfaceGeometry, quadrant: Quadrant) -> Self {
        Self {
            kind: surface.kind,
            flip: quadrant.flips_walls(),
            signs: quadrant.signs(),
            breadth: dataset.breadth,
            depth: dataset.depth,
            height: dataset.height,
        }
    }

    /// Unit-square coordinates of a stored tap position
    pub fn normalize(&self, x: f64, y: f64) -> Point2<f64> {
        let (p, q) = match self.kind {
            SurfaceKind::Wall { face, .. } => {
                let width = if face.is_end() { self.breadth } else { self.depth };
                let p = x / width;
                (if self.flip { 1.0 - p } else { p }, y / self.height)
            }
            SurfaceKind::Roof { plane } => {
                let xr = self.signs.0 * x;
                let yr = self.signs.1 * y;
                let p = xr / self.depth + 0.5;
                let q = match plane {
                    RoofPlane::Whole => yr / self.breadth + 0.5,
                    RoofPlane::MinusY => yr / (self.breadth * 0.5) + 1.0,
                    RoofPlane::PlusY => yr / (self.breadth * 0.5),
                };
                (p, q)
            }
        };
        Point2::new(p.clamp(0.0, 1.0), q.clamp(0.0, 1.0))
    }
}

#[derive(Debug, Clone, Copy)]
struct Sample {
    point: Point2<f64>,
    mean: f64,
    std: f64,
}

/// Index of the sample nearest to `p`; ties go to the earlier sample
fn nearest_sample(samples: &[Sample], p: &Point2<f64>) -> usize {
    let mut best = 0;
    let mut best_d = f64::INFINITY;
    for (i, s) in samples.iter().enumerate() {
        let d = (s.point - p).norm_squared();
        if d < best_d {
            best = i;
            best_d = d;
        }
    }
    best
}

fn push_unique(points: &mut Vec<Sample>, sample: Sample) {
    if points
        .iter()
        .all(|s| (s.point - sample.point).norm() > MERGE_TOLERANCE)
    {
        points.push(sample);
    }
}

/// Taps plus corner and edge pins on the unit square
fn pinned_samples(taps: &[Sample]) -> Vec<Sample> {
    let mut samples: Vec<Sample> = Vec::with_capacity(taps.len() + 4 + 4 * EDGE_POINTS);
    for tap in taps {
        push_unique(&mut samples, *tap);
    }

    let corners = [
        Point2::new(0.0, 0.0),
        Point2::new(1.0, 0.0),
        Point2::new(1.0, 1.0),
        Point2::new(0.0, 1.0),
    ];
    for corner in corners {
        let src = taps[nearest_sample(taps, &corner)];
        push_unique(
            &mut samples,
            Sample {
                point: corner,
                ..src
            },
        );
    }

    // (distance to edge, projection onto edge) for bottom, right, top, left
    let edges: [fn(&Point2<f64>) -> (f64, Point2<f64>); 4] = [
        |p| (p.y, Point2::new(p.x, 0.0)),
        |p| (1.0 - p.x, Point2::new(1.0, p.y)),
        |p| (1.0 - p.y, Point2::new(p.x, 1.0)),
        |p| (p.x, Point2::new(0.0, p.y)),
    ];
    for edge in edges {
        let mut order: Vec<usize> = (0..taps.len()).collect();
        order.sort_by(|&a, &b| {
            edge(&taps[a].point)
                .0
                .partial_cmp(&edge(&taps[b].point).0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.cmp(&b))
        });
        for &i in order.iter().take(EDGE_POINTS) {
            let (_, projected) = edge(&taps[i].point);
            push_unique(
                &mut samples,
                Sample {
                    point: projected,
                    ..taps[i]
                },
            );
        }
    }
    samples
}

/// Cubic Bézier-triangle interpolant over scattered samples
///
/// Vertex gradients are least-squares fits over each vertex's triangulation
/// neighbours. Triangles touching a vertex without a well-posed gradient fall
/// back to linear interpolation.
pub struct ScatteredInterpolant {
    triangulation: Triangulation2D,
    values: Vec<[f64; 2]>,
    gradients: Vec<Option<[Vector2<f64>; 2]>>,
}

impl ScatteredInterpolant {
    /// `values[i]` holds (mean, std) at `points[i]`
    pub fn new(points: &[Point2<f64>], values: Vec<[f64; 2]>) -> Result<Self> {
        let triangulation = triangulate_points(points)?;
        let neighbors = triangulation.vertex_neighbors();
        let gradients = (0..points.len())
            .map(|i| least_squares_gradient(points, &values, i, &neighbors[i]))
            .collect();
        Ok(Self {
            triangulation,
            values,
            gradients,
        })
    }

    /// Interpolated (mean, std) at `p`
    pub fn evaluate(&self, p: &Point2<f64>) -> [f64; 2] {
        let Some((t, w)) = self.triangulation.locate(p, LOCATE_TOLERANCE) else {
            return self.nearest_value(p);
        };
        let tri = self.triangulation.triangles[t];
        let pts = tri.map(|i| self.triangulation.points[i]);
        let grads = [
            self.gradients[tri[0]],
            self.gradients[tri[1]],
            self.gradients[tri[2]],
        ];

        let mut out = [0.0; 2];
        for (k, slot) in out.iter_mut().enumerate() {
            let f = tri.map(|i| self.values[i][k]);
            *slot = match (grads[0], grads[1], grads[2]) {
                (Some(g0), Some(g1), Some(g2)) => {
                    bezier_value(&pts, &f, &[g0[k], g1[k], g2[k]], &w)
                }
                _ => f[0] * w[0] + f[1] * w[1] + f[2] * w[2],
            };
        }
        out
    }

    fn nearest_value(&self, p: &Point2<f64>) -> [f64; 2] {
        let mut best = 0;
        let mut best_d = f64::INFINITY;
        for (i, q) in self.triangulation.points.iter().enumerate() {
            let d = (q - p).norm_squared();
            if d < best_d {
                best = i;
                best_d = d;
            }
        }
        self.values[best]
    }
}

fn least_squares_gradient(
    points: &[Point2<f64>],
    values: &[[f64; 2]],
    i: usize,
    neighbors: &[usize],
) -> Option<[Vector2<f64>; 2]> {
    if neighbors.len() < 2 {
        return None;
    }
    let mut a = Matrix2::<f64>::zeros();
    let mut b = [Vector2::<f64>::zeros(); 2];
    for &j in neighbors {
        let d = points[j] - points[i];
        a += d * d.transpose();
        for (k, bk) in b.iter_mut().enumerate() {
            *bk += d * (values[j][k] - values[i][k]);
        }
    }
    let trace = a.trace();
    if a.determinant().abs() <= 1e-12 * trace * trace {
        return None;
    }
    let inv = a.try_inverse()?;
    Some([inv * b[0], inv * b[1]])
}

/// Cubic Bézier triangle through vertex values with vertex gradients
fn bezier_value(
    pts: &[Point2<f64>; 3],
    f: &[f64; 3],
    g: &[Vector2<f64>; 3],
    w: &[f64; 3],
) -> f64 {
    let edge = |i: usize, j: usize| f[i] + g[i].dot(&(pts[j] - pts[i])) / 3.0;
    let b210 = edge(0, 1);
    let b201 = edge(0, 2);
    let b120 = edge(1, 0);
    let b021 = edge(1, 2);
    let b102 = edge(2, 0);
    let b012 = edge(2, 1);
    let e = (b210 + b201 + b120 + b021 + b102 + b012) / 6.0;
    let v = (f[0] + f[1] + f[2]) / 3.0;
    let b111 = e + (e - v) * 0.5;

    let [u, s, t] = *w;
    f[0] * u * u * u
        + f[1] * s * s * s
        + f[2] * t * t * t
        + 3.0
            * (b210 * u * u * s
                + b201 * u * u * t
                + b120 * u * s * s
                + b021 * s * s * t
                + b102 * u * t * t
                + b012 * s * t * t)
        + 6.0 * b111 * u * s * t
}

/// Regular grid of unit-square points, row-major from (0, 0)
pub fn unit_grid(resolution: usize) -> Vec<Point2<f64>> {
    let n = resolution.max(2);
    let step = 1.0 / (n - 1) as f64;
    (0..n)
        .flat_map(|j| (0..n).map(move |i| Point2::new(i as f64 * step, j as f64 * step)))
        .collect()
}

fn interpolate_surface(
    number: u8,
    taps: &[Sample],
    resolution: usize,
    token: &CancelToken,
) -> Result<SurfaceField> {
    let samples = pinned_samples(taps);
    let points: Vec<Point2<f64>> = samples.iter().map(|s| s.point).collect();
    let values: Vec<[f64; 2]> = samples.iter().map(|s| [s.mean, s.std]).collect();
    let interpolant = ScatteredInterpolant::new(&points, values)?;

    let grid = unit_grid(resolution);
    let mut mean_cp = Vec::with_capacity(grid.len());
    let mut std_cp = Vec::with_capacity(grid.len());
    for (k, p) in grid.iter().enumerate() {
        if k % resolution == 0 {
            token.check()?;
        }
        let [mean, std] = interpolant.evaluate(p);
        mean_cp.push(mean);
        std_cp.push(std.max(0.0));
    }

    tracing::debug!(
        surface = number,
        taps = taps.len(),
        nodes = points.len(),
        grid = grid.len(),
        "Interpolated surface field"
    );

    Ok(SurfaceField {
        number,
        resolution,
        points: grid,
        mean_cp,
        std_cp,
    })
}

/// Interpolate every surface of the model from the dataset's taps
pub fn interpolate(
    dataset: &ReferenceDataset,
    model: &ModelGeometry,
    quadrant: Quadrant,
    resolution: usize,
    token: &CancelToken,
) -> Result<InterpolatedSurfaces> {
    let count = model.surfaces.len();
    if let Some(tap) = dataset
        .taps
        .iter()
        .find(|t| t.surface as usize > count)
    {
        return Err(Error::InvalidDataset(format!(
            "{}: tap {} is on surface {} of a {}-surface model",
            dataset.identifier, tap.index, tap.surface, count
        )));
    }

    let frames = model
        .surfaces
        .map(|_, surface| SurfaceFrame::new(dataset, surface, quadrant));

    let normalize = |tap: &PressureTap| -> Option<NormalizedTap> {
        let frame = frames.get(tap.surface)?;
        Some(NormalizedTap {
            index: tap.index,
            surface: tap.surface,
            point: frame.normalize(tap.x, tap.y),
            mean_cp: tap.mean_cp,
            std_cp: tap.std_cp,
        })
    };
    let measured: Vec<NormalizedTap> = dataset.taps.iter().filter_map(normalize).collect();

    let mut fields = Vec::with_capacity(count);
    for (number, _) in model.surfaces.iter() {
        token.check()?;
        let taps: Vec<Sample> = measured
            .iter()
            .filter(|t| t.surface == number)
            .map(|t| Sample {
                point: t.point,
                mean: t.mean_cp,
                std: t.std_cp,
            })
            .collect();
        if taps.is_empty() {
            return Err(Error::InvalidDataset(format!(
                "{} at {} deg has no taps on surface {}",
                dataset.identifier, dataset.direction, number
            )));
        }
        fields.push(interpolate_surface(number, &taps, resolution, token)?);
    }

    let mut computed = fields.into_iter();
    let fields = SurfaceMap::from_fn(model.surfaces.shape(), |_| {
        computed.next().unwrap_or_else(empty_field)
    });

    Ok(InterpolatedSurfaces { fields, measured })
}

fn empty_field() -> SurfaceField {
    SurfaceField {
        number: 0,
        resolution: 0,
        points: Vec::new(),
        mean_cp: Vec::new(),
        std_cp: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample(x: f64, y: f64, f: impl Fn(f64, f64) -> f64) -> Sample {
        Sample {
            point: Point2::new(x, y),
            mean: f(x, y),
            std: 0.1,
        }
    }

    #[test]
    fn test_linear_field_is_reproduced() {
        let f = |x: f64, y: f64| 0.8 - 0.5 * x + 0.3 * y;
        let mut taps = Vec::new();
        for j in 0..5 {
            for i in 0..5 {
                taps.push(sample(i as f64 * 0.25, j as f64 * 0.25, f));
            }
        }
        let field = interpolate_surface(1, &taps, 10, &CancelToken::new()).unwrap();
        assert_eq!(field.len(), 100);
        for (p, v) in field.points.iter().zip(field.mean_cp.iter()) {
            assert_relative_eq!(*v, f(p.x, p.y), epsilon = 1e-9);
        }
        assert!(field.std_cp.iter().all(|s| (s - 0.1).abs() < 1e-9));
    }

    #[test]
    fn test_single_tap_gives_constant_field() {
        let taps = vec![sample(0.4, 0.6, |_, _| -1.2)];
        let field = interpolate_surface(5, &taps, 4, &CancelToken::new()).unwrap();
        assert!(field.mean_cp.iter().all(|v| (v + 1.2).abs() < 1e-12));
    }

    #[test]
    fn test_corner_pins_copy_nearest_tap() {
        let taps = vec![
            sample(0.2, 0.2, |_, _| 1.0),
            sample(0.8, 0.8, |_, _| 2.0),
        ];
        let pinned = pinned_samples(&taps);
        let corner = pinned
            .iter()
            .find(|s| s.point == Point2::new(0.0, 0.0))
            .unwrap();
        assert_eq!(corner.mean, 1.0);
        let corner = pinned
            .iter()
            .find(|s| s.point == Point2::new(1.0, 1.0))
            .unwrap();
        assert_eq!(corner.mean, 2.0);
    }

    #[test]
    fn test_unit_grid_layout() {
        let grid = unit_grid(3);
        assert_eq!(grid.len(), 9);
        assert_eq!(grid[1], Point2::new(0.5, 0.0));
        assert_eq!(grid[3], Point2::new(0.0, 0.5));
        assert_eq!(grid[8], Point2::new(1.0, 1.0));
    }

    #[test]
    fn test_single_triangle_and_nearest_outside() {
        let points = vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(0.0, 1.0),
        ];
        let values = vec![[0.0, 0.0], [1.0, 0.0], [2.0, 0.0]];
        let interpolant = ScatteredInterpolant::new(&points, values).unwrap();
        let [mean, _] = interpolant.evaluate(&Point2::new(0.25, 0.25));
        assert_relative_eq!(mean, 0.75, epsilon = 1e-12);
        let [outside, _] = interpolant.evaluate(&Point2::new(2.0, 2.0));
        assert_relative_eq!(outside, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_cancelled_interpolation_stops() {
        let token = CancelToken::new();
        token.cancel();
        let taps = vec![sample(0.5, 0.5, |_, _| 1.0)];
        assert!(matches!(
            interpolate_surface(1, &taps, 10, &token),
            Err(Error::Cancelled)
        ));
    }
}
