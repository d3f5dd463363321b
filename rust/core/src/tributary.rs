// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tributary discretizer
//!
//! Splits every surface of the real envelope into one region per grid tap.
//!
//! Roof planes are tessellated in plan with Voronoi cells clipped to the roof
//! outline (bounding rectangle, or the true footprint in high-fidelity mode).
//! Facades are unrolled along the footprint perimeter: taps are grouped into
//! columns by perimeter coordinate and each tap owns the strip reaching
//! halfway to its neighbours, folded around footprint corners as planar
//! quads.

use crate::building::{Building, RoofShape};
use crate::cancel::CancelToken;
use crate::config::MappingConfig;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::Result;
use crate::model_geometry::ModelGeometry;
use crate::orientation::Orientation;
use crate::projection::ProjectedTap;
use crate::surfaces::{RoofPlane, SurfaceKind};
use cpmap_geometry::plane::polygon_area_3d;
use cpmap_geometry::polygon::{
    closest_point_on_contour, compute_signed_area, difference_2d, distance_to_region,
    intersect_2d, point_in_contour, region_area, union_2d,
};
use cpmap_geometry::voronoi::{ring_box, voronoi_cell, CellDefect, VoronoiCell};
use nalgebra::{Point2, Point3};
use serde::{Deserialize, Serialize};

/// Taps closer than this along the perimeter share a column
const COLUMN_TOLERANCE: f64 = 1e-6;

/// Base of every facade wall; stories below grade are not exposed
const WALL_BASE: f64 = 0.0;

/// Remainder pieces smaller than this are numerical slivers
const MIN_PIECE_AREA: f64 = 1e-6;

/// Region of a surface whose load acts through one tap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "polygons")]
pub enum Tributary {
    /// Roof region in plan (outer contours CCW, holes CW)
    Plan(Vec<Vec<Point2<f64>>>),
    /// Planar facade quads
    Facade(Vec<Vec<Point3<f64>>>),
}

impl Tributary {
    /// Plan area for roof regions, true area for facade quads
    pub fn area(&self) -> f64 {
        match self {
            Tributary::Plan(region) => region_area(region),
            Tributary::Facade(quads) => quads.iter().map(|q| polygon_area_3d(q)).sum(),
        }
    }
}

/// Arc-length parametrization of a closed footprint
#[derive(Debug, Clone)]
pub struct Perimeter {
    contour: Vec<Point2<f64>>,
    /// Arc length at each vertex; the last entry is the full length
    offsets: Vec<f64>,
}

impl Perimeter {
    pub fn new(contour: &[Point2<f64>]) -> Self {
        let n = contour.len();
        let mut offsets = Vec::with_capacity(n + 1);
        let mut total = 0.0;
        offsets.push(0.0);
        for i in 0..n {
            total += (contour[(i + 1) % n] - contour[i]).norm();
            offsets.push(total);
        }
        Self {
            contour: contour.to_vec(),
            offsets,
        }
    }

    pub fn length(&self) -> f64 {
        self.offsets.last().copied().unwrap_or(0.0)
    }

    /// Arc length of the boundary point closest to `p`
    pub fn coordinate(&self, p: &Point2<f64>) -> f64 {
        closest_point_on_contour(p, &self.contour)
            .map_or(0.0, |(_, edge, along)| self.offsets[edge] + along)
    }

    /// Boundary point at arc length `s`, wrapping around
    pub fn point_at(&self, s: f64) -> Point2<f64> {
        let n = self.contour.len();
        let total = self.length();
        if n == 0 || total <= 0.0 {
            return self.contour.first().copied().unwrap_or_else(Point2::origin);
        }
        let s = s.rem_euclid(total);
        let edge = self.offsets[1..].partition_point(|&o| o <= s).min(n - 1);
        let a = self.contour[edge];
        let b = self.contour[(edge + 1) % n];
        let len = self.offsets[edge + 1] - self.offsets[edge];
        if len <= 0.0 {
            return a;
        }
        a + (b - a) * ((s - self.offsets[edge]) / len)
    }

    /// Vertex arc lengths strictly between `a` and `b`, unwrapped into that range
    pub fn vertices_between(&self, a: f64, b: f64) -> Vec<f64> {
        let total = self.length();
        if total <= 0.0 {
            return Vec::new();
        }
        let mut cuts = Vec::new();
        for &offset in &self.offsets[..self.contour.len()] {
            let mut t = offset + ((a - offset) / total).ceil() * total;
            if t <= a + COLUMN_TOLERANCE {
                t += total;
            }
            while t < b - COLUMN_TOLERANCE {
                cuts.push(t);
                t += total;
            }
        }
        cuts.sort_by(f64::total_cmp);
        cuts
    }
}

/// Attach tributaries to every grid tap
#[allow(clippy::too_many_arguments)]
pub fn discretize(
    taps: &mut [ProjectedTap],
    building: &Building,
    footprint: &[Point2<f64>],
    orientation: &Orientation,
    model: &ModelGeometry,
    config: &MappingConfig,
    token: &CancelToken,
    diagnostics: &mut Diagnostics,
) -> Result<()> {
    let perimeter = Perimeter::new(footprint);
    let outline = if config.high_fidelity_roof {
        footprint.to_vec()
    } else {
        orientation.corners().to_vec()
    };
    let slope_factor = match building.roof.shape {
        RoofShape::Gable => 1.0 / building.roof.pitch.to_radians().cos(),
        RoofShape::Flat | RoofShape::Hip => 1.0,
    };

    for (number, surface) in model.surfaces.iter() {
        token.check()?;
        let members: Vec<usize> = taps
            .iter()
            .enumerate()
            .filter(|(_, t)| t.surface == number)
            .map(|(i, _)| i)
            .collect();
        match surface.kind {
            SurfaceKind::Wall { face, .. } => {
                let side = orientation.side(face);
                let span = (
                    perimeter.coordinate(&side.start),
                    perimeter.coordinate(&side.end),
                );
                facade_strips(
                    taps,
                    &members,
                    &perimeter,
                    span,
                    (WALL_BASE, building.height),
                    diagnostics,
                );
            }
            SurfaceKind::Roof { plane } => {
                let region = plane_region(&outline, orientation, plane)?;
                roof_cells(
                    taps,
                    &members,
                    &region,
                    slope_factor,
                    config,
                    token,
                    diagnostics,
                )?;
            }
        }
    }

    tracing::debug!(
        taps = taps.len(),
        unresolved = taps.iter().filter(|t| t.tributary.is_none()).count(),
        "Discretized tributary regions"
    );
    Ok(())
}

/// Roof outline restricted to one gable plane
fn plane_region(
    outline: &[Point2<f64>],
    orientation: &Orientation,
    plane: RoofPlane,
) -> Result<Vec<Vec<Point2<f64>>>> {
    let region = vec![outline.to_vec()];
    let r = orientation.length + orientation.breadth + 1.0;
    let (lo, hi) = match plane {
        RoofPlane::Whole => return Ok(region),
        RoofPlane::MinusY => (-r, 0.0),
        RoofPlane::PlusY => (0.0, r),
    };
    let half = vec![
        orientation.to_world(-r, lo),
        orientation.to_world(r, lo),
        orientation.to_world(r, hi),
        orientation.to_world(-r, hi),
    ];
    Ok(intersect_2d(&region, &[half])?)
}

fn defect_reason(defect: Option<CellDefect>, taps: &[ProjectedTap], members: &[usize]) -> String {
    match defect {
        Some(CellDefect::Coincident { with }) => {
            format!("coincides with tap {}", taps[members[with]].index)
        }
        Some(CellDefect::Empty) => "empty Voronoi cell".to_string(),
        None => "roof region is empty".to_string(),
    }
}

/// Outer contours of a region, each with the holes it contains
fn split_pieces(region: &[Vec<Point2<f64>>]) -> Vec<Vec<Vec<Point2<f64>>>> {
    let (outers, holes): (Vec<_>, Vec<_>) = region
        .iter()
        .partition(|c| compute_signed_area(c) > 0.0);
    outers
        .into_iter()
        .map(|outer| {
            let mut piece = vec![outer.clone()];
            piece.extend(
                holes
                    .iter()
                    .filter(|h| h.first().map_or(false, |p| point_in_contour(p, outer)))
                    .map(|h| (*h).clone()),
            );
            piece
        })
        .filter(|piece| region_area(piece) > MIN_PIECE_AREA)
        .collect()
}

fn roof_cells(
    taps: &mut [ProjectedTap],
    members: &[usize],
    region: &[Vec<Point2<f64>>],
    slope_factor: f64,
    config: &MappingConfig,
    token: &CancelToken,
    diagnostics: &mut Diagnostics,
) -> Result<()> {
    let seeds: Vec<Point2<f64>> = members.iter().map(|&i| taps[i].plan_location()).collect();
    let ring = match ring_box(region, config.ring_buffer) {
        Some(ring) if region_area(region) > MIN_PIECE_AREA => ring,
        _ => {
            for &i in members {
                diagnostics.push(Diagnostic::DegenerateTessellation {
                    tap: taps[i].index,
                    surface: taps[i].surface,
                    reason: defect_reason(None, taps, members),
                });
            }
            return Ok(());
        }
    };

    let mut cells: Vec<VoronoiCell> = Vec::with_capacity(seeds.len());
    for k in 0..seeds.len() {
        token.check()?;
        cells.push(voronoi_cell(&seeds, k, &ring, region)?);
    }

    let valid: Vec<Vec<Vec<Point2<f64>>>> = cells
        .iter()
        .filter(|c| c.is_valid())
        .map(|c| c.region.clone())
        .collect();
    let mut pieces = if valid.len() < cells.len() {
        split_pieces(&difference_2d(region, &union_2d(&valid)?)?)
    } else {
        Vec::new()
    };

    for (k, cell) in cells.into_iter().enumerate() {
        let tap = &mut taps[members[k]];
        if cell.is_valid() {
            tap.tributary_area = region_area(&cell.region) * slope_factor;
            tap.tributary = Some(Tributary::Plan(cell.region));
            continue;
        }

        // Re-home onto the nearest unclaimed remainder piece
        let seed = seeds[k];
        let nearest = pieces
            .iter()
            .enumerate()
            .map(|(p, piece)| (p, distance_to_region(&seed, piece)))
            .filter(|(_, d)| *d <= config.recovery_radius)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(p, _)| p);
        match nearest {
            Some(p) => {
                let piece = pieces.remove(p);
                tap.tributary_area = region_area(&piece) * slope_factor;
                tap.tributary = Some(Tributary::Plan(piece));
            }
            None => {
                let (index, surface) = (tap.index, tap.surface);
                diagnostics.push(Diagnostic::DegenerateTessellation {
                    tap: index,
                    surface,
                    reason: defect_reason(cell.defect, taps, members),
                });
            }
        }
    }
    Ok(())
}

/// Planar quads covering perimeter range `[from, to]` between two heights
fn strip_quads(perimeter: &Perimeter, from: f64, to: f64, lo: f64, hi: f64) -> Vec<Vec<Point3<f64>>> {
    let mut cuts = vec![from];
    cuts.extend(perimeter.vertices_between(from, to));
    cuts.push(to);
    cuts.windows(2)
        .filter(|w| w[1] - w[0] > COLUMN_TOLERANCE)
        .map(|w| {
            let a = perimeter.point_at(w[0]);
            let b = perimeter.point_at(w[1]);
            vec![
                Point3::new(a.x, a.y, lo),
                Point3::new(b.x, b.y, lo),
                Point3::new(b.x, b.y, hi),
                Point3::new(a.x, a.y, hi),
            ]
        })
        .collect()
}

fn facade_strips(
    taps: &mut [ProjectedTap],
    members: &[usize],
    perimeter: &Perimeter,
    (start, end): (f64, f64),
    (base, eave): (f64, f64),
    diagnostics: &mut Diagnostics,
) {
    let total = perimeter.length();
    if total <= 0.0 {
        return;
    }
    let span = (end - start).rem_euclid(total);

    // Offset of each tap from the surface start, folded into [0, span]
    let mut order: Vec<(f64, f64, usize)> = members
        .iter()
        .map(|&i| {
            let mut t = (perimeter.coordinate(&taps[i].plan_location()) - start).rem_euclid(total);
            if t > span {
                t = if t - span < total - t { span } else { 0.0 };
            }
            (t, taps[i].location.z, i)
        })
        .collect();
    order.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)).then(a.2.cmp(&b.2)));

    let mut columns: Vec<(f64, Vec<(f64, usize)>)> = Vec::new();
    for (t, z, i) in order {
        match columns.last_mut() {
            Some((at, column)) if t - *at <= COLUMN_TOLERANCE => column.push((z, i)),
            _ => columns.push((t, vec![(z, i)])),
        }
    }

    for c in 0..columns.len() {
        let left = if c == 0 {
            0.0
        } else {
            (columns[c - 1].0 + columns[c].0) * 0.5
        };
        let right = if c + 1 == columns.len() {
            span
        } else {
            (columns[c].0 + columns[c + 1].0) * 0.5
        };

        let column = &columns[c].1;
        let mut levels: Vec<(f64, usize)> = Vec::with_capacity(column.len());
        for &(z, i) in column {
            match levels.last() {
                Some(&(z_prev, kept)) if z - z_prev <= COLUMN_TOLERANCE => {
                    diagnostics.push(Diagnostic::DegenerateTessellation {
                        tap: taps[i].index,
                        surface: taps[i].surface,
                        reason: format!("coincides with tap {}", taps[kept].index),
                    });
                }
                _ => levels.push((z, i)),
            }
        }

        for l in 0..levels.len() {
            let (z, i) = levels[l];
            let lo = if l == 0 {
                base.min(z)
            } else {
                (levels[l - 1].0 + z) * 0.5
            };
            let hi = if l + 1 == levels.len() {
                eave.max(z)
            } else {
                (z + levels[l + 1].0) * 0.5
            };
            let quads = strip_quads(perimeter, start + left, start + right, lo, hi);
            taps[i].tributary_area = (right - left) * (hi - lo);
            taps[i].tributary = Some(Tributary::Facade(quads));
        }
    }
}
