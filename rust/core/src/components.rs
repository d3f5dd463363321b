// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Component mapper
//!
//! Intersects each tap's tributary with the building's sub-elements. Roof
//! tributaries are compared with roof panels in plan; facade quads are
//! compared with coplanar wall panels in the panel's own 2D basis. Areas are
//! reported on the sloped or vertical surface, not in plan.

use crate::building::{Building, SubElement, SubElementKind};
use crate::cancel::CancelToken;
use crate::config::MappingConfig;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::Result;
use crate::model_geometry::ModelGeometry;
use crate::projection::ProjectedTap;
use crate::tributary::Tributary;
use cpmap_geometry::plane::{
    calculate_polygon_normal, max_plane_deviation, project_to_2d, project_to_2d_with_basis,
};
use cpmap_geometry::polygon::{
    bounds_overlap, contour_bounds, distance_to_region, ensure_ccw, intersection_area,
    is_valid_contour,
};
use nalgebra::{Point2, Point3, Vector3};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Normals closer than this (1 - |cos|) are parallel
const PARALLEL_TOLERANCE: f64 = 1e-6;

/// Largest offset of a facade quad from a panel plane
const COPLANAR_TOLERANCE: f64 = 1e-3;

/// Shares smaller than this are boolean slivers
const MIN_SHARE_AREA: f64 = 1e-9;

/// Portion of a tap's tributary carried by one sub-element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentShare {
    pub id: String,
    pub area: f64,
}

struct RoofPanel<'a> {
    id: &'a str,
    region: Vec<Vec<Point2<f64>>>,
    bounds: (Point2<f64>, Point2<f64>),
    /// Sloped area per unit plan area
    slope_factor: f64,
}

struct WallPanel<'a> {
    id: &'a str,
    normal: Vector3<f64>,
    origin: Point3<f64>,
    u_axis: Vector3<f64>,
    v_axis: Vector3<f64>,
    region: Vec<Vec<Point2<f64>>>,
}

impl<'a> RoofPanel<'a> {
    fn new(element: &'a SubElement) -> Option<Self> {
        let normal = calculate_polygon_normal(&element.polygon);
        if normal.z.abs() < PARALLEL_TOLERANCE {
            return None;
        }
        let plan: Vec<Point2<f64>> = element.polygon.iter().map(|p| Point2::new(p.x, p.y)).collect();
        if !is_valid_contour(&plan) {
            return None;
        }
        let bounds = contour_bounds(&plan)?;
        Some(Self {
            id: &element.id,
            region: vec![ensure_ccw(&plan)],
            bounds,
            slope_factor: 1.0 / normal.z.abs(),
        })
    }

    fn share(&self, region: &[Vec<Point2<f64>>]) -> Result<f64> {
        let all: Vec<Point2<f64>> = region.iter().flatten().cloned().collect();
        let overlaps = contour_bounds(&all).map_or(false, |(min, max)| {
            bounds_overlap(&min, &max, &self.bounds.0, &self.bounds.1)
        });
        if !overlaps {
            return Ok(0.0);
        }
        Ok(intersection_area(region, &self.region)? * self.slope_factor)
    }

    fn distance(&self, tap: &ProjectedTap) -> f64 {
        distance_to_region(&tap.plan_location(), &self.region)
    }
}

impl<'a> WallPanel<'a> {
    fn new(element: &'a SubElement) -> Option<Self> {
        if element.polygon.len() < 3 {
            return None;
        }
        let normal = calculate_polygon_normal(&element.polygon);
        let (points, u_axis, v_axis, origin) = project_to_2d(&element.polygon, &normal);
        if !is_valid_contour(&points) {
            return None;
        }
        Some(Self {
            id: &element.id,
            normal,
            origin,
            u_axis,
            v_axis,
            region: vec![ensure_ccw(&points)],
        })
    }

    fn coplanar(&self, quad: &[Point3<f64>]) -> bool {
        let normal = calculate_polygon_normal(quad);
        1.0 - normal.dot(&self.normal).abs() <= PARALLEL_TOLERANCE
            && max_plane_deviation(quad, &self.normal, &self.origin) <= COPLANAR_TOLERANCE
    }

    fn share(&self, quads: &[Vec<Point3<f64>>]) -> Result<f64> {
        let mut area = 0.0;
        for quad in quads.iter().filter(|q| self.coplanar(q)) {
            let flat = project_to_2d_with_basis(quad, &self.u_axis, &self.v_axis, &self.origin);
            if !is_valid_contour(&flat) {
                continue;
            }
            area += intersection_area(&[ensure_ccw(&flat)], &self.region)?;
        }
        Ok(area)
    }

    fn distance(&self, tap: &ProjectedTap) -> f64 {
        let offset = (tap.location - self.origin).dot(&self.normal);
        let flat = project_to_2d_with_basis(&[tap.location], &self.u_axis, &self.v_axis, &self.origin);
        let in_plane = distance_to_region(&flat[0], &self.region);
        (offset * offset + in_plane * in_plane).sqrt()
    }
}

/// Nearest candidate within `radius`, first one winning ties
fn nearest_within<'a>(candidates: impl Iterator<Item = (&'a str, f64)>, radius: f64) -> Option<&'a str> {
    let mut best: Option<(&str, f64)> = None;
    for (id, d) in candidates {
        if d > radius {
            continue;
        }
        if best.map_or(true, |(_, b)| d < b) {
            best = Some((id, d));
        }
    }
    best.map(|(id, _)| id)
}

/// Record the sub-elements carrying each grid tap
///
/// Buildings without sub-elements are left unmapped without diagnostics.
pub fn assign(
    taps: &mut [ProjectedTap],
    building: &Building,
    model: &ModelGeometry,
    config: &MappingConfig,
    token: &CancelToken,
    diagnostics: &mut Diagnostics,
) -> Result<()> {
    if building.sub_elements.is_empty() {
        return Ok(());
    }
    let roof_panels: Vec<RoofPanel> = building
        .sub_elements_of(SubElementKind::RoofPanel)
        .filter_map(RoofPanel::new)
        .collect();
    let wall_panels: Vec<WallPanel> = building
        .sub_elements_of(SubElementKind::WallPanel)
        .filter_map(WallPanel::new)
        .collect();

    for tap in taps.iter_mut() {
        token.check()?;
        let is_wall = model.surface(tap.surface).map_or(false, |s| s.kind.is_wall());

        let mut shares: SmallVec<[ComponentShare; 2]> = SmallVec::new();
        match &tap.tributary {
            Some(Tributary::Plan(region)) => {
                for panel in &roof_panels {
                    let area = panel.share(region)?;
                    if area > MIN_SHARE_AREA {
                        shares.push(ComponentShare {
                            id: panel.id.to_string(),
                            area,
                        });
                    }
                }
            }
            Some(Tributary::Facade(quads)) => {
                for panel in &wall_panels {
                    let area = panel.share(quads)?;
                    if area > MIN_SHARE_AREA {
                        shares.push(ComponentShare {
                            id: panel.id.to_string(),
                            area,
                        });
                    }
                }
            }
            None => {}
        }

        if shares.is_empty() {
            let fallback = if is_wall {
                nearest_within(
                    wall_panels.iter().map(|p| (p.id, p.distance(tap))),
                    config.recovery_radius,
                )
            } else {
                nearest_within(
                    roof_panels.iter().map(|p| (p.id, p.distance(tap))),
                    config.recovery_radius,
                )
            };
            match fallback {
                Some(id) => shares.push(ComponentShare {
                    id: id.to_string(),
                    area: tap.tributary_area,
                }),
                None => diagnostics.push(Diagnostic::UnmappedTap {
                    tap: tap.index,
                    surface: tap.surface,
                }),
            }
        }
        tap.components = shares;
    }

    tracing::debug!(
        roof_panels = roof_panels.len(),
        wall_panels = wall_panels.len(),
        mapped = taps.iter().filter(|t| !t.components.is_empty()).count(),
        "Mapped taps to sub-elements"
    );
    Ok(())
}
