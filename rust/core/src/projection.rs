// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Coordinate projector
//!
//! Places unit-square surface points on the real building. Points are first
//! laid out on the full-scale model in building-frame coordinates (u along
//! the long axis, v across it, z up). Inexact matches are then stretched onto
//! the true bounding rectangle and eave height, and finally facade points
//! (and, on request, roof points) are snapped onto the true footprint.

use crate::building::Building;
use crate::components::ComponentShare;
use crate::interpolation::InterpolatedSurfaces;
use crate::model_geometry::{face_edge, ModelGeometry};
use crate::orientation::{BuildingFace, Orientation};
use crate::surfaces::{RoofPlane, SurfaceKind};
use crate::tributary::Tributary;
use cpmap_geometry::polygon::{closest_point_on_contour, distance_to_region};
use nalgebra::{Point2, Point3};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Points further than this outside the footprint are snapped back
const SNAP_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TapSource {
    /// Interpolated grid point
    Grid,
    /// Measured reference tap
    Measured,
}

/// Tap placed on the real building
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectedTap {
    pub index: usize,
    pub source: TapSource,
    pub location: Point3<f64>,
    pub surface: u8,
    pub mean_cp: f64,
    pub std_cp: f64,
    pub tributary: Option<Tributary>,
    pub tributary_area: f64,
    pub components: SmallVec<[ComponentShare; 2]>,
}

impl ProjectedTap {
    fn new(index: usize, source: TapSource, location: Point3<f64>, surface: u8, mean_cp: f64, std_cp: f64) -> Self {
        Self {
            index,
            source,
            location,
            surface,
            mean_cp,
            std_cp,
            tributary: None,
            tributary_area: 0.0,
            components: SmallVec::new(),
        }
    }

    pub fn plan_location(&self) -> Point2<f64> {
        Point2::new(self.location.x, self.location.y)
    }
}

/// Building-frame coordinates of a point
#[derive(Debug, Clone, Copy, PartialEq)]
struct FramePoint {
    u: f64,
    v: f64,
    z: f64,
}

/// Maps unit-square points of model surfaces onto the real envelope
pub struct Projector<'a> {
    orientation: &'a Orientation,
    model: &'a ModelGeometry,
    footprint: &'a [Point2<f64>],
    real_height: f64,
    real_pitch: f64,
    high_fidelity_roof: bool,
}

impl<'a> Projector<'a> {
    /// `footprint` must be the building's counter-clockwise footprint
    pub fn new(
        building: &Building,
        footprint: &'a [Point2<f64>],
        orientation: &'a Orientation,
        model: &'a ModelGeometry,
        high_fidelity_roof: bool,
    ) -> Self {
        Self {
            orientation,
            model,
            footprint,
            real_height: building.height,
            real_pitch: building.roof.pitch,
            high_fidelity_roof,
        }
    }

    fn model_corners(&self) -> [Point2<f64>; 4] {
        let a = self.model.depth * 0.5;
        let b = self.model.breadth * 0.5;
        [
            Point2::new(-a, -b),
            Point2::new(a, -b),
            Point2::new(a, b),
            Point2::new(-a, b),
        ]
    }

    /// Point on the full-scale model
    fn on_model(&self, kind: &SurfaceKind, p: &Point2<f64>) -> FramePoint {
        let model = self.model;
        match *kind {
            SurfaceKind::Wall { face, .. } => {
                let (start, end) = face_edge(&self.model_corners(), face);
                let at = start + (end - start) * p.x;
                FramePoint {
                    u: at.x,
                    v: at.y,
                    z: p.y * model.height,
                }
            }
            SurfaceKind::Roof { plane } => {
                let half = model.breadth * 0.5;
                let u = (p.x - 0.5) * model.depth;
                let v = match plane {
                    RoofPlane::Whole => (p.y - 0.5) * model.breadth,
                    RoofPlane::MinusY => (p.y - 1.0) * half,
                    RoofPlane::PlusY => p.y * half,
                };
                let rise = model
                    .pitch
                    .map_or(0.0, |pitch| (half - v.abs()) * pitch.to_radians().tan());
                FramePoint {
                    u,
                    v,
                    z: model.height + rise,
                }
            }
        }
    }

    /// Stretch a model point onto the true rectangle and eave height
    fn correct_inexact(&self, kind: &SurfaceKind, fp: FramePoint) -> FramePoint {
        let model = self.model;
        let length = self.orientation.length;
        let depth_scale = length / model.depth;
        match *kind {
            SurfaceKind::Wall { face, .. } => {
                let u = match face {
                    BuildingFace::MinusX => fp.u - (length - model.depth) * 0.5,
                    BuildingFace::PlusX => fp.u + (length - model.depth) * 0.5,
                    BuildingFace::MinusY | BuildingFace::PlusY => fp.u * depth_scale,
                };
                FramePoint {
                    u,
                    v: fp.v,
                    z: fp.z * self.real_height / model.height,
                }
            }
            SurfaceKind::Roof { .. } => {
                let slope_scale = match model.pitch {
                    Some(pitch) if pitch.to_radians().tan() > 0.0 => {
                        self.real_pitch.to_radians().tan() / pitch.to_radians().tan()
                    }
                    _ => 0.0,
                };
                FramePoint {
                    u: fp.u * depth_scale,
                    v: fp.v,
                    z: self.real_height + (fp.z - model.height) * slope_scale,
                }
            }
        }
    }

    /// Snap a plan point outside the true footprint onto its boundary
    fn ptap_adjust(&self, kind: &SurfaceKind, p: Point2<f64>) -> Point2<f64> {
        let snap = kind.is_wall() || self.high_fidelity_roof;
        if !snap {
            return p;
        }
        let region = [self.footprint.to_vec()];
        if distance_to_region(&p, &region) <= SNAP_TOLERANCE {
            return p;
        }
        closest_point_on_contour(&p, self.footprint).map_or(p, |(q, _, _)| q)
    }

    /// Real-world location of unit-square point `p` on surface `number`
    pub fn project_point(&self, number: u8, p: &Point2<f64>) -> Option<Point3<f64>> {
        let kind = self.model.surface(number)?.kind;
        let mut fp = self.on_model(&kind, p);
        if !self.model.exact {
            fp = self.correct_inexact(&kind, fp);
        }
        let plan = self.ptap_adjust(&kind, self.orientation.to_world(fp.u, fp.v));
        Some(Point3::new(plan.x, plan.y, fp.z))
    }

    /// Project every grid point and measured tap
    pub fn project(&self, surfaces: &InterpolatedSurfaces) -> (Vec<ProjectedTap>, Vec<ProjectedTap>) {
        let mut taps = Vec::new();
        for (number, field) in surfaces.fields.iter() {
            for (k, p) in field.points.iter().enumerate() {
                if let Some(location) = self.project_point(number, p) {
                    taps.push(ProjectedTap::new(
                        taps.len(),
                        TapSource::Grid,
                        location,
                        number,
                        field.mean_cp[k],
                        field.std_cp[k],
                    ));
                }
            }
        }

        let measured = surfaces
            .measured
            .iter()
            .filter_map(|tap| {
                let location = self.project_point(tap.surface, &tap.point)?;
                Some(ProjectedTap::new(
                    tap.index,
                    TapSource::Measured,
                    location,
                    tap.surface,
                    tap.mean_cp,
                    tap.std_cp,
                ))
            })
            .collect::<Vec<_>>();

        tracing::debug!(
            grid_taps = taps.len(),
            measured_taps = measured.len(),
            exact = self.model.exact,
            "Projected taps onto building"
        );
        (taps, measured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::building::{Roof, RoofShape};
    use crate::diagnostics::Diagnostics;
    use crate::model_geometry::build;
    use crate::orientation::resolve;
    use crate::use_case::select;
    use approx::assert_relative_eq;

    fn building(footprint: Vec<Point2<f64>>, height: f64, roof: Roof) -> Building {
        Building {
            footprint,
            height,
            stories: Vec::new(),
            roof,
            overhang: 0.0,
            envelope: Vec::new(),
            sub_elements: Vec::new(),
        }
    }

    fn rect(length: f64, breadth: f64) -> Vec<Point2<f64>> {
        vec![
            Point2::new(0.0, 0.0),
            Point2::new(length, 0.0),
            Point2::new(length, breadth),
            Point2::new(0.0, breadth),
        ]
    }

    fn setup(b: &Building, wind: f64) -> (Vec<Point2<f64>>, Orientation, ModelGeometry) {
        let footprint = b.footprint_ccw().unwrap();
        let orientation = resolve(&footprint, wind).unwrap();
        let mut diagnostics = Diagnostics::new();
        let case = select(
            b.height,
            orientation.length,
            orientation.breadth,
            &b.roof,
            orientation.tpu_direction,
            1e-6,
            &mut diagnostics,
        )
        .unwrap();
        let model = build(b, &orientation, &case).unwrap();
        (footprint, orientation, model)
    }

    const FLAT: Roof = Roof {
        shape: RoofShape::Flat,
        pitch: 0.0,
    };

    fn assert_point(a: Point3<f64>, b: Point3<f64>) {
        assert_relative_eq!(a.x, b.x, epsilon = 1e-9);
        assert_relative_eq!(a.y, b.y, epsilon = 1e-9);
        assert_relative_eq!(a.z, b.z, epsilon = 1e-9);
    }

    #[test]
    fn test_shared_corner_lands_on_envelope_corner() {
        for wind in [0.0, 100.0, 200.0, 300.0] {
            for (length, height) in [(20.0, 5.0), (23.0, 6.0)] {
                let b = building(rect(length, 10.0), height, FLAT);
                let (footprint, orientation, model) = setup(&b, wind);
                let projector = Projector::new(&b, &footprint, &orientation, &model, false);
                // Every wall's top corners meet the roof corners and a neighbouring wall
                let mut corners: Vec<Point3<f64>> = Vec::new();
                for number in 1..=4u8 {
                    corners.push(projector.project_point(number, &Point2::new(0.0, 1.0)).unwrap());
                    corners.push(projector.project_point(number, &Point2::new(1.0, 1.0)).unwrap());
                }
                for c in &corners {
                    let on_real = rect(length, 10.0)
                        .iter()
                        .any(|p| (p.x - c.x).abs() < 1e-9 && (p.y - c.y).abs() < 1e-9);
                    assert!(on_real, "corner {:?} not on envelope", c);
                    assert_relative_eq!(c.z, height, epsilon = 1e-9);
                    let shared = corners.iter().filter(|d| (*d - c).norm() < 1e-9).count();
                    assert_eq!(shared, 2);
                }
            }
        }
    }

    #[test]
    fn test_roof_corner_matches_wall_corner() {
        let b = building(rect(23.0, 10.0), 6.0, FLAT);
        let (footprint, orientation, model) = setup(&b, 270.0);
        let projector = Projector::new(&b, &footprint, &orientation, &model, false);
        let roof = projector.project_point(5, &Point2::new(0.0, 0.0)).unwrap();
        assert_point(roof, Point3::new(0.0, 0.0, 6.0));
        let roof = projector.project_point(5, &Point2::new(1.0, 1.0)).unwrap();
        assert_point(roof, Point3::new(23.0, 10.0, 6.0));
    }

    #[test]
    fn test_gable_ridge_uses_real_pitch() {
        let roof = Roof {
            shape: RoofShape::Gable,
            pitch: 40.0,
        };
        let b = building(rect(15.0, 10.0), 5.0, roof);
        let (footprint, orientation, model) = setup(&b, 270.0);
        assert!(!model.exact);
        let projector = Projector::new(&b, &footprint, &orientation, &model, false);
        let ridge = projector.project_point(5, &Point2::new(0.5, 1.0)).unwrap();
        assert_relative_eq!(ridge.z, 5.0 + 5.0 * 40f64.to_radians().tan(), epsilon = 1e-9);
        assert_relative_eq!(ridge.y, 5.0, epsilon = 1e-9);
    }

    #[test]
    fn test_facade_taps_snap_onto_l_shaped_footprint() {
        let footprint = vec![
            Point2::new(0.0, 0.0),
            Point2::new(20.0, 0.0),
            Point2::new(20.0, 5.0),
            Point2::new(10.0, 5.0),
            Point2::new(10.0, 10.0),
            Point2::new(0.0, 10.0),
        ];
        let b = building(footprint, 5.0, FLAT);
        let (footprint, orientation, model) = setup(&b, 270.0);
        let projector = Projector::new(&b, &footprint, &orientation, &model, false);
        let region = [footprint.clone()];
        for number in 1..=4u8 {
            for p in crate::interpolation::unit_grid(5) {
                let q = projector.project_point(number, &p).unwrap();
                let d = distance_to_region(&Point2::new(q.x, q.y), &region);
                assert!(d < 1e-9);
                let boundary = cpmap_geometry::polygon::distance_to_contour(&Point2::new(q.x, q.y), &footprint);
                assert!(boundary < 1e-9);
            }
        }
        // Idealized roof keeps the rectangle corner; high fidelity pulls it in
        let corner = projector.project_point(5, &Point2::new(1.0, 1.0)).unwrap();
        assert_point(corner, Point3::new(20.0, 10.0, 5.0));
        let hifi = Projector::new(&b, &footprint, &orientation, &model, true);
        let corner = hifi.project_point(5, &Point2::new(1.0, 1.0)).unwrap();
        assert!(distance_to_region(&Point2::new(corner.x, corner.y), &region) < 1e-9);
    }
}
