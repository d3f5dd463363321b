// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Model geometry builder
//!
//! Rebuilds the selected reference model at full scale, aligned with the real
//! building, and numbers its surfaces in the wind-tunnel convention.
//!
//! Surface numbering is a lookup keyed by the real axis closest to the
//! building x axis, its sense, and the quadrant of the tunnel direction. Each
//! entry gives the surface number of the walls facing [W, S, E, N].

use crate::building::{Building, RoofShape};
use crate::error::{Error, Result};
use crate::orientation::{
    Axis, AxisAlignment, BuildingFace, CompassFace, Orientation, Quadrant, Sense,
};
use crate::surfaces::{RoofPlane, SurfaceGeometry, SurfaceKind, SurfaceMap};
use crate::use_case::UseCase;
use nalgebra::{Point2, Point3};
use serde::{Deserialize, Serialize};

/// One row of the facade numbering table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceTableEntry {
    pub axis: Axis,
    pub sense: Sense,
    pub quadrant: Quadrant,
    /// Surface numbers of the walls facing [W, S, E, N]
    pub surfaces: [u8; 4],
}

const fn entry(axis: Axis, sense: Sense, quadrant: Quadrant, surfaces: [u8; 4]) -> SurfaceTableEntry {
    SurfaceTableEntry {
        axis,
        sense,
        quadrant,
        surfaces,
    }
}

/// Rows ordered by alignment quarter turns, then quadrant
pub const SURFACE_TABLE: [SurfaceTableEntry; 16] = {
    use Axis::{X, Y};
    use Quadrant::{Q0, Q1, Q2, Q3};
    use Sense::{Negative as Neg, Positive as Pos};
    [
        entry(X, Pos, Q0, [1, 2, 3, 4]),
        entry(X, Pos, Q1, [3, 2, 1, 4]),
        entry(X, Pos, Q2, [3, 4, 1, 2]),
        entry(X, Pos, Q3, [1, 4, 3, 2]),
        entry(Y, Pos, Q0, [4, 1, 2, 3]),
        entry(Y, Pos, Q1, [4, 3, 2, 1]),
        entry(Y, Pos, Q2, [2, 3, 4, 1]),
        entry(Y, Pos, Q3, [2, 1, 4, 3]),
        entry(X, Neg, Q0, [3, 4, 1, 2]),
        entry(X, Neg, Q1, [1, 4, 3, 2]),
        entry(X, Neg, Q2, [1, 2, 3, 4]),
        entry(X, Neg, Q3, [3, 2, 1, 4]),
        entry(Y, Neg, Q0, [2, 3, 4, 1]),
        entry(Y, Neg, Q1, [2, 1, 4, 3]),
        entry(Y, Neg, Q2, [4, 1, 2, 3]),
        entry(Y, Neg, Q3, [4, 3, 2, 1]),
    ]
};

/// Facade surface numbers for the walls facing [W, S, E, N]
pub fn facade_surfaces(alignment: AxisAlignment, quadrant: Quadrant) -> [u8; 4] {
    SURFACE_TABLE[alignment.quarter_turns() * 4 + quadrant.index()].surfaces
}

/// Surface number carried by a building face
pub fn surface_of_face(alignment: AxisAlignment, quadrant: Quadrant, face: BuildingFace) -> u8 {
    facade_surfaces(alignment, quadrant)[face.compass(alignment).index()]
}

/// Building face carrying wall surface `number` (1 to 4)
pub fn face_of_surface(alignment: AxisAlignment, quadrant: Quadrant, number: u8) -> BuildingFace {
    let row = facade_surfaces(alignment, quadrant);
    let compass = row.iter().position(|&s| s == number).unwrap_or(0);
    BuildingFace::from_index(compass + 4 - alignment.quarter_turns())
}

/// Roof plane carrying roof surface `number`
pub fn roof_plane(shape: RoofShape, quadrant: Quadrant, number: u8) -> RoofPlane {
    match shape {
        RoofShape::Gable => {
            let first_is_minus_y = !quadrant.mirrors_y();
            if (number == 5) == first_is_minus_y {
                RoofPlane::MinusY
            } else {
                RoofPlane::PlusY
            }
        }
        RoofShape::Flat | RoofShape::Hip => RoofPlane::Whole,
    }
}

/// Reference model rebuilt at full scale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelGeometry {
    /// Dimensions are the real building's own
    pub exact: bool,
    pub breadth: f64,
    pub height: f64,
    pub depth: f64,
    /// Roof pitch of the model in degrees (gable only)
    pub pitch: Option<f64>,
    pub ridge_height: Option<f64>,
    /// Model footprint, counter-clockwise from the (-x, -y) corner
    pub footprint: [Point2<f64>; 4],
    pub surfaces: SurfaceMap<SurfaceGeometry>,
}

impl ModelGeometry {
    pub fn surface(&self, number: u8) -> Option<&SurfaceGeometry> {
        self.surfaces.get(number)
    }
}

/// Start and end corner of a building face on a CCW rectangle
pub fn face_edge(corners: &[Point2<f64>; 4], face: BuildingFace) -> (Point2<f64>, Point2<f64>) {
    match face {
        BuildingFace::MinusX => (corners[3], corners[0]),
        BuildingFace::MinusY => (corners[0], corners[1]),
        BuildingFace::PlusX => (corners[1], corners[2]),
        BuildingFace::PlusY => (corners[2], corners[3]),
    }
}

/// Model footprint obtained by moving the two short sides along the
/// building axis until the rectangle is `depth` long
fn model_footprint(orientation: &Orientation, depth: f64) -> [Point2<f64>; 4] {
    let x_axis = orientation.x_axis();
    let delta = (depth - orientation.length) * 0.5;
    let shift = |face: BuildingFace| {
        let side = orientation.side(face);
        let outward = if face == BuildingFace::MinusX {
            -x_axis
        } else {
            x_axis
        };
        (side.start + outward * delta, side.end + outward * delta)
    };
    let (k3, k0) = shift(BuildingFace::MinusX);
    let (k1, k2) = shift(BuildingFace::PlusX);
    [k0, k1, k2, k3]
}

fn lift(p: &Point2<f64>, z: f64) -> Point3<f64> {
    Point3::new(p.x, p.y, z)
}

/// Build the full-scale model for the selected use case
pub fn build(
    building: &Building,
    orientation: &Orientation,
    use_case: &UseCase,
) -> Result<ModelGeometry> {
    if use_case.roof == RoofShape::Hip {
        return Err(Error::UnsupportedGeometry(
            "hip roof models are not supported".to_string(),
        ));
    }
    if building.overhang != 0.0 {
        return Err(Error::UnsupportedGeometry(format!(
            "eave overhang of {} is not supported",
            building.overhang
        )));
    }

    let breadth = orientation.breadth;
    let (height, depth) = if use_case.match_flag {
        (building.height, orientation.length)
    } else {
        (use_case.height_ratio * breadth, use_case.depth_ratio * breadth)
    };
    let pitch = match use_case.roof {
        RoofShape::Gable if use_case.match_flag => Some(building.roof.pitch),
        RoofShape::Gable => use_case.pitch,
        RoofShape::Flat | RoofShape::Hip => None,
    };
    let ridge_height = pitch.map(|p| height + breadth * 0.5 * p.to_radians().tan());

    let footprint = model_footprint(orientation, depth);
    let alignment = orientation.alignment;
    let quadrant = use_case.quadrant;
    let x_axis = orientation.x_axis();
    let ridge = [
        orientation.center - x_axis * (depth * 0.5),
        orientation.center + x_axis * (depth * 0.5),
    ];

    let surfaces = SurfaceMap::from_fn(use_case.roof, |number| {
        if number <= 4 {
            let face = face_of_surface(alignment, quadrant, number);
            let (start, end) = face_edge(&footprint, face);
            return SurfaceGeometry {
                number,
                kind: SurfaceKind::Wall {
                    face,
                    compass: face.compass(alignment),
                },
                polygon: vec![
                    lift(&start, 0.0),
                    lift(&end, 0.0),
                    lift(&end, height),
                    lift(&start, height),
                ],
                base: Some([lift(&start, 0.0), lift(&end, 0.0)]),
            };
        }

        let plane = roof_plane(use_case.roof, quadrant, number);
        let z_ridge = ridge_height.unwrap_or(height);
        let polygon: Vec<Point3<f64>> = match plane {
            RoofPlane::Whole => footprint.iter().map(|p| lift(p, height)).collect(),
            RoofPlane::MinusY => vec![
                lift(&footprint[0], height),
                lift(&footprint[1], height),
                lift(&ridge[1], z_ridge),
                lift(&ridge[0], z_ridge),
            ],
            RoofPlane::PlusY => vec![
                lift(&ridge[0], z_ridge),
                lift(&ridge[1], z_ridge),
                lift(&footprint[2], height),
                lift(&footprint[3], height),
            ],
        };
        SurfaceGeometry {
            number,
            kind: SurfaceKind::Roof { plane },
            polygon,
            base: None,
        }
    });

    tracing::debug!(
        exact = use_case.match_flag,
        breadth = breadth,
        height = height,
        depth = depth,
        surfaces = surfaces.len(),
        "Built full-scale model geometry"
    );

    Ok(ModelGeometry {
        exact: use_case.match_flag,
        breadth,
        height,
        depth,
        pitch,
        ridge_height,
        footprint,
        surfaces,
    })
}

/// Compass face of a wall surface, if the number belongs to a wall
pub fn compass_of_surface(model: &ModelGeometry, number: u8) -> Option<CompassFace> {
    match model.surface(number)?.kind {
        SurfaceKind::Wall { compass, .. } => Some(compass),
        SurfaceKind::Roof { .. } => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::building::Roof;
    use crate::diagnostics::Diagnostics;
    use crate::orientation::resolve;
    use crate::use_case::select;
    use approx::assert_relative_eq;

    fn building(length: f64, breadth: f64, height: f64, roof: Roof) -> Building {
        Building {
            footprint: vec![
                Point2::new(0.0, 0.0),
                Point2::new(length, 0.0),
                Point2::new(length, breadth),
                Point2::new(0.0, breadth),
            ],
            height,
            stories: Vec::new(),
            roof,
            overhang: 0.0,
            envelope: Vec::new(),
            sub_elements: Vec::new(),
        }
    }

    fn model_for(b: &Building, wind: f64) -> ModelGeometry {
        let orientation = resolve(&b.footprint, wind).unwrap();
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
        build(b, &orientation, &case).unwrap()
    }

    const FLAT: Roof = Roof {
        shape: RoofShape::Flat,
        pitch: 0.0,
    };

    #[test]
    fn test_table_rows_are_keyed_in_order() {
        for alignment in AxisAlignment::ALL {
            for quadrant in Quadrant::ALL {
                let row = SURFACE_TABLE[alignment.quarter_turns() * 4 + quadrant.index()];
                assert_eq!((row.axis, row.sense, row.quadrant), (alignment.axis, alignment.sense, quadrant));
                let mut sorted = row.surfaces;
                sorted.sort_unstable();
                assert_eq!(sorted, [1, 2, 3, 4]);
            }
        }
    }

    #[test]
    fn test_surface_one_faces_along_axis_flow() {
        for alignment in AxisAlignment::ALL {
            for quadrant in Quadrant::ALL {
                let windward = if quadrant.mirrors_x() {
                    BuildingFace::PlusX
                } else {
                    BuildingFace::MinusX
                };
                assert_eq!(surface_of_face(alignment, quadrant, windward), 1);
                assert_eq!(face_of_surface(alignment, quadrant, 1), windward);
            }
        }
    }

    #[test]
    fn test_numbering_follows_stored_rotation() {
        for alignment in AxisAlignment::ALL {
            for quadrant in Quadrant::ALL {
                for face in BuildingFace::ALL {
                    let here = surface_of_face(alignment, quadrant, face);
                    let next = surface_of_face(alignment, quadrant, BuildingFace::from_index(face.index() + 1));
                    let expected = if quadrant.flips_walls() {
                        (here + 2) % 4 + 1
                    } else {
                        here % 4 + 1
                    };
                    assert_eq!(next, expected);
                }
            }
        }
    }

    #[test]
    fn test_half_turn_swaps_windward_and_leeward() {
        for alignment in AxisAlignment::ALL {
            for quadrant in Quadrant::ALL {
                let row = facade_surfaces(alignment, quadrant);
                let opposite = facade_surfaces(alignment, quadrant.opposite());
                for c in 0..4 {
                    assert_eq!(opposite[c], row[(c + 2) % 4]);
                }
            }
        }
        let pos = AxisAlignment { axis: Axis::X, sense: Sense::Positive };
        let neg = AxisAlignment { axis: Axis::X, sense: Sense::Negative };
        for quadrant in Quadrant::ALL {
            assert_eq!(facade_surfaces(neg, quadrant), facade_surfaces(pos, quadrant.opposite()));
        }
    }

    #[test]
    fn test_exact_match_keeps_real_dimensions() {
        let b = building(10.0, 10.0, 5.0, FLAT);
        let model = model_for(&b, 270.0);
        assert!(model.exact);
        assert_relative_eq!(model.breadth, 10.0, epsilon = 1e-9);
        assert_relative_eq!(model.depth, 10.0, epsilon = 1e-9);
        assert_relative_eq!(model.height, 5.0, epsilon = 1e-9);
        assert_relative_eq!(model.surface(5).unwrap().area(), 100.0, epsilon = 1e-9);
        assert_relative_eq!(model.surface(1).unwrap().area(), 50.0, epsilon = 1e-9);
    }

    #[test]
    fn test_inexact_match_rescales_depth_and_height() {
        let b = building(12.0, 10.0, 6.0, FLAT);
        let model = model_for(&b, 270.0);
        assert!(!model.exact);
        assert_relative_eq!(model.height, 5.0, epsilon = 1e-9);
        assert_relative_eq!(model.depth, 10.0, epsilon = 1e-9);
        let xs: Vec<f64> = model.footprint.iter().map(|p| p.x).collect();
        assert_relative_eq!(xs.iter().cloned().fold(f64::INFINITY, f64::min), 1.0, epsilon = 1e-9);
        assert_relative_eq!(xs.iter().cloned().fold(f64::NEG_INFINITY, f64::max), 11.0, epsilon = 1e-9);
    }

    #[test]
    fn test_wind_from_west_makes_west_wall_surface_one() {
        let b = building(20.0, 10.0, 5.0, FLAT);
        let model = model_for(&b, 270.0);
        assert_eq!(compass_of_surface(&model, 1), Some(CompassFace::West));
        assert_eq!(compass_of_surface(&model, 2), Some(CompassFace::South));
        let model = model_for(&b, 90.0);
        assert_eq!(compass_of_surface(&model, 1), Some(CompassFace::East));
    }

    #[test]
    fn test_gable_ridge_and_planes() {
        let roof = Roof {
            shape: RoofShape::Gable,
            pitch: 45.0,
        };
        let b = building(15.0, 10.0, 5.0, roof);
        let model = model_for(&b, 270.0);
        assert!(model.exact);
        assert_relative_eq!(model.ridge_height.unwrap(), 10.0, epsilon = 1e-9);
        let five = model.surface(5).unwrap();
        assert_eq!(five.kind, SurfaceKind::Roof { plane: RoofPlane::MinusY });
        assert_relative_eq!(five.area(), 15.0 * 50f64.sqrt(), epsilon = 1e-9);

        // Flow with a -y component mirrors y, so plane 5 moves to +y
        let model = model_for(&b, 300.0);
        let five = model.surface(5).unwrap();
        assert_eq!(five.kind, SurfaceKind::Roof { plane: RoofPlane::PlusY });
    }

    #[test]
    fn test_hip_and_overhang_are_unsupported() {
        let hip = Roof {
            shape: RoofShape::Hip,
            pitch: 30.0,
        };
        let b = building(15.0, 10.0, 5.0, hip);
        let orientation = resolve(&b.footprint, 0.0).unwrap();
        let mut diagnostics = Diagnostics::new();
        let case = select(5.0, 15.0, 10.0, &hip, orientation.tpu_direction, 1e-6, &mut diagnostics).unwrap();
        assert!(matches!(build(&b, &orientation, &case), Err(Error::UnsupportedGeometry(_))));

        let mut b = building(10.0, 10.0, 5.0, FLAT);
        b.overhang = 0.5;
        let orientation = resolve(&b.footprint, 0.0).unwrap();
        let case = select(5.0, 10.0, 10.0, &FLAT, orientation.tpu_direction, 1e-6, &mut diagnostics).unwrap();
        assert!(matches!(build(&b, &orientation, &case), Err(Error::UnsupportedGeometry(_))));
    }
}
