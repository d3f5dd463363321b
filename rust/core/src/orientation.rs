// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Orientation resolver
//!
//! Converts a meteorological wind direction and a footprint into the
//! wind-tunnel convention. The building frame has its x axis along the long
//! side of the minimum-area bounding rectangle, rotated by θ ∈ [0, 180) from
//! global +X, and its y axis 90° counter-clockwise from it. The tunnel
//! direction is the flow direction in that frame, measured counter-clockwise
//! from the x axis.

use crate::error::{Error, Result};
use cpmap_geometry::{min_area_rectangle, Rectangle};
use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

const ANGLE_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sense {
    Positive,
    Negative,
}

/// Real-world axis closest to the building x axis and its sense
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AxisAlignment {
    pub axis: Axis,
    pub sense: Sense,
}

impl AxisAlignment {
    /// Quarter turns from global +X to the aligned axis
    pub fn quarter_turns(&self) -> usize {
        match (self.axis, self.sense) {
            (Axis::X, Sense::Positive) => 0,
            (Axis::Y, Sense::Positive) => 1,
            (Axis::X, Sense::Negative) => 2,
            (Axis::Y, Sense::Negative) => 3,
        }
    }

    pub const ALL: [AxisAlignment; 4] = [
        AxisAlignment {
            axis: Axis::X,
            sense: Sense::Positive,
        },
        AxisAlignment {
            axis: Axis::X,
            sense: Sense::Negative,
        },
        AxisAlignment {
            axis: Axis::Y,
            sense: Sense::Positive,
        },
        AxisAlignment {
            axis: Axis::Y,
            sense: Sense::Negative,
        },
    ];
}

/// Compass face named after the global direction of its outward normal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompassFace {
    West,
    South,
    East,
    North,
}

impl CompassFace {
    pub const ALL: [CompassFace; 4] = [
        CompassFace::West,
        CompassFace::South,
        CompassFace::East,
        CompassFace::North,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Footprint face named after its outward normal in the building frame
///
/// Faces are listed counter-clockwise starting at -x.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildingFace {
    MinusX,
    MinusY,
    PlusX,
    PlusY,
}

impl BuildingFace {
    pub const ALL: [BuildingFace; 4] = [
        BuildingFace::MinusX,
        BuildingFace::MinusY,
        BuildingFace::PlusX,
        BuildingFace::PlusY,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Self {
        Self::ALL[index % 4]
    }

    /// Faces perpendicular to the long axis
    pub fn is_end(self) -> bool {
        matches!(self, BuildingFace::MinusX | BuildingFace::PlusX)
    }

    /// Compass face this building face looks towards
    pub fn compass(self, alignment: AxisAlignment) -> CompassFace {
        CompassFace::ALL[(self.index() + alignment.quarter_turns()) % 4]
    }
}

/// Quadrant of the tunnel direction and the reflection mapping it onto the
/// stored 0-90° data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quadrant {
    Q0,
    Q1,
    Q2,
    Q3,
}

impl Quadrant {
    pub const ALL: [Quadrant; 4] = [Quadrant::Q0, Quadrant::Q1, Quadrant::Q2, Quadrant::Q3];

    /// Quadrant of `direction` (degrees, [0, 360)) and the folded stored direction
    pub fn fold(direction: f64) -> (Quadrant, f64) {
        let phi = normalize_degrees(direction);
        if phi <= 90.0 {
            (Quadrant::Q0, phi)
        } else if phi <= 180.0 {
            (Quadrant::Q1, 180.0 - phi)
        } else if phi < 270.0 {
            (Quadrant::Q2, phi - 180.0)
        } else {
            (Quadrant::Q3, 360.0 - phi)
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn mirrors_x(self) -> bool {
        matches!(self, Quadrant::Q1 | Quadrant::Q2)
    }

    pub fn mirrors_y(self) -> bool {
        matches!(self, Quadrant::Q2 | Quadrant::Q3)
    }

    /// Sign applied to stored x and y coordinates
    pub fn signs(self) -> (f64, f64) {
        (
            if self.mirrors_x() { -1.0 } else { 1.0 },
            if self.mirrors_y() { -1.0 } else { 1.0 },
        )
    }

    /// Walls reverse their along-face coordinate under a single mirror
    pub fn flips_walls(self) -> bool {
        self.mirrors_x() != self.mirrors_y()
    }

    /// Quadrant of the direction rotated by 180°
    pub fn opposite(self) -> Quadrant {
        Self::ALL[(self.index() + 2) % 4]
    }
}

/// One edge of the minimum-area bounding rectangle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SideLine {
    pub face: BuildingFace,
    /// Start corner walking the rectangle counter-clockwise
    pub start: Point2<f64>,
    pub end: Point2<f64>,
    pub length: f64,
    /// `X` for sides along the long axis
    pub tunnel_axis: Axis,
    /// `X` when the side runs closer to global X
    pub real_axis: Axis,
    pub compass: CompassFace,
}

impl SideLine {
    pub fn direction(&self) -> Vector2<f64> {
        (self.end - self.start) / self.length
    }
}

/// Result of resolving a footprint against a wind direction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Orientation {
    /// Rotation of the long side from global +X, degrees in [0, 180)
    pub theta: f64,
    pub wind_direction: f64,
    /// Flow direction in the building frame, degrees in [0, 360)
    pub tpu_direction: f64,
    pub center: Point2<f64>,
    /// Long side
    pub length: f64,
    /// Short side
    pub breadth: f64,
    pub alignment: AxisAlignment,
    pub sides: [SideLine; 4],
}

impl Orientation {
    pub fn x_axis(&self) -> Vector2<f64> {
        let (s, c) = self.theta.to_radians().sin_cos();
        Vector2::new(c, s)
    }

    pub fn y_axis(&self) -> Vector2<f64> {
        let x = self.x_axis();
        Vector2::new(-x.y, x.x)
    }

    /// Global point from building-frame coordinates
    pub fn to_world(&self, u: f64, v: f64) -> Point2<f64> {
        self.center + self.x_axis() * u + self.y_axis() * v
    }

    /// Building-frame coordinates of a global point
    pub fn to_frame(&self, p: &Point2<f64>) -> (f64, f64) {
        let d = p - self.center;
        (d.dot(&self.x_axis()), d.dot(&self.y_axis()))
    }

    pub fn side(&self, face: BuildingFace) -> &SideLine {
        &self.sides[face.index()]
    }

    /// Bounding rectangle corners, counter-clockwise from (-x, -y)
    pub fn corners(&self) -> [Point2<f64>; 4] {
        [
            self.sides[1].start,
            self.sides[2].start,
            self.sides[3].start,
            self.sides[0].start,
        ]
    }
}

/// Normalize an angle in degrees to [0, 360)
pub fn normalize_degrees(angle: f64) -> f64 {
    let a = angle.rem_euclid(360.0);
    if a >= 360.0 - ANGLE_EPSILON {
        0.0
    } else {
        a
    }
}

/// Flow direction in the building frame for a meteorological wind direction
pub fn tpu_direction(wind_direction: f64, theta: f64) -> f64 {
    normalize_degrees(-wind_direction + 270.0 - theta)
}

/// Angle of the rectangle's long side in [0, 180), preferring the smaller
/// angle when both sides have the same length
pub fn building_rotation(rect: &Rectangle) -> f64 {
    let e0 = rect.corners[1] - rect.corners[0];
    let e1 = rect.corners[2] - rect.corners[1];
    let (l0, l1) = (e0.norm(), e1.norm());
    let half_turn = |e: &Vector2<f64>| {
        let a = e.y.atan2(e.x).to_degrees().rem_euclid(180.0);
        if a >= 180.0 - ANGLE_EPSILON {
            0.0
        } else {
            a
        }
    };

    if (l0 - l1).abs() <= ANGLE_EPSILON * l0.max(l1) {
        half_turn(&e0).min(half_turn(&e1))
    } else if l0 > l1 {
        half_turn(&e0)
    } else {
        half_turn(&e1)
    }
}

/// Real axis closest to the direction `theta`; ties go to X
pub fn axis_alignment(theta: f64) -> AxisAlignment {
    let (s, c) = theta.to_radians().sin_cos();
    if c.abs() >= s.abs() - ANGLE_EPSILON {
        AxisAlignment {
            axis: Axis::X,
            sense: if c >= 0.0 {
                Sense::Positive
            } else {
                Sense::Negative
            },
        }
    } else {
        AxisAlignment {
            axis: Axis::Y,
            sense: if s >= 0.0 {
                Sense::Positive
            } else {
                Sense::Negative
            },
        }
    }
}

/// Resolve the building frame and tunnel direction for one wind direction
pub fn resolve(footprint: &[Point2<f64>], wind_direction: f64) -> Result<Orientation> {
    if footprint.len() < 3 {
        return Err(Error::DegenerateFootprint(format!(
            "footprint has {} vertices",
            footprint.len()
        )));
    }
    let rect = min_area_rectangle(footprint)
        .map_err(|e| Error::DegenerateFootprint(e.to_string()))?;

    let theta = building_rotation(&rect);
    let center = rect.center();
    let (l0, l1) = (rect.edge_length(0), rect.edge_length(1));
    let (length, breadth) = if l0 >= l1 { (l0, l1) } else { (l1, l0) };

    let alignment = axis_alignment(theta);
    let (s, c) = theta.to_radians().sin_cos();
    let x_axis = Vector2::new(c, s);
    let y_axis = Vector2::new(-s, c);
    let (a, b) = (length * 0.5, breadth * 0.5);
    let corner = |u: f64, v: f64| center + x_axis * u + y_axis * v;
    let k = [corner(-a, -b), corner(a, -b), corner(a, b), corner(-a, b)];

    let side = |face: BuildingFace, start: Point2<f64>, end: Point2<f64>, length: f64| {
        let d = end - start;
        SideLine {
            face,
            start,
            end,
            length,
            tunnel_axis: if face.is_end() { Axis::Y } else { Axis::X },
            real_axis: if d.x.abs() >= d.y.abs() { Axis::X } else { Axis::Y },
            compass: face.compass(alignment),
        }
    };
    let sides = [
        side(BuildingFace::MinusX, k[3], k[0], breadth),
        side(BuildingFace::MinusY, k[0], k[1], length),
        side(BuildingFace::PlusX, k[1], k[2], breadth),
        side(BuildingFace::PlusY, k[2], k[3], length),
    ];

    let tpu = tpu_direction(wind_direction, theta);
    tracing::debug!(
        theta = theta,
        wind_direction = wind_direction,
        tpu_direction = tpu,
        length = length,
        breadth = breadth,
        "Resolved building orientation"
    );

    Ok(Orientation {
        theta,
        wind_direction,
        tpu_direction: tpu,
        center,
        length,
        breadth,
        alignment,
        sides,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn rectangle(length: f64, breadth: f64, angle: f64) -> Vec<Point2<f64>> {
        let (s, c) = angle.to_radians().sin_cos();
        [(0.0, 0.0), (length, 0.0), (length, breadth), (0.0, breadth)]
            .iter()
            .map(|&(x, y)| Point2::new(c * x - s * y + 3.0, s * x + c * y - 2.0))
            .collect()
    }

    #[test]
    fn test_tpu_direction_formula() {
        assert_relative_eq!(tpu_direction(270.0, 0.0), 0.0);
        assert_relative_eq!(tpu_direction(0.0, 0.0), 270.0);
        assert_relative_eq!(tpu_direction(180.0, 0.0), 90.0);
        assert_relative_eq!(tpu_direction(300.0, 10.0), 320.0);
    }

    #[test]
    fn test_axis_aligned_rectangle() {
        let o = resolve(&rectangle(20.0, 10.0, 0.0), 270.0).unwrap();
        assert_relative_eq!(o.theta, 0.0, epsilon = 1e-9);
        assert_relative_eq!(o.length, 20.0, epsilon = 1e-9);
        assert_relative_eq!(o.breadth, 10.0, epsilon = 1e-9);
        assert_relative_eq!(o.tpu_direction, 0.0, epsilon = 1e-9);
        assert_eq!(o.side(BuildingFace::MinusX).compass, CompassFace::West);
        assert_eq!(o.side(BuildingFace::MinusY).tunnel_axis, Axis::X);
        assert_eq!(o.side(BuildingFace::PlusX).tunnel_axis, Axis::Y);
    }

    #[test]
    fn test_rotated_rectangle_offsets_tpu_by_rotation() {
        let wind = 200.0;
        let straight = resolve(&rectangle(20.0, 10.0, 0.0), wind).unwrap();
        let rotated = resolve(&rectangle(20.0, 10.0, 45.0), wind).unwrap();
        assert_relative_eq!(rotated.theta, 45.0, epsilon = 1e-9);
        let offset = normalize_degrees(straight.tpu_direction - rotated.tpu_direction);
        assert_relative_eq!(offset, 45.0, epsilon = 1e-9);
    }

    #[test]
    fn test_long_side_vertical() {
        let o = resolve(&rectangle(20.0, 10.0, 90.0), 0.0).unwrap();
        assert_relative_eq!(o.theta, 90.0, epsilon = 1e-9);
        assert_eq!(
            o.alignment,
            AxisAlignment {
                axis: Axis::Y,
                sense: Sense::Positive
            }
        );
        assert_eq!(o.side(BuildingFace::MinusX).compass, CompassFace::South);
    }

    #[test]
    fn test_square_prefers_smaller_angle() {
        let o = resolve(&rectangle(10.0, 10.0, 120.0), 0.0).unwrap();
        assert_relative_eq!(o.theta, 30.0, epsilon = 1e-9);
    }

    #[test]
    fn test_sides_walk_counter_clockwise() {
        let o = resolve(&rectangle(12.0, 6.0, 30.0), 90.0).unwrap();
        for i in 0..4 {
            let side = &o.sides[i];
            let next = &o.sides[(i + 1) % 4];
            assert!((side.end - next.start).norm() < 1e-9);
        }
        let corners = o.corners();
        let area = cpmap_geometry::compute_signed_area(&corners);
        assert_relative_eq!(area, 72.0, epsilon = 1e-9);
    }

    #[test]
    fn test_quadrant_folding() {
        assert_eq!(Quadrant::fold(0.0), (Quadrant::Q0, 0.0));
        assert_eq!(Quadrant::fold(90.0), (Quadrant::Q0, 90.0));
        assert_eq!(Quadrant::fold(120.0), (Quadrant::Q1, 60.0));
        assert_eq!(Quadrant::fold(180.0), (Quadrant::Q1, 0.0));
        assert_eq!(Quadrant::fold(200.0), (Quadrant::Q2, 20.0));
        assert_eq!(Quadrant::fold(270.0), (Quadrant::Q3, 90.0));
        assert_eq!(Quadrant::fold(350.0), (Quadrant::Q3, 10.0));
        assert!(Quadrant::Q1.flips_walls());
        assert!(!Quadrant::Q2.flips_walls());
    }

    #[test]
    fn test_degenerate_footprint() {
        let line = vec![Point2::new(0.0, 0.0), Point2::new(5.0, 0.0), Point2::new(9.0, 0.0)];
        assert!(matches!(resolve(&line, 0.0), Err(Error::DegenerateFootprint(_))));
        assert!(matches!(resolve(&line[..2], 0.0), Err(Error::DegenerateFootprint(_))));
    }
}
