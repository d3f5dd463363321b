// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Numbered surfaces and per-surface storage.
//!
//! Surfaces are numbered from 1: walls 1 to 4, then the roof (5 for flat,
//! 5 and 6 for gable, 5 to 8 for hip). [`SurfaceMap`] stores one value per
//! surface in a fixed array whose length is tied to the roof shape.

use crate::building::RoofShape;
use crate::orientation::{BuildingFace, CompassFace};
use nalgebra::Point3;
use serde::{Deserialize, Serialize};

/// One value per numbered surface of a building class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceMap<T> {
    Flat([T; 5]),
    Gable([T; 6]),
    Hip([T; 8]),
}

impl<T> SurfaceMap<T> {
    /// Build a map by calling `f` with each surface number in order
    pub fn from_fn(shape: RoofShape, mut f: impl FnMut(u8) -> T) -> Self {
        match shape {
            RoofShape::Flat => SurfaceMap::Flat(std::array::from_fn(|i| f(i as u8 + 1))),
            RoofShape::Gable => SurfaceMap::Gable(std::array::from_fn(|i| f(i as u8 + 1))),
            RoofShape::Hip => SurfaceMap::Hip(std::array::from_fn(|i| f(i as u8 + 1))),
        }
    }

    pub fn shape(&self) -> RoofShape {
        match self {
            SurfaceMap::Flat(_) => RoofShape::Flat,
            SurfaceMap::Gable(_) => RoofShape::Gable,
            SurfaceMap::Hip(_) => RoofShape::Hip,
        }
    }

    fn as_slice(&self) -> &[T] {
        match self {
            SurfaceMap::Flat(a) => a,
            SurfaceMap::Gable(a) => a,
            SurfaceMap::Hip(a) => a,
        }
    }

    fn as_mut_slice(&mut self) -> &mut [T] {
        match self {
            SurfaceMap::Flat(a) => a,
            SurfaceMap::Gable(a) => a,
            SurfaceMap::Hip(a) => a,
        }
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }

    /// Value for surface `number` (1-based)
    pub fn get(&self, number: u8) -> Option<&T> {
        (number as usize)
            .checked_sub(1)
            .and_then(|i| self.as_slice().get(i))
    }

    pub fn get_mut(&mut self, number: u8) -> Option<&mut T> {
        (number as usize)
            .checked_sub(1)
            .and_then(move |i| self.as_mut_slice().get_mut(i))
    }

    /// (surface number, value) pairs in surface order
    pub fn iter(&self) -> impl Iterator<Item = (u8, &T)> {
        self.as_slice()
            .iter()
            .enumerate()
            .map(|(i, v)| (i as u8 + 1, v))
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.as_slice().iter()
    }

    pub fn map<U>(&self, mut f: impl FnMut(u8, &T) -> U) -> SurfaceMap<U> {
        let values = self.as_slice();
        SurfaceMap::from_fn(self.shape(), |n| f(n, &values[n as usize - 1]))
    }
}

/// Roof plane of a reference model in the building frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoofPlane {
    /// Whole flat cap
    Whole,
    /// Gable plane on the -y side of the ridge
    MinusY,
    /// Gable plane on the +y side of the ridge
    PlusY,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum SurfaceKind {
    Wall {
        face: BuildingFace,
        compass: CompassFace,
    },
    Roof {
        plane: RoofPlane,
    },
}

impl SurfaceKind {
    pub fn is_wall(&self) -> bool {
        matches!(self, SurfaceKind::Wall { .. })
    }
}

/// Numbered full-scale surface of the reference model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceGeometry {
    pub number: u8,
    pub kind: SurfaceKind,
    /// Counter-clockwise as seen from outside
    pub polygon: Vec<Point3<f64>>,
    /// Wall base edge from its start corner to its end corner
    pub base: Option<[Point3<f64>; 2]>,
}

impl SurfaceGeometry {
    pub fn area(&self) -> f64 {
        cpmap_geometry::polygon_area_3d(&self.polygon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_fn_numbers_from_one() {
        let map = SurfaceMap::from_fn(RoofShape::Gable, |n| n * 10);
        assert_eq!(map.len(), 6);
        assert_eq!(map.get(1), Some(&10));
        assert_eq!(map.get(6), Some(&60));
        assert_eq!(map.get(0), None);
        assert_eq!(map.get(7), None);
    }

    #[test]
    fn test_iter_and_map_preserve_shape() {
        let map = SurfaceMap::from_fn(RoofShape::Hip, |n| n);
        let numbers: Vec<u8> = map.iter().map(|(n, _)| n).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5, 6, 7, 8]);

        let doubled = map.map(|_, v| u32::from(*v) * 2);
        assert_eq!(doubled.shape(), RoofShape::Hip);
        assert_eq!(doubled.get(8), Some(&16));
    }

    #[test]
    fn test_get_mut() {
        let mut map = SurfaceMap::from_fn(RoofShape::Flat, |_| Vec::<u8>::new());
        if let Some(v) = map.get_mut(5) {
            v.push(5);
        }
        assert_eq!(map.get(5).map(|v| v.len()), Some(1));
    }
}
