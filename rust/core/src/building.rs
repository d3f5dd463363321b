// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Building description supplied by callers.
//!
//! Coordinates are in a local planar system in metres with z up. The core
//! never mutates a [`Building`]; it only reads the footprint, heights, roof
//! and sub-element polygons.

use crate::error::{Error, Result};
use cpmap_geometry::polygon::{compute_signed_area, dedup_contour, ensure_ccw};
use nalgebra::{Point2, Point3};
use serde::{Deserialize, Serialize};

/// Roof form of the building and of the reference models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoofShape {
    Flat,
    Gable,
    Hip,
}

impl RoofShape {
    /// Number of numbered surfaces on a reference model of this shape
    pub fn surface_count(self) -> usize {
        match self {
            RoofShape::Flat => 5,
            RoofShape::Gable => 6,
            RoofShape::Hip => 8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Roof {
    pub shape: RoofShape,
    /// Pitch in degrees (ignored for flat roofs)
    #[serde(default)]
    pub pitch: f64,
}

/// Elevation bounds of one story.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Story {
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubElementKind {
    RoofPanel,
    WallPanel,
}

/// Concrete structural component that can carry tap loads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubElement {
    pub id: String,
    pub kind: SubElementKind,
    pub polygon: Vec<Point3<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Building {
    /// Footprint vertices in any winding
    pub footprint: Vec<Point2<f64>>,
    /// Eave height
    pub height: f64,
    #[serde(default)]
    pub stories: Vec<Story>,
    pub roof: Roof,
    /// Eave overhang length; only zero is supported
    #[serde(default)]
    pub overhang: f64,
    #[serde(default)]
    pub envelope: Vec<Vec<Point3<f64>>>,
    #[serde(default)]
    pub sub_elements: Vec<SubElement>,
}

impl Building {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let building: Building = serde_json::from_str(json)?;
        building.validate()?;
        Ok(building)
    }

    /// Reject inputs the pipeline cannot interpret at all
    pub fn validate(&self) -> Result<()> {
        if !(self.height.is_finite() && self.height > 0.0) {
            return Err(Error::InvalidBuilding(format!(
                "eave height must be positive, got {}",
                self.height
            )));
        }
        if self
            .footprint
            .iter()
            .any(|p| !p.x.is_finite() || !p.y.is_finite())
        {
            return Err(Error::DegenerateFootprint(
                "footprint contains non-finite coordinates".to_string(),
            ));
        }
        if self.roof.shape != RoofShape::Flat
            && !(self.roof.pitch.is_finite() && self.roof.pitch > 0.0 && self.roof.pitch < 90.0)
        {
            return Err(Error::InvalidBuilding(format!(
                "{:?} roof pitch must be in (0, 90) degrees, got {}",
                self.roof.shape, self.roof.pitch
            )));
        }
        for story in &self.stories {
            if !(story.lower.is_finite() && story.upper.is_finite() && story.lower < story.upper) {
                return Err(Error::InvalidBuilding(format!(
                    "story bounds {}..{} are not increasing",
                    story.lower, story.upper
                )));
            }
        }
        Ok(())
    }

    /// Footprint without repeated vertices, counter-clockwise
    pub fn footprint_ccw(&self) -> Result<Vec<Point2<f64>>> {
        let contour = dedup_contour(&self.footprint);
        if contour.len() < 3 {
            return Err(Error::DegenerateFootprint(format!(
                "footprint has {} distinct vertices",
                contour.len()
            )));
        }
        if compute_signed_area(&contour).abs() <= f64::EPSILON {
            return Err(Error::DegenerateFootprint(
                "footprint has zero area".to_string(),
            ));
        }
        Ok(ensure_ccw(&contour))
    }

    pub fn sub_elements_of(&self, kind: SubElementKind) -> impl Iterator<Item = &SubElement> {
        self.sub_elements.iter().filter(move |e| e.kind == kind)
    }
}
