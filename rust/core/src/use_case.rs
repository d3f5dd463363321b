// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Use-case selector
//!
//! Picks the reference wind-tunnel model closest to a building's
//! proportions and roof, and the stored wind direction closest to its
//! folded tunnel direction.

use crate::building::{Roof, RoofShape};
use crate::diagnostics::{Diagnostic, Diagnostics, MatchQuantity};
use crate::error::{Error, Result};
use crate::orientation::Quadrant;
use crate::surfaces::SurfaceMap;
use serde::{Deserialize, Serialize};

/// Height/breadth ratios of the reference models
pub const HEIGHT_RATIOS: [f64; 4] = [0.25, 0.5, 0.75, 1.0];

/// Depth/breadth ratios of the flat and gable reference models
pub const DEPTH_RATIOS: [f64; 3] = [1.0, 1.5, 2.5];

/// The only depth/breadth ratio measured with hip roofs
pub const HIP_DEPTH_RATIO: f64 = 1.5;

/// Roof pitches (degrees) of the gable and hip reference models
pub const PITCHES: [f64; 8] = [4.8, 9.4, 14.0, 18.4, 21.8, 26.7, 30.0, 45.0];

/// Stored wind directions (degrees) of every reference model
pub const DIRECTION_BUCKETS: [u32; 7] = [0, 15, 30, 45, 60, 75, 90];

/// Half-width of a direction bucket window
const BUCKET_HALF_WIDTH: f64 = 7.5;

/// Model breadth in centimetres, the unit of the identifier tags
const MODEL_BREADTH_CM: f64 = 16.0;

/// Catalog value chosen for a requested value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearestMatch {
    pub value: f64,
    pub exact: bool,
}

/// Nearest value of an ascending catalog; equidistant candidates resolve to
/// the smaller value
pub fn nearest_value(values: &[f64], requested: f64, tolerance: f64) -> NearestMatch {
    let mut best = values[0];
    let mut best_distance = (requested - best).abs();
    for &value in &values[1..] {
        let distance = (requested - value).abs();
        if distance < best_distance {
            best = value;
            best_distance = distance;
        }
    }
    NearestMatch {
        value: best,
        exact: best_distance <= tolerance,
    }
}

/// Stored direction bucket for a folded direction in [0, 90]
///
/// Buckets own the half-open window `[b - 7.5, b + 7.5)`, so an exact tie
/// goes to the larger bucket.
pub fn direction_bucket(direction: f64, tolerance: f64) -> (u32, bool) {
    let last = DIRECTION_BUCKETS.len() - 1;
    let slot = ((direction + BUCKET_HALF_WIDTH) / 15.0).floor();
    let index = if slot <= 0.0 {
        0
    } else {
        (slot as usize).min(last)
    };
    let bucket = DIRECTION_BUCKETS[index];
    (bucket, (direction - f64::from(bucket)).abs() <= tolerance)
}

fn half_cm_tag(ratio: f64) -> String {
    format!("{:02}", (ratio * MODEL_BREADTH_CM * 0.5).round() as u32)
}

/// Dataset identifier `Cp_ts_{g|h}{depth}{height}{roof}`
pub fn dataset_identifier(
    shape: RoofShape,
    depth_ratio: f64,
    height_ratio: f64,
    pitch: Option<f64>,
) -> String {
    let prefix = match shape {
        RoofShape::Hip => 'h',
        RoofShape::Flat | RoofShape::Gable => 'g',
    };
    let roof_tag = match (shape, pitch) {
        (RoofShape::Flat, _) | (_, None) => "00".to_string(),
        (_, Some(p)) => format!("{:02}", p.round() as u32),
    };
    format!(
        "Cp_ts_{}{}{}{}",
        prefix,
        half_cm_tag(depth_ratio),
        half_cm_tag(height_ratio),
        roof_tag
    )
}

/// Selected reference model configuration for one request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UseCase {
    pub requested_height_ratio: f64,
    pub requested_depth_ratio: f64,
    pub height_ratio: f64,
    pub depth_ratio: f64,
    pub roof: RoofShape,
    pub requested_pitch: Option<f64>,
    pub pitch: Option<f64>,
    /// Ratios and pitch all matched the catalog exactly
    pub match_flag: bool,
    pub identifier: String,
    pub direction_bucket: u32,
    /// Tunnel direction folded into [0, 90]
    pub stored_direction: f64,
    pub quadrant: Quadrant,
    pub surface_count: usize,
}

impl UseCase {
    /// Empty per-surface map sized for this building class
    pub fn placeholder_map<T: Default>(&self) -> SurfaceMap<T> {
        SurfaceMap::from_fn(self.roof, |_| T::default())
    }
}

/// Select the reference model for a building of eave `height` whose bounding
/// rectangle measures `length` by `breadth`
pub fn select(
    height: f64,
    length: f64,
    breadth: f64,
    roof: &Roof,
    tpu_direction: f64,
    tolerance: f64,
    diagnostics: &mut Diagnostics,
) -> Result<UseCase> {
    let (length, breadth) = if length >= breadth {
        (length, breadth)
    } else {
        (breadth, length)
    };
    if !(breadth > 0.0 && height > 0.0) {
        return Err(Error::DegenerateFootprint(format!(
            "cannot form ratios from breadth {} and height {}",
            breadth, height
        )));
    }

    let requested_hb = height / breadth;
    let requested_db = length / breadth;

    let hb = nearest_value(&HEIGHT_RATIOS, requested_hb, tolerance);
    let db = match roof.shape {
        RoofShape::Hip => nearest_value(&[HIP_DEPTH_RATIO], requested_db, tolerance),
        RoofShape::Flat | RoofShape::Gable => nearest_value(&DEPTH_RATIOS, requested_db, tolerance),
    };
    let pitch = match roof.shape {
        RoofShape::Flat => None,
        RoofShape::Gable | RoofShape::Hip => Some(nearest_value(&PITCHES, roof.pitch, tolerance)),
    };

    if !hb.exact {
        diagnostics.push(Diagnostic::NoExactMatch {
            quantity: MatchQuantity::HeightRatio,
            requested: requested_hb,
            selected: hb.value,
        });
    }
    if !db.exact {
        diagnostics.push(Diagnostic::NoExactMatch {
            quantity: MatchQuantity::DepthRatio,
            requested: requested_db,
            selected: db.value,
        });
    }
    if let Some(p) = pitch.filter(|p| !p.exact) {
        diagnostics.push(Diagnostic::NoExactMatch {
            quantity: MatchQuantity::Pitch,
            requested: roof.pitch,
            selected: p.value,
        });
    }

    let (quadrant, stored_direction) = Quadrant::fold(tpu_direction);
    let (bucket, direction_exact) = direction_bucket(stored_direction, tolerance);
    if !direction_exact {
        diagnostics.push(Diagnostic::NoExactMatch {
            quantity: MatchQuantity::Direction,
            requested: stored_direction,
            selected: f64::from(bucket),
        });
    }

    let match_flag = hb.exact && db.exact && pitch.map_or(true, |p| p.exact);
    let identifier = dataset_identifier(roof.shape, db.value, hb.value, pitch.map(|p| p.value));

    tracing::debug!(
        identifier = %identifier,
        direction_bucket = bucket,
        match_flag = match_flag,
        height_ratio = hb.value,
        depth_ratio = db.value,
        "Selected reference model"
    );

    Ok(UseCase {
        requested_height_ratio: requested_hb,
        requested_depth_ratio: requested_db,
        height_ratio: hb.value,
        depth_ratio: db.value,
        roof: roof.shape,
        requested_pitch: (roof.shape != RoofShape::Flat).then_some(roof.pitch),
        pitch: pitch.map(|p| p.value),
        match_flag,
        identifier,
        direction_bucket: bucket,
        stored_direction,
        quadrant,
        surface_count: roof.shape.surface_count(),
    })
}
