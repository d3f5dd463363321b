// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Synthetic reference datasets and buildings shared by the integration tests.

#![allow(dead_code)]

use cpmap_core::use_case::{dataset_identifier, DIRECTION_BUCKETS};
use cpmap_core::{Building, DatasetCatalog, PressureTap, ReferenceDataset, Roof, RoofShape};
use nalgebra::Point2;

/// Model breadth in metres
pub const MODEL_BREADTH: f64 = 0.16;

/// Grid of `n` x `n` taps over [x0, x1] x [y0, y1]
fn tap_grid(
    taps: &mut Vec<PressureTap>,
    surface: u8,
    (x0, x1): (f64, f64),
    (y0, y1): (f64, f64),
    n: usize,
) {
    for j in 0..n {
        for i in 0..n {
            let fx = i as f64 / (n - 1) as f64;
            let fy = j as f64 / (n - 1) as f64;
            taps.push(PressureTap {
                index: taps.len() + 1,
                x: x0 + fx * (x1 - x0),
                y: y0 + fy * (y1 - y0),
                surface,
                mean_cp: 0.9 - 0.25 * f64::from(surface) + 0.1 * fx - 0.05 * fy,
                std_cp: 0.05 + 0.01 * fy,
            });
        }
    }
}

/// Dataset with a 3 x 3 tap grid on every surface
pub fn dataset(shape: RoofShape, depth_ratio: f64, height_ratio: f64, pitch: Option<f64>, direction: u32) -> ReferenceDataset {
    let breadth = MODEL_BREADTH;
    let depth = depth_ratio * breadth;
    let height = height_ratio * breadth;
    let mut taps = Vec::new();
    tap_grid(&mut taps, 1, (0.0, breadth), (0.0, height), 3);
    tap_grid(&mut taps, 2, (0.0, depth), (0.0, height), 3);
    tap_grid(&mut taps, 3, (0.0, breadth), (0.0, height), 3);
    tap_grid(&mut taps, 4, (0.0, depth), (0.0, height), 3);
    let (dx, db) = (depth * 0.5, breadth * 0.5);
    match shape {
        RoofShape::Gable => {
            tap_grid(&mut taps, 5, (-dx, dx), (-db, 0.0), 3);
            tap_grid(&mut taps, 6, (-dx, dx), (0.0, db), 3);
        }
        RoofShape::Flat | RoofShape::Hip => tap_grid(&mut taps, 5, (-dx, dx), (-db, db), 3),
    }
    ReferenceDataset {
        identifier: dataset_identifier(shape, depth_ratio, height_ratio, pitch),
        direction,
        breadth,
        depth,
        height,
        pitch,
        taps,
    }
}

/// Catalog holding one model at every stored direction
pub fn catalog(shape: RoofShape, depth_ratio: f64, height_ratio: f64, pitch: Option<f64>) -> DatasetCatalog {
    DatasetCatalog::from_datasets(
        DIRECTION_BUCKETS
            .iter()
            .map(|&d| dataset(shape, depth_ratio, height_ratio, pitch, d)),
    )
    .unwrap()
}

pub fn rectangle(length: f64, breadth: f64) -> Vec<Point2<f64>> {
    vec![
        Point2::new(0.0, 0.0),
        Point2::new(length, 0.0),
        Point2::new(length, breadth),
        Point2::new(0.0, breadth),
    ]
}

pub fn building(footprint: Vec<Point2<f64>>, height: f64, roof: Roof) -> Building {
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

pub fn flat() -> Roof {
    Roof {
        shape: RoofShape::Flat,
        pitch: 0.0,
    }
}

pub fn gable(pitch: f64) -> Roof {
    Roof {
        shape: RoofShape::Gable,
        pitch,
    }
}
