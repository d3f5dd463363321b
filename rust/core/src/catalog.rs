// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Reference datasets and the read-only catalog that holds them.
//!
//! A dataset is one reference model at one stored wind direction. It is
//! exchanged as JSON; taps carry either precomputed mean/std of Cp or the raw
//! Cp time series, which is reduced on load.

use crate::error::{Error, Result};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::io::Read;

/// Measured tap on a reference model (model scale, metres)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTap")]
pub struct PressureTap {
    pub index: usize,
    pub x: f64,
    pub y: f64,
    pub surface: u8,
    pub mean_cp: f64,
    pub std_cp: f64,
}

/// Wire form of a tap before reduction
#[derive(Deserialize)]
struct RawTap {
    index: usize,
    x: f64,
    y: f64,
    surface: u8,
    #[serde(default)]
    mean_cp: Option<f64>,
    #[serde(default)]
    std_cp: Option<f64>,
    #[serde(default)]
    series: Vec<f64>,
}

impl TryFrom<RawTap> for PressureTap {
    type Error = String;

    fn try_from(raw: RawTap) -> std::result::Result<Self, Self::Error> {
        let (mean_cp, std_cp) = match (raw.mean_cp, raw.std_cp) {
            (Some(mean), Some(std)) => (mean, std),
            _ if !raw.series.is_empty() => mean_and_std(&raw.series),
            _ => {
                return Err(format!(
                    "tap {} has neither mean/std nor a Cp series",
                    raw.index
                ))
            }
        };
        Ok(PressureTap {
            index: raw.index,
            x: raw.x,
            y: raw.y,
            surface: raw.surface,
            mean_cp,
            std_cp,
        })
    }
}

/// Mean and population standard deviation of a series
pub fn mean_and_std(series: &[f64]) -> (f64, f64) {
    if series.is_empty() {
        return (0.0, 0.0);
    }
    let n = series.len() as f64;
    let mean = series.iter().sum::<f64>() / n;
    let var = series.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    (mean, var.sqrt())
}

/// Measurements of one reference model at one stored direction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceDataset {
    pub identifier: String,
    /// Stored wind direction bucket in degrees
    pub direction: u32,
    /// Model breadth, depth and height in metres
    pub breadth: f64,
    pub depth: f64,
    pub height: f64,
    #[serde(default)]
    pub pitch: Option<f64>,
    pub taps: Vec<PressureTap>,
}

impl ReferenceDataset {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let dataset: ReferenceDataset = serde_json::from_str(json)?;
        dataset.validate()?;
        Ok(dataset)
    }

    pub fn validate(&self) -> Result<()> {
        let dims = [self.breadth, self.depth, self.height];
        if dims.iter().any(|d| !(d.is_finite() && *d > 0.0)) {
            return Err(Error::InvalidDataset(format!(
                "{} at {} deg has non-positive model dimensions",
                self.identifier, self.direction
            )));
        }
        if let Some(tap) = self.taps.iter().find(|t| {
            t.surface == 0
                || !(t.x.is_finite() && t.y.is_finite())
                || !(t.mean_cp.is_finite() && t.std_cp.is_finite())
        }) {
            return Err(Error::InvalidDataset(format!(
                "{} at {} deg: tap {} is malformed",
                self.identifier, self.direction, tap.index
            )));
        }
        Ok(())
    }

    /// Taps on surface `number`, in dataset order
    pub fn surface_taps(&self, number: u8) -> impl Iterator<Item = &PressureTap> {
        self.taps.iter().filter(move |t| t.surface == number)
    }
}

/// Immutable (identifier, direction) -> dataset lookup
///
/// Built once, then shared across requests behind an `Arc`.
#[derive(Debug, Clone, Default)]
pub struct DatasetCatalog {
    datasets: FxHashMap<(String, u32), ReferenceDataset>,
}

impl DatasetCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_datasets(datasets: impl IntoIterator<Item = ReferenceDataset>) -> Result<Self> {
        let mut catalog = Self::new();
        for dataset in datasets {
            catalog.insert(dataset)?;
        }
        Ok(catalog)
    }

    /// Load a JSON array of datasets
    pub fn load_json_reader<R: Read>(reader: R) -> Result<Self> {
        let datasets: Vec<ReferenceDataset> = serde_json::from_reader(reader)?;
        let catalog = Self::from_datasets(datasets)?;
        tracing::debug!(datasets = catalog.len(), "Loaded reference catalog");
        Ok(catalog)
    }

    /// Add a dataset, replacing any previous one with the same key
    pub fn insert(&mut self, dataset: ReferenceDataset) -> Result<()> {
        dataset.validate()?;
        self.datasets
            .insert((dataset.identifier.clone(), dataset.direction), dataset);
        Ok(())
    }

    pub fn get(&self, identifier: &str, direction: u32) -> Result<&ReferenceDataset> {
        self.datasets
            .get(&(identifier.to_string(), direction))
            .ok_or_else(|| Error::DatasetNotFound {
                identifier: identifier.to_string(),
                direction,
            })
    }

    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }
}
