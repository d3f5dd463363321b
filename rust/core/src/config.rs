// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-request mapping options.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Options for one (building, wind direction) mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingConfig {
    /// Points per side of the interpolation grid on every surface.
    pub grid_resolution: usize,
    /// Padding around the roof bounds that closes every Voronoi cell.
    pub ring_buffer: f64,
    /// Search radius for re-homing invalid cells and unmapped taps.
    pub recovery_radius: f64,
    /// Wrap roof taps onto the true footprint instead of its bounding rectangle.
    pub high_fidelity_roof: bool,
    /// Tolerance for exact catalog matches.
    pub match_tolerance: f64,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            grid_resolution: 10,
            ring_buffer: 20.0,
            recovery_radius: 1.0,
            high_fidelity_roof: false,
            match_tolerance: 1e-6,
        }
    }
}

impl MappingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.grid_resolution < 2 {
            return Err(Error::InvalidConfig(format!(
                "grid resolution must be at least 2, got {}",
                self.grid_resolution
            )));
        }
        if !(self.ring_buffer.is_finite() && self.ring_buffer > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "ring buffer must be positive, got {}",
                self.ring_buffer
            )));
        }
        if !(self.recovery_radius.is_finite() && self.recovery_radius >= 0.0) {
            return Err(Error::InvalidConfig(format!(
                "recovery radius must be non-negative, got {}",
                self.recovery_radius
            )));
        }
        if !(self.match_tolerance.is_finite() && self.match_tolerance >= 0.0) {
            return Err(Error::InvalidConfig(format!(
                "match tolerance must be non-negative, got {}",
                self.match_tolerance
            )));
        }
        Ok(())
    }
}
