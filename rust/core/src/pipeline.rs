// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end mapping of one (building, wind direction) request.

use crate::building::Building;
use crate::cancel::CancelToken;
use crate::catalog::DatasetCatalog;
use crate::components::assign;
use crate::config::MappingConfig;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::{Error, Result};
use crate::interpolation::{interpolate, SurfaceField};
use crate::model_geometry::{build, ModelGeometry};
use crate::orientation::{resolve, Orientation};
use crate::projection::{ProjectedTap, Projector};
use crate::surfaces::SurfaceMap;
use crate::tributary::discretize;
use crate::use_case::{select, UseCase};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Everything computed for one request, intermediate geometry included
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PressureMapping {
    pub use_case: UseCase,
    pub orientation: Orientation,
    pub model: ModelGeometry,
    pub fields: SurfaceMap<SurfaceField>,
    /// Interpolated grid taps with tributaries and components
    pub taps: Vec<ProjectedTap>,
    /// One entry per measured reference tap
    pub measured_taps: Vec<ProjectedTap>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Maps reference pressure data onto real buildings
///
/// Holds the shared read-only catalog; every call owns its own
/// intermediate state, so one mapper serves concurrent requests.
#[derive(Debug, Clone)]
pub struct PressureMapper {
    catalog: Arc<DatasetCatalog>,
    config: MappingConfig,
}

impl PressureMapper {
    pub fn new(catalog: Arc<DatasetCatalog>, config: MappingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { catalog, config })
    }

    pub fn catalog(&self) -> &DatasetCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &MappingConfig {
        &self.config
    }

    /// Mapper sharing this catalog, with the high-fidelity roof flag replaced
    pub fn with_high_fidelity_roof(&self, high_fidelity_roof: bool) -> Self {
        Self {
            catalog: Arc::clone(&self.catalog),
            config: MappingConfig {
                high_fidelity_roof,
                ..self.config.clone()
            },
        }
    }

    pub fn map(&self, building: &Building, wind_direction: f64) -> Result<PressureMapping> {
        self.map_with_token(building, wind_direction, &CancelToken::new())
    }

    /// Map one request, stopping early when `token` is cancelled or expires
    pub fn map_with_token(
        &self,
        building: &Building,
        wind_direction: f64,
        token: &CancelToken,
    ) -> Result<PressureMapping> {
        let start = Instant::now();
        if !wind_direction.is_finite() {
            return Err(Error::InvalidBuilding(format!(
                "wind direction must be finite, got {}",
                wind_direction
            )));
        }
        building.validate()?;
        token.check()?;

        let config = &self.config;
        let mut diagnostics = Diagnostics::new();

        let footprint = building.footprint_ccw()?;
        let orientation = resolve(&footprint, wind_direction)?;
        let use_case = select(
            building.height,
            orientation.length,
            orientation.breadth,
            &building.roof,
            orientation.tpu_direction,
            config.match_tolerance,
            &mut diagnostics,
        )?;
        let model = build(building, &orientation, &use_case)?;
        let dataset = self
            .catalog
            .get(&use_case.identifier, use_case.direction_bucket)?;

        tracing::info!(
            wind_direction = wind_direction,
            identifier = %use_case.identifier,
            direction_bucket = use_case.direction_bucket,
            exact = model.exact,
            "Starting pressure mapping"
        );

        let surfaces = interpolate(
            dataset,
            &model,
            use_case.quadrant,
            config.grid_resolution,
            token,
        )?;

        let projector = Projector::new(
            building,
            &footprint,
            &orientation,
            &model,
            config.high_fidelity_roof,
        );
        let (mut taps, measured_taps) = projector.project(&surfaces);
        token.check()?;

        discretize(
            &mut taps,
            building,
            &footprint,
            &orientation,
            &model,
            config,
            token,
            &mut diagnostics,
        )?;
        assign(&mut taps, building, &model, config, token, &mut diagnostics)?;

        tracing::info!(
            taps = taps.len(),
            measured_taps = measured_taps.len(),
            diagnostics = diagnostics.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Pressure mapping complete"
        );

        Ok(PressureMapping {
            use_case,
            orientation,
            model,
            fields: surfaces.fields,
            taps,
            measured_taps,
            diagnostics: diagnostics.into_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::building::{Roof, RoofShape};
    use nalgebra::Point2;

    fn square_building() -> Building {
        Building {
            footprint: vec![
                Point2::new(0.0, 0.0),
                Point2::new(10.0, 0.0),
                Point2::new(10.0, 10.0),
                Point2::new(0.0, 10.0),
            ],
            height: 5.0,
            stories: Vec::new(),
            roof: Roof {
                shape: RoofShape::Flat,
                pitch: 0.0,
            },
            overhang: 0.0,
            envelope: Vec::new(),
            sub_elements: Vec::new(),
        }
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = MappingConfig {
            grid_resolution: 1,
            ..MappingConfig::default()
        };
        assert!(matches!(
            PressureMapper::new(Arc::new(DatasetCatalog::new()), config),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_empty_catalog_reports_missing_dataset() {
        let mapper = PressureMapper::new(Arc::new(DatasetCatalog::new()), MappingConfig::default()).unwrap();
        let err = mapper.map(&square_building(), 270.0).unwrap_err();
        match err {
            Error::DatasetNotFound {
                identifier,
                direction,
            } => {
                assert_eq!(identifier, "Cp_ts_g080400");
                assert_eq!(direction, 0);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_roof_override_shares_catalog() {
        let mapper = PressureMapper::new(Arc::new(DatasetCatalog::new()), MappingConfig::default()).unwrap();
        let fine = mapper.with_high_fidelity_roof(true);
        assert!(fine.config().high_fidelity_roof);
        assert!(!mapper.config().high_fidelity_roof);
        assert_eq!(fine.config().grid_resolution, mapper.config().grid_resolution);
        assert!(std::ptr::eq(fine.catalog(), mapper.catalog()));
    }

    #[test]
    fn test_non_finite_wind_is_rejected() {
        let mapper = PressureMapper::new(Arc::new(DatasetCatalog::new()), MappingConfig::default()).unwrap();
        assert!(matches!(
            mapper.map(&square_building(), f64::NAN),
            Err(Error::InvalidBuilding(_))
        ));
    }
}
