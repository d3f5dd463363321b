// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # CpMap Core
//!
//! Maps wind-tunnel pressure coefficients (Cp) from a catalog of reference
//! building models onto the envelope of a real building.
//!
//! ## Overview
//!
//! One request is a (building, wind direction) pair. It flows through seven
//! stages:
//!
//! - **Orientation**: minimum-area bounding rectangle, building axis and the
//!   flow direction in the building frame ([`orientation`])
//! - **Use case**: nearest reference model and stored direction ([`use_case`])
//! - **Model geometry**: full-scale reference model with numbered surfaces
//!   ([`model_geometry`])
//! - **Interpolation**: cubic triangular patches over a Delaunay mesh of the
//!   measured taps, sampled on a regular grid per surface ([`interpolation`])
//! - **Projection**: grid and measured taps placed on the real envelope
//!   ([`projection`])
//! - **Tributaries**: roof Voronoi cells and facade strips ([`tributary`])
//! - **Components**: tributary overlap with roof and wall panels
//!   ([`components`])
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cpmap_core::{Building, DatasetCatalog, MappingConfig, PressureMapper};
//! use std::sync::Arc;
//!
//! let catalog = DatasetCatalog::load_json_reader(std::fs::File::open("catalog.json")?)?;
//! let mapper = PressureMapper::new(Arc::new(catalog), MappingConfig::default())?;
//!
//! let building = Building::from_json_str(&json)?;
//! let mapping = mapper.map(&building, 270.0)?;
//! for tap in &mapping.taps {
//!     println!("{:?} mean Cp {:.3} over {:.2} m2", tap.location, tap.mean_cp, tap.tributary_area);
//! }
//! ```
//!
//! Recoverable conditions are collected in [`PressureMapping::diagnostics`]
//! and logged through `tracing`; fatal ones are returned as [`Error`].

pub mod building;
pub mod cancel;
pub mod catalog;
pub mod components;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod interpolation;
pub mod model_geometry;
pub mod orientation;
pub mod pipeline;
pub mod projection;
pub mod surfaces;
pub mod tributary;
pub mod use_case;

pub use building::{Building, Roof, RoofShape, Story, SubElement, SubElementKind};
pub use cancel::CancelToken;
pub use catalog::{DatasetCatalog, PressureTap, ReferenceDataset};
pub use components::ComponentShare;
pub use config::MappingConfig;
pub use diagnostics::{Diagnostic, Diagnostics, MatchQuantity};
pub use error::{Error, Result};
pub use interpolation::{InterpolatedSurfaces, NormalizedTap, SurfaceField};
pub use model_geometry::ModelGeometry;
pub use orientation::{AxisAlignment, BuildingFace, CompassFace, Orientation, Quadrant, SideLine};
pub use pipeline::{PressureMapper, PressureMapping};
pub use projection::{ProjectedTap, TapSource};
pub use surfaces::{RoofPlane, SurfaceGeometry, SurfaceKind, SurfaceMap};
pub use tributary::Tributary;
pub use use_case::UseCase;
