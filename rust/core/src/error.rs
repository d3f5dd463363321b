// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for pressure mapping
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that fail a single (building, wind direction) request
///
/// Recoverable conditions (nearest-value substitution, unmapped taps,
/// degenerate tessellation cells) are reported as
/// [`Diagnostic`](crate::Diagnostic)s instead.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Degenerate footprint: {0}")]
    DegenerateFootprint(String),

    #[error("Unsupported geometry: {0}")]
    UnsupportedGeometry(String),

    #[error("Invalid building: {0}")]
    InvalidBuilding(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Dataset {identifier} at {direction} deg not found in catalog")]
    DatasetNotFound { identifier: String, direction: u32 },

    #[error("Invalid dataset: {0}")]
    InvalidDataset(String),

    #[error("Geometry error: {0}")]
    Geometry(#[from] cpmap_geometry::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Request deadline exceeded")]
    DeadlineExceeded,
}

impl Error {
    /// True for errors caused by cancellation or timeout rather than input
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Error::Cancelled | Error::DeadlineExceeded)
    }
}
