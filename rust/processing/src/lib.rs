// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Batch processing of wind-pressure mapping requests.
//!
//! Requests are independent (building, wind direction) pairs. They run on a
//! rayon pool against one shared catalog, each under its own deadline, and
//! come back in submission order.

pub mod batch;
pub mod config;
pub mod error;

pub use batch::{BatchOutcome, BatchProcessor, MappingRequest};
pub use config::ProcessingConfig;
pub use error::{ProcessingError, Result};
