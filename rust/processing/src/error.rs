// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProcessingError>;

/// Errors that prevent a batch from running at all
///
/// Failures of individual requests are reported per request in
/// [`BatchOutcome`](crate::BatchOutcome).
#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Mapping error: {0}")]
    Core(#[from] cpmap_core::Error),
}
