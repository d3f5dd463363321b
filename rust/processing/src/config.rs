// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Batch configuration loaded from environment variables.

use cpmap_core::MappingConfig;
use std::time::Duration;

/// Batch runner configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingConfig {
    /// Number of worker threads for parallel requests.
    pub worker_threads: usize,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Options applied to every request.
    pub mapping: MappingConfig,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl ProcessingConfig {
    /// Load configuration from environment variables.
    ///
    /// Missing or malformed values fall back to the defaults.
    pub fn from_env() -> Self {
        let defaults = MappingConfig::default();
        Self {
            worker_threads: std::env::var("CPMAP_WORKER_THREADS")
                .unwrap_or_else(|_| num_cpus::get().to_string())
                .parse()
                .ok()
                .filter(|&n: &usize| n > 0)
                .unwrap_or_else(num_cpus::get),
            request_timeout_secs: std::env::var("CPMAP_REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|_| "300".into())
                .parse()
                .unwrap_or(300),
            mapping: MappingConfig {
                grid_resolution: env_or("CPMAP_GRID_RESOLUTION", defaults.grid_resolution),
                ring_buffer: env_or("CPMAP_RING_BUFFER", defaults.ring_buffer),
                recovery_radius: env_or("CPMAP_RECOVERY_RADIUS", defaults.recovery_radius),
                high_fidelity_roof: env_or("CPMAP_HIGH_FIDELITY_ROOF", defaults.high_fidelity_roof),
                match_tolerance: defaults.match_tolerance,
            },
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            worker_threads: num_cpus::get(),
            request_timeout_secs: 300,
            mapping: MappingConfig::default(),
        }
    }
}
