// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Parallel execution of independent mapping requests.

use crate::config::ProcessingConfig;
use crate::error::Result;
use cpmap_core::{Building, CancelToken, DatasetCatalog, PressureMapper, PressureMapping};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// One (building, wind direction) request of a batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingRequest {
    pub id: String,
    pub building: Building,
    pub wind_direction: f64,
    /// Overrides the batch's high-fidelity roof setting for this request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high_fidelity_roof: Option<bool>,
}

/// Result of one request, in the order the requests were submitted
#[derive(Debug)]
pub struct BatchOutcome {
    pub id: String,
    pub wind_direction: f64,
    pub result: std::result::Result<PressureMapping, cpmap_core::Error>,
    pub elapsed_ms: u64,
}

impl BatchOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Runs mapping requests on a dedicated rayon pool
///
/// Requests share the read-only catalog and nothing else; each one gets its
/// own deadline derived from the batch token.
pub struct BatchProcessor {
    mapper: PressureMapper,
    pool: rayon::ThreadPool,
    timeout: Duration,
}

impl BatchProcessor {
    pub fn new(catalog: Arc<DatasetCatalog>, config: &ProcessingConfig) -> Result<Self> {
        let mapper = PressureMapper::new(catalog, config.mapping.clone())?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.worker_threads.max(1))
            .thread_name(|i| format!("cpmap-worker-{}", i))
            .build()?;
        tracing::debug!(
            worker_threads = pool.current_num_threads(),
            request_timeout_secs = config.request_timeout_secs,
            "Created batch processor"
        );
        Ok(Self {
            mapper,
            pool,
            timeout: config.request_timeout(),
        })
    }

    pub fn worker_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    pub fn run(&self, requests: &[MappingRequest]) -> Vec<BatchOutcome> {
        self.run_with_token(requests, &CancelToken::new())
    }

    /// Run every request; cancelling `token` stops requests still in flight
    pub fn run_with_token(&self, requests: &[MappingRequest], token: &CancelToken) -> Vec<BatchOutcome> {
        let batch_start = Instant::now();
        tracing::info!(
            requests = requests.len(),
            worker_threads = self.worker_threads(),
            "Starting mapping batch"
        );

        let outcomes: Vec<BatchOutcome> = self.pool.install(|| {
            requests
                .par_iter()
                .map(|request| self.run_one(request, token))
                .collect()
        });

        let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
        tracing::info!(
            requests = outcomes.len(),
            failed = failed,
            elapsed_ms = batch_start.elapsed().as_millis() as u64,
            "Mapping batch complete"
        );
        outcomes
    }

    fn run_one(&self, request: &MappingRequest, token: &CancelToken) -> BatchOutcome {
        let start = Instant::now();
        let request_token = token.with_timeout(self.timeout);
        let result = match request.high_fidelity_roof {
            Some(flag) if flag != self.mapper.config().high_fidelity_roof => self
                .mapper
                .with_high_fidelity_roof(flag)
                .map_with_token(&request.building, request.wind_direction, &request_token),
            _ => self
                .mapper
                .map_with_token(&request.building, request.wind_direction, &request_token),
        };
        if let Err(err) = &result {
            tracing::warn!(
                id = %request.id,
                wind_direction = request.wind_direction,
                error = %err,
                "Mapping request failed"
            );
        }
        BatchOutcome {
            id: request.id.clone(),
            wind_direction: request.wind_direction,
            result,
            elapsed_ms: start.elapsed().as_millis() as u64,
        }
    }
}
