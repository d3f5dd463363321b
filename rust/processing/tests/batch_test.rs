// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use cpmap_core::use_case::DIRECTION_BUCKETS;
use cpmap_core::{CancelToken, DatasetCatalog, Error, MappingConfig, PressureTap, ReferenceDataset};
use approx::assert_relative_eq;
use cpmap_processing::{BatchOutcome, BatchProcessor, MappingRequest, ProcessingConfig};
use std::sync::Arc;

/// Flat square model (hb 0.5) with a 3 x 3 tap grid on every surface
fn square_catalog() -> Arc<DatasetCatalog> {
    let (breadth, height) = (0.16, 0.08);
    let datasets = DIRECTION_BUCKETS.iter().map(|&direction| {
        let mut taps = Vec::new();
        for surface in 1..=5u8 {
            for j in 0..3 {
                for i in 0..3 {
                    let (fx, fy) = (i as f64 * 0.5, j as f64 * 0.5);
                    let (x, y) = if surface == 5 {
                        ((fx - 0.5) * breadth, (fy - 0.5) * breadth)
                    } else {
                        (fx * breadth, fy * height)
                    };
                    taps.push(PressureTap {
                        index: taps.len() + 1,
                        x,
                        y,
                        surface,
                        mean_cp: 0.8 - 0.3 * f64::from(surface) + 0.1 * fx,
                        std_cp: 0.1,
                    });
                }
            }
        }
        ReferenceDataset {
            identifier: "Cp_ts_g080400".to_string(),
            direction,
            breadth,
            depth: breadth,
            height,
            pitch: None,
            taps,
        }
    });
    Arc::new(DatasetCatalog::from_datasets(datasets).unwrap())
}

fn request(id: &str, roof: &str, wind: f64) -> MappingRequest {
    let json = format!(
        r#"{{
            "id": "{}",
            "wind_direction": {},
            "building": {{
                "footprint": [[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0]],
                "height": 5.0,
                "roof": {}
            }}
        }}"#,
        id, wind, roof
    );
    serde_json::from_str(&json).unwrap()
}

const FLAT: &str = r#"{"shape": "flat"}"#;
const HIP: &str = r#"{"shape": "hip", "pitch": 30.0}"#;

fn config(worker_threads: usize) -> ProcessingConfig {
    ProcessingConfig {
        worker_threads,
        request_timeout_secs: 300,
        mapping: MappingConfig {
            grid_resolution: 5,
            ..MappingConfig::default()
        },
    }
}

#[test]
fn test_outcomes_follow_submission_order() {
    let processor = BatchProcessor::new(square_catalog(), &config(2)).unwrap();
    assert_eq!(processor.worker_threads(), 2);

    let requests: Vec<MappingRequest> = (0..8)
        .map(|k| request(&format!("r{}", k), FLAT, f64::from(k) * 45.0))
        .chain(std::iter::once(request("hip", HIP, 0.0)))
        .collect();
    let outcomes = processor.run(&requests);

    assert_eq!(outcomes.len(), requests.len());
    for (outcome, request) in outcomes.iter().zip(&requests) {
        assert_eq!(outcome.id, request.id);
        assert_eq!(outcome.wind_direction, request.wind_direction);
    }
    for outcome in &outcomes[..8] {
        let mapping = outcome.result.as_ref().unwrap();
        assert_eq!(mapping.taps.len(), 5 * 25);
    }
    assert!(matches!(
        outcomes[8].result,
        Err(Error::UnsupportedGeometry(_))
    ));
}

fn roof_area(outcome: &BatchOutcome) -> f64 {
    outcome
        .result
        .as_ref()
        .unwrap()
        .taps
        .iter()
        .filter(|t| t.surface == 5)
        .map(|t| t.tributary_area)
        .sum()
}

#[test]
fn test_requests_choose_roof_fidelity() {
    let processor = BatchProcessor::new(square_catalog(), &config(2)).unwrap();
    let l_shape = r#"{
        "id": "L",
        "wind_direction": 270.0,
        "building": {
            "footprint": [[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [5.0, 10.0], [5.0, 5.0], [0.0, 5.0]],
            "height": 5.0,
            "roof": {"shape": "flat"}
        }
    }"#;
    let idealized: MappingRequest = serde_json::from_str(l_shape).unwrap();
    assert_eq!(idealized.high_fidelity_roof, None);
    let mut footprint = idealized.clone();
    footprint.high_fidelity_roof = Some(true);

    let outcomes = processor.run(&[idealized, footprint]);
    assert_relative_eq!(roof_area(&outcomes[0]), 100.0, epsilon = 1e-6);
    assert_relative_eq!(roof_area(&outcomes[1]), 75.0, epsilon = 1e-6);
}

#[test]
fn test_parallel_results_match_sequential() {
    let catalog = square_catalog();
    let requests: Vec<MappingRequest> = [10.0, 100.0, 200.0, 300.0]
        .iter()
        .enumerate()
        .map(|(k, &w)| request(&k.to_string(), FLAT, w))
        .collect();
    let parallel = BatchProcessor::new(Arc::clone(&catalog), &config(4)).unwrap().run(&requests);
    let sequential = BatchProcessor::new(catalog, &config(1)).unwrap().run(&requests);
    for (a, b) in parallel.iter().zip(&sequential) {
        assert_eq!(a.result.as_ref().unwrap(), b.result.as_ref().unwrap());
    }
}

#[test]
fn test_cancelled_batch_reports_every_request() {
    let processor = BatchProcessor::new(square_catalog(), &config(2)).unwrap();
    let requests = vec![request("a", FLAT, 0.0), request("b", FLAT, 90.0)];
    let token = CancelToken::new();
    token.cancel();
    let outcomes = processor.run_with_token(&requests, &token);
    assert_eq!(outcomes.len(), 2);
    assert!(outcomes
        .iter()
        .all(|o| matches!(o.result, Err(Error::Cancelled))));
}

#[test]
fn test_zero_timeout_expires_requests() {
    let mut config = config(2);
    config.request_timeout_secs = 0;
    let processor = BatchProcessor::new(square_catalog(), &config).unwrap();
    let outcomes = processor.run(&[request("a", FLAT, 0.0)]);
    assert!(matches!(outcomes[0].result, Err(Error::DeadlineExceeded)));
}

#[test]
fn test_invalid_mapping_config_fails_batch_setup() {
    let mut config = config(1);
    config.mapping.grid_resolution = 0;
    assert!(BatchProcessor::new(square_catalog(), &config).is_err());
}
