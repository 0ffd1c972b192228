//! Shared test fixtures for grid_core and downstream crates.
//!
//! `sample_document()` mirrors a store that has been through every stage for
//! a handful of districts, plus the metadata keys real files carry.

use crate::{DistrictRecord, StateDocument};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde_json::{json, Map, Value};

pub fn make_rng() -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(42)
}

/// Record carrying only emission-stage fields.
pub fn emission_record(transport: f64, industrial: f64, residential: f64) -> DistrictRecord {
    DistrictRecord {
        transport_emission: Some(transport),
        industrial_emission: Some(industrial),
        residential_emission: Some(residential),
        total_emission: Some(crate::round2(transport + industrial + residential)),
        ..DistrictRecord::default()
    }
}

/// Record carrying only dispersion-stage fields.
pub fn dispersion_record(initial: f64, after: f64) -> DistrictRecord {
    DistrictRecord {
        co2_concentration: Some(initial),
        co2_concentration_after_dispersion: Some(after),
        ..DistrictRecord::default()
    }
}

/// Record carrying only capture-stage fields.
pub fn capture_record(before: f64, after: f64, interventions: Value) -> DistrictRecord {
    let interventions: Map<String, Value> = match interventions {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    DistrictRecord {
        co2_before_capture: Some(before),
        co2_after_capture: Some(after),
        total_capture: Some(crate::round2(before - after)),
        percent_reduction: Some(if before > 0.0 {
            crate::round2((before - after) / before * 100.0)
        } else {
            0.0
        }),
        interventions: Some(interventions),
        ..DistrictRecord::default()
    }
}

/// Raw JSON of a small store: two years, a `timestamp` key, one district
/// through all three stages, one through emission only, one bare record.
pub fn sample_json() -> Value {
    json!({
        "2024": {
            "Kolar": { "temperature": 27.1 },
            "timestamp": "2024-12-31T00:00:00Z"
        },
        "2025": {
            "Bengaluru Urban": {
                "temperature": 29.4,
                "transport_emission": 2000.0,
                "industrial_emission": 3000.0,
                "residential_emission": 1000.0,
                "total_emission": 6000.0,
                "co2_concentration": 600.0,
                "co2_concentration_after_dispersion": 540.0,
                "co2_before_capture": 540.0,
                "co2_after_capture": 486.0,
                "total_capture": 54.0,
                "percent_reduction": 10.0,
                "interventions": { "tree_planting": 0.4, "green_roofs": true }
            },
            "Kolar": {
                "transport_emission": 1000.0,
                "industrial_emission": 600.0,
                "residential_emission": 1400.0,
                "total_emission": 3000.0
            },
            "Mysuru": { "temperature": 25.0 },
            "timestamp": "2025-06-01T00:00:00Z"
        }
    })
}

pub fn sample_document() -> StateDocument {
    serde_json::from_value(sample_json()).expect("sample document should parse")
}
