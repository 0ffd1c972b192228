use super::*;
use crate::test_fixtures::{
    capture_record, dispersion_record, emission_record, make_rng, sample_document, sample_json,
};


// --- Shared test helpers ------------------------------------------------

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

fn names<T>(items: &[T], name: impl Fn(&T) -> &str) -> Vec<String> {
    items.iter().map(|item| name(item).to_string()).collect()
}
