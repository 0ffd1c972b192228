//! Read-side views over dispersion and capture fields.
//!
//! Both views list every district of the year and default missing fields to
//! zero, so a district that has not been through a stage still appears.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::StateDocument;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispersionResult {
    pub district: String,
    pub year: String,
    pub initial_concentration: f64,
    pub final_concentration: f64,
    pub total_emission: f64,
    /// Reserved. District adjacency is not modelled, so this is always empty.
    pub neighbors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaptureView {
    pub district: String,
    pub year: String,
    pub co2_before_capture: f64,
    pub co2_after_capture: f64,
    pub total_capture: f64,
    pub percent_reduction: f64,
    pub interventions: Map<String, Value>,
    pub total_emission: f64,
}

pub fn dispersion_results(document: &StateDocument, year: &str) -> Vec<DispersionResult> {
    let Some(table) = document.year(year) else {
        return Vec::new();
    };
    table
        .districts()
        .map(|(name, record)| DispersionResult {
            district: name.to_string(),
            year: year.to_string(),
            initial_concentration: record.co2_concentration.unwrap_or(0.0),
            final_concentration: record.co2_concentration_after_dispersion.unwrap_or(0.0),
            total_emission: record.total_emission.unwrap_or(0.0),
            neighbors: Vec::new(),
        })
        .collect()
}

pub fn capture_results(document: &StateDocument, year: &str) -> Vec<CaptureView> {
    let Some(table) = document.year(year) else {
        return Vec::new();
    };
    table
        .districts()
        .map(|(name, record)| CaptureView {
            district: name.to_string(),
            year: year.to_string(),
            co2_before_capture: record.co2_before_capture.unwrap_or(0.0),
            co2_after_capture: record.co2_after_capture.unwrap_or(0.0),
            total_capture: record.total_capture.unwrap_or(0.0),
            percent_reduction: record.percent_reduction.unwrap_or(0.0),
            interventions: record.interventions.clone().unwrap_or_default(),
            total_emission: record.total_emission.unwrap_or(0.0),
        })
        .collect()
}
