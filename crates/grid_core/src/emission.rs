use rand::Rng;
use serde::Serialize;

use crate::registry::{classify, registered_districts};
use crate::{DensityClass, DistrictRecord, EmissionRange, StateDocument};

/// Round half away from zero to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmissionBreakdown {
    pub transport_percentage: f64,
    pub industrial_percentage: f64,
    pub residential_percentage: f64,
}

impl EmissionBreakdown {
    pub fn sum(&self) -> f64 {
        self.transport_percentage + self.industrial_percentage + self.residential_percentage
    }
}

/// Emission figures for one district/year with the derived source breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmissionView {
    pub district: String,
    pub year: String,
    pub transport_emission: f64,
    pub industrial_emission: f64,
    pub residential_emission: f64,
    pub total_emission: f64,
    pub breakdown: EmissionBreakdown,
}

fn draw(range: EmissionRange, rng: &mut impl Rng) -> f64 {
    round2(rng.gen_range(range.min..=range.max))
}

/// Draw one set of baseline emissions for `class`.
///
/// Components are rounded independently; `total_emission` is the rounded
/// sum of the rounded components.
pub fn draw_emissions(class: DensityClass, rng: &mut impl Rng) -> DistrictRecord {
    let profile = class.profile();
    let transport = draw(profile.transport, rng);
    let industrial = draw(profile.industrial, rng);
    let residential = draw(profile.residential, rng);
    DistrictRecord {
        transport_emission: Some(transport),
        industrial_emission: Some(industrial),
        residential_emission: Some(residential),
        total_emission: Some(round2(transport + industrial + residential)),
        ..DistrictRecord::default()
    }
}

/// Populate baseline emissions for `year`.
///
/// Registered districts missing from the year are added first. Every district
/// without `total_emission` then receives freshly drawn figures; districts
/// that already carry `total_emission` are left untouched. Returns the number
/// of districts that were generated.
pub fn ensure_emissions(document: &mut StateDocument, year: &str, rng: &mut impl Rng) -> usize {
    let table = document.year_entry(year);
    for name in registered_districts() {
        table.entry(name);
    }

    let mut generated = 0;
    for (name, record) in table.districts_mut() {
        if record.has_emissions() {
            continue;
        }
        record.merge(draw_emissions(classify(name), rng));
        generated += 1;
    }
    generated
}

/// [`ensure_emissions`] applied to every year already in the document.
pub fn ensure_emissions_all_years(document: &mut StateDocument, rng: &mut impl Rng) -> usize {
    let years: Vec<String> = document.years().map(str::to_string).collect();
    let mut generated = 0;
    for year in &years {
        generated += ensure_emissions(document, year, &mut *rng);
    }
    generated
}

fn percentage(part: f64, total: f64) -> f64 {
    if total > 0.0 {
        round2(part / total * 100.0)
    } else {
        0.0
    }
}

/// Emission view for one district, or `None` when the year or district is
/// absent or emissions have not been generated yet.
pub fn emission_for_district(
    document: &StateDocument,
    district: &str,
    year: &str,
) -> Option<EmissionView> {
    let record = document.district(year, district)?;
    let total = record.total_emission?;
    let transport = record.transport_emission.unwrap_or(0.0);
    let industrial = record.industrial_emission.unwrap_or(0.0);
    let residential = record.residential_emission.unwrap_or(0.0);
    Some(EmissionView {
        district: district.to_string(),
        year: year.to_string(),
        transport_emission: transport,
        industrial_emission: industrial,
        residential_emission: residential,
        total_emission: total,
        breakdown: EmissionBreakdown {
            transport_percentage: percentage(transport, total),
            industrial_percentage: percentage(industrial, total),
            residential_percentage: percentage(residential, total),
        },
    })
}

/// Emission views for every generated district of `year`, in document order.
pub fn emission_for_all_districts(document: &StateDocument, year: &str) -> Vec<EmissionView> {
    let Some(table) = document.year(year) else {
        return Vec::new();
    };
    table
        .districts()
        .filter_map(|(name, _)| emission_for_district(document, name, year))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::make_rng;

    #[test]
    fn round2_rounds_to_cents() {
        assert!((round2(1.234_9) - 1.23).abs() < 1e-9);
        assert!((round2(1.235_1) - 1.24).abs() < 1e-9);
        assert!((round2(-0.004)).abs() < 1e-9);
    }

    #[test]
    fn drawn_total_is_rounded_sum_of_components() {
        let mut rng = make_rng();
        for _ in 0..100 {
            let record = draw_emissions(DensityClass::Urban, &mut rng);
            let sum = record.transport_emission.unwrap()
                + record.industrial_emission.unwrap()
                + record.residential_emission.unwrap();
            assert!((record.total_emission.unwrap() - round2(sum)).abs() < 1e-9);
        }
    }

    #[test]
    fn zero_total_reports_zero_percent() {
        let mut document = StateDocument::default();
        document.merge_record(
            "2025",
            "Empty",
            DistrictRecord {
                transport_emission: Some(0.0),
                industrial_emission: Some(0.0),
                residential_emission: Some(0.0),
                total_emission: Some(0.0),
                ..DistrictRecord::default()
            },
        );
        let view = emission_for_district(&document, "Empty", "2025").unwrap();
        assert!(view.breakdown.sum().abs() < f64::EPSILON);
        assert!(view.breakdown.transport_percentage.is_finite());
    }

    #[test]
    fn missing_components_default_to_zero() {
        let mut document = StateDocument::default();
        document.merge_record(
            "2025",
            "Partial",
            DistrictRecord {
                transport_emission: Some(50.0),
                total_emission: Some(100.0),
                ..DistrictRecord::default()
            },
        );
        let view = emission_for_district(&document, "Partial", "2025").unwrap();
        assert!(view.industrial_emission.abs() < f64::EPSILON);
        assert!((view.breakdown.transport_percentage - 50.0).abs() < 1e-9);
    }
}
