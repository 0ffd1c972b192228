//! `grid_core` — district emission model and per-stage result views.
//!
//! No IO, no process spawning. All randomness via the passed-in Rng.

mod emission;
mod error;
pub mod registry;
mod request;
mod results;
#[cfg(any(test, feature = "test-support"))]
pub mod test_fixtures;
mod types;

pub use emission::{
    draw_emissions, emission_for_all_districts, emission_for_district, ensure_emissions,
    ensure_emissions_all_years, round2, EmissionBreakdown, EmissionView,
};
pub use error::ConfigError;
pub use registry::classify;
pub use request::{
    resolve_year, validate_year, CaptureParams, ComparisonParams, DispersionParams,
    SimulationRequest, DEFAULT_SCENARIO, DEFAULT_STEPS, DEFAULT_WIND_DIRECTION,
    DEFAULT_WIND_SPEED,
};
pub use results::{capture_results, dispersion_results, CaptureView, DispersionResult};
pub use types::*;

#[cfg(test)]
mod tests;
