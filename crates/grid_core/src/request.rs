//! Caller-facing request values and their validated per-stage forms.
//!
//! Validation happens here, before any kernel is spawned: a bad step count or
//! wind token becomes a [`ConfigError`] instead of a downstream kernel crash.

use serde::{Deserialize, Serialize};

use crate::{ConfigError, StateDocument, WindDirection, DEFAULT_YEAR};

pub const DEFAULT_STEPS: i64 = 20;
pub const DEFAULT_WIND_SPEED: f64 = 5.0;
pub const DEFAULT_WIND_DIRECTION: WindDirection = WindDirection::NE;
pub const DEFAULT_SCENARIO: &str = "custom";

fn default_steps() -> i64 {
    DEFAULT_STEPS
}

fn default_wind_speed() -> f64 {
    DEFAULT_WIND_SPEED
}

fn default_wind_direction() -> String {
    DEFAULT_WIND_DIRECTION.as_str().to_string()
}

fn default_scenario() -> String {
    DEFAULT_SCENARIO.to_string()
}

/// One simulation request as supplied by a caller. Unvalidated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationRequest {
    /// Absent: the latest year known to the store.
    #[serde(default)]
    pub year: Option<String>,
    #[serde(default = "default_steps")]
    pub steps: i64,
    #[serde(default = "default_wind_speed")]
    pub wind_speed: f64,
    #[serde(default = "default_wind_direction")]
    pub wind_direction: String,
    #[serde(default = "default_scenario")]
    pub scenario_name: String,
}

impl Default for SimulationRequest {
    fn default() -> Self {
        Self {
            year: None,
            steps: DEFAULT_STEPS,
            wind_speed: DEFAULT_WIND_SPEED,
            wind_direction: default_wind_direction(),
            scenario_name: default_scenario(),
        }
    }
}

impl SimulationRequest {
    /// Explicit year, else the latest year in `document`, else `fallback`.
    pub fn resolve_year(&self, document: &StateDocument, fallback: &str) -> String {
        resolve_year(self.year.as_deref(), document, fallback)
    }

    pub fn dispersion_params(&self, year: &str) -> Result<DispersionParams, ConfigError> {
        DispersionParams::new(self.steps, self.wind_speed, &self.wind_direction, year)
    }

    pub fn capture_params(&self, year: &str) -> Result<CaptureParams, ConfigError> {
        CaptureParams::new(&self.scenario_name, year)
    }
}

/// Resolve an optional year against the store contents.
pub fn resolve_year(year: Option<&str>, document: &StateDocument, fallback: &str) -> String {
    match year {
        Some(year) => year.to_string(),
        None => document
            .latest_year()
            .unwrap_or(if fallback.is_empty() { DEFAULT_YEAR } else { fallback })
            .to_string(),
    }
}

pub fn validate_year(year: &str) -> Result<(), ConfigError> {
    if year.is_empty() || !year.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ConfigError::InvalidYear(year.to_string()));
    }
    Ok(())
}

fn validate_scenario(name: &str) -> Result<String, ConfigError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::EmptyScenarioName);
    }
    Ok(trimmed.to_string())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispersionParams {
    pub steps: u32,
    pub wind_speed: f64,
    pub wind_direction: WindDirection,
    pub year: String,
}

impl DispersionParams {
    pub fn new(
        steps: i64,
        wind_speed: f64,
        wind_direction: &str,
        year: &str,
    ) -> Result<Self, ConfigError> {
        if steps <= 0 {
            return Err(ConfigError::NonPositiveSteps(steps));
        }
        let steps = u32::try_from(steps).map_err(|_| ConfigError::StepsOutOfRange(steps))?;
        if !wind_speed.is_finite() || wind_speed < 0.0 {
            return Err(ConfigError::InvalidWindSpeed(wind_speed));
        }
        let wind_direction = wind_direction.parse()?;
        validate_year(year)?;
        Ok(Self {
            steps,
            wind_speed,
            wind_direction,
            year: year.to_string(),
        })
    }

    /// Positional arguments for the diffusion kernel: `steps wind_speed wind_direction`.
    pub fn kernel_args(&self) -> Vec<String> {
        vec![
            self.steps.to_string(),
            self.wind_speed.to_string(),
            self.wind_direction.to_string(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaptureParams {
    pub scenario_name: String,
    pub year: String,
}

impl CaptureParams {
    pub fn new(scenario_name: &str, year: &str) -> Result<Self, ConfigError> {
        let scenario_name = validate_scenario(scenario_name)?;
        validate_year(year)?;
        Ok(Self {
            scenario_name,
            year: year.to_string(),
        })
    }

    /// Positional arguments for the capture and end-to-end kernels: `scenario_name year`.
    pub fn kernel_args(&self) -> Vec<String> {
        vec![self.scenario_name.clone(), self.year.clone()]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonParams {
    pub scenario_names: Vec<String>,
    pub year: String,
}

impl ComparisonParams {
    pub fn new<S: AsRef<str>>(scenario_names: &[S], year: &str) -> Result<Self, ConfigError> {
        if scenario_names.is_empty() {
            return Err(ConfigError::EmptyScenarioList);
        }
        let scenario_names = scenario_names
            .iter()
            .map(|name| validate_scenario(name.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        validate_year(year)?;
        Ok(Self {
            scenario_names,
            year: year.to_string(),
        })
    }

    /// Comparison mode passes only the scenario names.
    pub fn kernel_args(&self) -> Vec<String> {
        self.scenario_names.clone()
    }
}
