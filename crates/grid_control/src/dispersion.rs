use grid_core::{DispersionParams, DispersionResult, WindDirection};
use grid_store::StateStore;
use serde::Serialize;

use crate::error::{PipelineError, Stage};
use crate::kernel::{invoke_with_rollback, SimulationKernel};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Wind {
    pub speed: f64,
    pub direction: WindDirection,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationSummary {
    pub steps: u32,
    pub wind: Wind,
    pub year: String,
}

/// What a successful dispersion run reports back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispersionOutcome {
    pub success: bool,
    pub simulation_params: SimulationSummary,
    pub results: Vec<DispersionResult>,
    pub total_districts: usize,
}

pub struct DispersionRunner<'a> {
    store: &'a StateStore,
    kernel: &'a dyn SimulationKernel,
}

impl<'a> DispersionRunner<'a> {
    pub fn new(store: &'a StateStore, kernel: &'a dyn SimulationKernel) -> Self {
        Self { store, kernel }
    }

    /// Run the diffusion kernel, then read back the year's results.
    pub fn run(&self, params: &DispersionParams) -> Result<DispersionOutcome, PipelineError> {
        tracing::info!(
            steps = params.steps,
            wind_speed = params.wind_speed,
            wind_direction = %params.wind_direction,
            year = %params.year,
            "running dispersion"
        );
        invoke_with_rollback(self.store, self.kernel, &params.kernel_args(), |err| {
            PipelineError::simulation(Stage::Dispersion, err)
        })?;

        let results = self.results(&params.year)?;
        Ok(DispersionOutcome {
            success: true,
            simulation_params: SimulationSummary {
                steps: params.steps,
                wind: Wind {
                    speed: params.wind_speed,
                    direction: params.wind_direction,
                },
                year: params.year.clone(),
            },
            total_districts: results.len(),
            results,
        })
    }

    pub fn results(&self, year: &str) -> Result<Vec<DispersionResult>, PipelineError> {
        let document = self.store.load()?;
        Ok(grid_core::dispersion_results(&document, year))
    }
}
