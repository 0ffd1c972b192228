use grid_core::{CaptureParams, CaptureView};
use grid_store::StateStore;
use serde::Serialize;

use crate::error::{PipelineError, Stage};
use crate::kernel::{invoke_with_rollback, SimulationKernel};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaptureOutcome {
    pub success: bool,
    pub scenario_name: String,
    pub year: String,
}

pub struct CaptureRunner<'a> {
    store: &'a StateStore,
    kernel: &'a dyn SimulationKernel,
}

impl<'a> CaptureRunner<'a> {
    pub fn new(store: &'a StateStore, kernel: &'a dyn SimulationKernel) -> Self {
        Self { store, kernel }
    }

    /// Run the capture kernel for one scenario and year.
    ///
    /// Does not require dispersion to have run first; the kernel decides
    /// what pre-capture concentration to use when it is missing.
    pub fn run(&self, params: &CaptureParams) -> Result<CaptureOutcome, PipelineError> {
        tracing::info!(scenario = %params.scenario_name, year = %params.year, "running capture");
        invoke_with_rollback(self.store, self.kernel, &params.kernel_args(), |err| {
            PipelineError::simulation(Stage::Capture, err)
        })?;
        Ok(CaptureOutcome {
            success: true,
            scenario_name: params.scenario_name.clone(),
            year: params.year.clone(),
        })
    }

    pub fn results(&self, year: &str) -> Result<Vec<CaptureView>, PipelineError> {
        let document = self.store.load()?;
        Ok(grid_core::capture_results(&document, year))
    }
}
