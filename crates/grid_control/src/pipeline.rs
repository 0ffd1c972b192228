use grid_core::{
    CaptureParams, CaptureView, ComparisonParams, DispersionParams, DispersionResult, EmissionView,
};
use grid_store::StateStore;
use parking_lot::Mutex;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::capture::{CaptureOutcome, CaptureRunner};
use crate::config::PipelineConfig;
use crate::dispersion::{DispersionOutcome, DispersionRunner};
use crate::emission::EmissionStage;
use crate::error::PipelineError;
use crate::kernel::{ProcessKernel, SimulationKernel};
use crate::workflow::{
    ComparisonOutcome, StagedWorkflowOutcome, WorkflowOrchestrator, WorkflowOutcome,
};

/// The three external kernels a pipeline drives.
pub struct Kernels {
    pub diffusion: Box<dyn SimulationKernel>,
    pub capture: Box<dyn SimulationKernel>,
    /// End-to-end workflow and scenario comparison.
    pub workflow: Box<dyn SimulationKernel>,
}

impl Kernels {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            diffusion: Box::new(ProcessKernel::new(
                "diffusion",
                config.kernels.diffusion.clone(),
            )),
            capture: Box::new(ProcessKernel::new("capture", config.kernels.capture.clone())),
            workflow: Box::new(ProcessKernel::new(
                "workflow",
                config.kernels.workflow.clone(),
            )),
        }
    }
}

/// Shared entry point for every pipeline operation.
///
/// Operations that write the state file (emission generation and every
/// kernel run) are serialized through one lock, so within a process there is
/// a single writer at a time. Reads take no lock.
pub struct Pipeline {
    store: StateStore,
    kernels: Kernels,
    default_year: String,
    rng: Mutex<ChaCha8Rng>,
    writer: Mutex<()>,
}

impl Pipeline {
    pub fn new(store: StateStore, kernels: Kernels, default_year: &str, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self {
            store,
            kernels,
            default_year: default_year.to_string(),
            rng: Mutex::new(rng),
            writer: Mutex::new(()),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            StateStore::new(config.state_file.clone()),
            Kernels::from_config(config),
            &config.default_year,
            config.seed,
        )
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn default_year(&self) -> &str {
        &self.default_year
    }

    /// Explicit year, else the latest year in the store, else the configured default.
    pub fn resolve_year(&self, year: Option<&str>) -> Result<String, PipelineError> {
        if let Some(year) = year {
            return Ok(year.to_string());
        }
        let document = self.store.load_or_default()?;
        Ok(grid_core::resolve_year(None, &document, &self.default_year))
    }

    fn orchestrator(&self) -> WorkflowOrchestrator<'_> {
        WorkflowOrchestrator::new(
            &self.store,
            self.kernels.diffusion.as_ref(),
            self.kernels.capture.as_ref(),
            self.kernels.workflow.as_ref(),
        )
    }

    // -----------------------------------------------------------------------
    // Emission
    // -----------------------------------------------------------------------

    pub fn ensure_emissions(&self, year: &str) -> Result<usize, PipelineError> {
        let _writer = self.writer.lock();
        let mut rng = self.rng.lock();
        EmissionStage::new(&self.store).ensure(year, &mut *rng)
    }

    pub fn ensure_emissions_all_years(&self) -> Result<usize, PipelineError> {
        let _writer = self.writer.lock();
        let mut rng = self.rng.lock();
        EmissionStage::new(&self.store).ensure_all_years(&mut *rng)
    }

    pub fn emission_for_district(
        &self,
        district: &str,
        year: &str,
    ) -> Result<Option<EmissionView>, PipelineError> {
        EmissionStage::new(&self.store).for_district(district, year)
    }

    pub fn emission_for_all_districts(&self, year: &str) -> Result<Vec<EmissionView>, PipelineError> {
        EmissionStage::new(&self.store).for_all_districts(year)
    }

    // -----------------------------------------------------------------------
    // Dispersion
    // -----------------------------------------------------------------------

    pub fn run_dispersion(&self, params: &DispersionParams) -> Result<DispersionOutcome, PipelineError> {
        let _writer = self.writer.lock();
        DispersionRunner::new(&self.store, self.kernels.diffusion.as_ref()).run(params)
    }

    pub fn dispersion_results(&self, year: &str) -> Result<Vec<DispersionResult>, PipelineError> {
        DispersionRunner::new(&self.store, self.kernels.diffusion.as_ref()).results(year)
    }

    // -----------------------------------------------------------------------
    // Capture
    // -----------------------------------------------------------------------

    pub fn run_capture(&self, params: &CaptureParams) -> Result<CaptureOutcome, PipelineError> {
        let _writer = self.writer.lock();
        CaptureRunner::new(&self.store, self.kernels.capture.as_ref()).run(params)
    }

    pub fn capture_results(&self, year: &str) -> Result<Vec<CaptureView>, PipelineError> {
        CaptureRunner::new(&self.store, self.kernels.capture.as_ref()).results(year)
    }

    // -----------------------------------------------------------------------
    // Workflow
    // -----------------------------------------------------------------------

    pub fn run_workflow(&self, params: &CaptureParams) -> Result<WorkflowOutcome, PipelineError> {
        let _writer = self.writer.lock();
        let mut rng = self.rng.lock();
        self.orchestrator().run(params, &mut *rng)
    }

    pub fn run_staged_workflow(
        &self,
        dispersion: &DispersionParams,
        scenario_name: &str,
    ) -> Result<StagedWorkflowOutcome, PipelineError> {
        let _writer = self.writer.lock();
        let mut rng = self.rng.lock();
        self.orchestrator()
            .run_staged(dispersion, scenario_name, &mut *rng)
    }

    pub fn compare_scenarios(
        &self,
        params: &ComparisonParams,
    ) -> Result<ComparisonOutcome, PipelineError> {
        let _writer = self.writer.lock();
        self.orchestrator().compare(params)
    }
}
