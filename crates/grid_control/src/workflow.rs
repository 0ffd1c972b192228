use grid_core::{CaptureParams, CaptureView, ComparisonParams, DispersionParams, DispersionResult};
use grid_store::StateStore;
use rand::Rng;
use serde::Serialize;

use crate::capture::CaptureRunner;
use crate::dispersion::DispersionRunner;
use crate::emission::EmissionStage;
use crate::error::PipelineError;
use crate::kernel::{invoke_with_rollback, SimulationKernel};

const COMPLETE_WORKFLOW: &str = "Complete workflow";
const SCENARIO_COMPARISON: &str = "Scenario comparison";

/// Progress of one workflow run. Advances strictly forward; any stage
/// failure moves a non-terminal run to `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowState {
    Pending,
    EmissionDone,
    DispersionDone,
    CaptureDone,
    Failed,
}

impl WorkflowState {
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::CaptureDone | Self::Failed)
    }

    pub const fn can_advance_to(self, next: Self) -> bool {
        match next {
            Self::Failed => !self.is_terminal(),
            Self::EmissionDone => matches!(self, Self::Pending),
            Self::DispersionDone => matches!(self, Self::EmissionDone),
            Self::CaptureDone => matches!(self, Self::DispersionDone),
            Self::Pending => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkflowRun {
    pub scenario_name: String,
    pub year: String,
    pub state: WorkflowState,
    pub transitions: Vec<WorkflowState>,
}

impl WorkflowRun {
    pub fn new(params: &CaptureParams) -> Self {
        Self {
            scenario_name: params.scenario_name.clone(),
            year: params.year.clone(),
            state: WorkflowState::Pending,
            transitions: vec![WorkflowState::Pending],
        }
    }

    fn advance(&mut self, next: WorkflowState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "illegal workflow transition {:?} -> {next:?}",
            self.state
        );
        tracing::debug!(scenario = %self.scenario_name, from = ?self.state, to = ?next, "workflow transition");
        self.state = next;
        self.transitions.push(next);
    }

    /// Mark the run failed and hand the error back for propagation.
    fn fail(&mut self, err: PipelineError) -> PipelineError {
        self.advance(WorkflowState::Failed);
        tracing::warn!(
            scenario = %self.scenario_name,
            year = %self.year,
            error = %err,
            "workflow failed"
        );
        err
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkflowOutcome {
    pub success: bool,
    #[serde(flatten)]
    pub run: WorkflowRun,
}

/// Outcome of a workflow driven stage by stage through the runners.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StagedWorkflowOutcome {
    #[serde(flatten)]
    pub outcome: WorkflowOutcome,
    pub dispersion: Vec<DispersionResult>,
    pub capture: Vec<CaptureView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComparisonOutcome {
    pub success: bool,
    pub scenario_names: Vec<String>,
    pub year: String,
}

/// Sequences emission, dispersion and capture for one scenario.
pub struct WorkflowOrchestrator<'a> {
    store: &'a StateStore,
    diffusion: &'a dyn SimulationKernel,
    capture: &'a dyn SimulationKernel,
    end_to_end: &'a dyn SimulationKernel,
}

impl<'a> WorkflowOrchestrator<'a> {
    pub fn new(
        store: &'a StateStore,
        diffusion: &'a dyn SimulationKernel,
        capture: &'a dyn SimulationKernel,
        end_to_end: &'a dyn SimulationKernel,
    ) -> Self {
        Self {
            store,
            diffusion,
            capture,
            end_to_end,
        }
    }

    /// Ensure emissions in-process, then hand dispersion and capture to the
    /// end-to-end kernel in a single invocation.
    pub fn run(
        &self,
        params: &CaptureParams,
        rng: &mut impl Rng,
    ) -> Result<WorkflowOutcome, PipelineError> {
        let mut run = WorkflowRun::new(params);
        tracing::info!(scenario = %run.scenario_name, year = %run.year, "running complete workflow");

        EmissionStage::new(self.store)
            .ensure(&params.year, rng)
            .map_err(|err| run.fail(err))?;
        run.advance(WorkflowState::EmissionDone);

        invoke_with_rollback(self.store, self.end_to_end, &params.kernel_args(), |err| {
            PipelineError::workflow(COMPLETE_WORKFLOW, err)
        })
        .map_err(|err| run.fail(err))?;
        run.advance(WorkflowState::DispersionDone);
        run.advance(WorkflowState::CaptureDone);

        Ok(WorkflowOutcome { success: true, run })
    }

    /// Drive each stage separately: in-process emissions, then the
    /// diffusion kernel, then the capture kernel, stopping at the first failure.
    pub fn run_staged(
        &self,
        dispersion: &DispersionParams,
        scenario_name: &str,
        rng: &mut impl Rng,
    ) -> Result<StagedWorkflowOutcome, PipelineError> {
        let params = CaptureParams::new(scenario_name, &dispersion.year)?;
        let mut run = WorkflowRun::new(&params);
        tracing::info!(scenario = %run.scenario_name, year = %run.year, "running staged workflow");

        EmissionStage::new(self.store)
            .ensure(&params.year, rng)
            .map_err(|err| run.fail(err))?;
        run.advance(WorkflowState::EmissionDone);

        let dispersed = DispersionRunner::new(self.store, self.diffusion)
            .run(dispersion)
            .map_err(|err| run.fail(err))?;
        run.advance(WorkflowState::DispersionDone);

        let capture = CaptureRunner::new(self.store, self.capture);
        capture.run(&params).map_err(|err| run.fail(err))?;
        let captured = capture.results(&params.year).map_err(|err| run.fail(err))?;
        run.advance(WorkflowState::CaptureDone);

        Ok(StagedWorkflowOutcome {
            outcome: WorkflowOutcome { success: true, run },
            dispersion: dispersed.results,
            capture: captured,
        })
    }

    /// Hand a list of scenarios to the end-to-end kernel in comparison mode.
    pub fn compare(&self, params: &ComparisonParams) -> Result<ComparisonOutcome, PipelineError> {
        tracing::info!(scenarios = ?params.scenario_names, year = %params.year, "comparing scenarios");
        invoke_with_rollback(self.store, self.end_to_end, &params.kernel_args(), |err| {
            PipelineError::workflow(SCENARIO_COMPARISON, err)
        })?;
        Ok(ComparisonOutcome {
            success: true,
            scenario_names: params.scenario_names.clone(),
            year: params.year.clone(),
        })
    }
}
