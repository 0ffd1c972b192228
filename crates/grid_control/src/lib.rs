//! `grid_control` — drives the emission, dispersion and capture stages.
//!
//! Emission generation runs in-process against the state store. Dispersion
//! and capture are delegated to external [`SimulationKernel`]s that read and
//! write the same state file; this crate validates their inputs, serializes
//! writers, and rolls the file back when a kernel fails.

mod capture;
pub mod config;
mod dispersion;
mod emission;
mod error;
mod kernel;
mod pipeline;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
mod workflow;

pub use capture::{CaptureOutcome, CaptureRunner};
pub use config::{load_config, KernelsConfig, PipelineConfig};
pub use dispersion::{DispersionOutcome, DispersionRunner, SimulationSummary, Wind};
pub use emission::EmissionStage;
pub use error::{FailureKind, KernelError, PipelineError, Stage};
pub use kernel::{KernelConfig, ProcessKernel, SimulationKernel};
pub use pipeline::{Kernels, Pipeline};
pub use workflow::{
    ComparisonOutcome, StagedWorkflowOutcome, WorkflowOrchestrator, WorkflowOutcome, WorkflowRun,
    WorkflowState,
};
