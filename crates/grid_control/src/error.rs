use std::fmt;
use std::time::Duration;

use grid_core::ConfigError;
use grid_store::StoreError;
use serde::Serialize;

/// A kernel process could not be run to a successful exit.
#[derive(Debug, thiserror::Error)]
pub enum KernelError {
    #[error("failed to start kernel '{kernel}': {source}")]
    Spawn {
        kernel: String,
        #[source]
        source: std::io::Error,
    },

    #[error("kernel '{kernel}' failed ({status}): {stderr}")]
    Exited {
        kernel: String,
        status: String,
        stderr: String,
    },

    #[error("kernel '{kernel}' timed out after {}s", after.as_secs())]
    TimedOut { kernel: String, after: Duration },
}

impl KernelError {
    /// Operator-facing text: the kernel's own stderr when it produced any.
    pub fn diagnostic(&self) -> String {
        match self {
            Self::Exited { stderr, status, .. } => {
                let trimmed = stderr.trim();
                if trimmed.is_empty() {
                    format!("kernel exited with {status}")
                } else {
                    trimmed.to_string()
                }
            }
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Dispersion,
    Capture,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Dispersion => "Dispersion",
            Self::Capture => "Capture",
        })
    }
}

/// Machine-readable failure category surfaced to API callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureKind {
    #[serde(rename = "StoreIOFailure")]
    StoreIoFailure,
    SimulationFailure,
    WorkflowFailure,
    ConfigurationError,
    NotFound,
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    StoreIo(#[from] StoreError),

    #[error("{stage} simulation failed: {message}")]
    Simulation { stage: Stage, message: String },

    #[error("{operation} failed: {message}")]
    Workflow {
        operation: &'static str,
        message: String,
    },

    #[error("invalid request: {0}")]
    Configuration(#[from] ConfigError),
}

impl PipelineError {
    pub fn simulation(stage: Stage, err: &KernelError) -> Self {
        Self::Simulation {
            stage,
            message: err.diagnostic(),
        }
    }

    pub fn workflow(operation: &'static str, err: &KernelError) -> Self {
        Self::Workflow {
            operation,
            message: err.diagnostic(),
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            Self::StoreIo(_) => FailureKind::StoreIoFailure,
            Self::Simulation { .. } => FailureKind::SimulationFailure,
            Self::Workflow { .. } => FailureKind::WorkflowFailure,
            Self::Configuration(_) => FailureKind::ConfigurationError,
        }
    }

    /// The bare failure message, without the stage/operation prefix.
    pub fn message(&self) -> String {
        match self {
            Self::Simulation { message, .. } | Self::Workflow { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}
