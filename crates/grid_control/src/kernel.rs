use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use grid_store::StateStore;
use serde::{Deserialize, Serialize};

use crate::error::{KernelError, PipelineError};

const POLL_INTERVAL: Duration = Duration::from_millis(25);
/// How long output is collected after a time-limited kernel exits.
const DRAIN_GRACE: Duration = Duration::from_secs(1);

/// An external program that reads and writes the state file itself.
///
/// The only contract is positional string arguments in, exit status and
/// stderr out. Implementations must be callable from several threads.
pub trait SimulationKernel: Send + Sync {
    fn name(&self) -> &str;

    fn invoke(&self, args: &[String]) -> Result<(), KernelError>;
}

/// How to launch one kernel process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelConfig {
    pub program: String,
    /// Fixed arguments placed before the per-call positional arguments.
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
    /// No limit when absent. Without a limit the call also waits for any
    /// background process the kernel leaves holding its stdout or stderr.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl KernelConfig {
    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|a| (*a).to_string()).collect(),
            working_dir: None,
            timeout_secs: None,
        }
    }
}

/// A kernel run as a child process, one process per invocation.
#[derive(Debug, Clone)]
pub struct ProcessKernel {
    name: String,
    config: KernelConfig,
}

struct KernelOutput {
    status: ExitStatus,
    stdout: String,
    stderr: String,
}

impl ProcessKernel {
    pub fn new(name: impl Into<String>, config: KernelConfig) -> Self {
        Self {
            name: name.into(),
            config,
        }
    }

    fn command(&self, args: &[String]) -> Command {
        let mut command = Command::new(&self.config.program);
        command
            .args(&self.config.args)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.config.working_dir {
            command.current_dir(dir);
        }
        command
    }

    fn spawn_err(&self, source: std::io::Error) -> KernelError {
        KernelError::Spawn {
            kernel: self.name.clone(),
            source,
        }
    }

    fn run_to_completion(&self, mut command: Command) -> Result<KernelOutput, KernelError> {
        let output = command.output().map_err(|err| self.spawn_err(err))?;
        Ok(KernelOutput {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    /// Poll the child until it exits or `limit` elapses; kill it on expiry.
    ///
    /// A limit too large to represent as an `Instant` means no deadline.
    /// Output is read for at most `DRAIN_GRACE` after exit, so a detached
    /// grandchild holding the pipes cannot stall the call.
    fn run_with_deadline(
        &self,
        mut command: Command,
        limit: Duration,
    ) -> Result<KernelOutput, KernelError> {
        let mut child = command.spawn().map_err(|err| self.spawn_err(err))?;
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let deadline = Instant::now().checked_add(limit);
        let status = loop {
            match child.try_wait().map_err(|err| self.spawn_err(err))? {
                Some(status) => break status,
                None if deadline.is_some_and(|at| Instant::now() >= at) => {
                    if let Err(err) = child.kill() {
                        tracing::warn!(kernel = %self.name, error = %err, "failed to kill kernel");
                    }
                    // Reap so the child does not linger as a zombie.
                    let _ = child.wait();
                    return Err(KernelError::TimedOut {
                        kernel: self.name.clone(),
                        after: limit,
                    });
                }
                None => std::thread::sleep(POLL_INTERVAL),
            }
        };

        let grace_ends = Instant::now() + DRAIN_GRACE;
        Ok(KernelOutput {
            status,
            stdout: stdout.map(|rx| self.collect(&rx, grace_ends)).unwrap_or_default(),
            stderr: stderr.map(|rx| self.collect(&rx, grace_ends)).unwrap_or_default(),
        })
    }

    fn collect(&self, output: &mpsc::Receiver<String>, until: Instant) -> String {
        let wait = until.saturating_duration_since(Instant::now());
        output.recv_timeout(wait).unwrap_or_else(|_| {
            tracing::warn!(kernel = %self.name, "kernel output still open after exit, dropping it");
            String::new()
        })
    }
}

/// Read `pipe` to EOF on its own thread. The reader detaches; its result
/// arrives on the returned channel.
fn drain(mut pipe: impl Read + Send + 'static) -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let mut bytes = Vec::new();
        let text = match pipe.read_to_end(&mut bytes) {
            Ok(_) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(_) => String::new(),
        };
        let _ = tx.send(text);
    });
    rx
}

impl SimulationKernel for ProcessKernel {
    fn name(&self) -> &str {
        &self.name
    }

    fn invoke(&self, args: &[String]) -> Result<(), KernelError> {
        tracing::info!(kernel = %self.name, program = %self.config.program, ?args, "invoking kernel");
        let started = Instant::now();
        let command = self.command(args);
        let output = match self.config.timeout_secs {
            Some(secs) => self.run_with_deadline(command, Duration::from_secs(secs))?,
            None => self.run_to_completion(command)?,
        };

        let stdout = output.stdout.trim();
        if !stdout.is_empty() {
            tracing::debug!(kernel = %self.name, %stdout, "kernel stdout");
        }
        if !output.status.success() {
            return Err(KernelError::Exited {
                kernel: self.name.clone(),
                status: output.status.to_string(),
                stderr: output.stderr,
            });
        }
        tracing::info!(
            kernel = %self.name,
            elapsed_ms = started.elapsed().as_millis(),
            "kernel finished"
        );
        Ok(())
    }
}

/// Invoke `kernel`, restoring the state file to its prior bytes if it fails.
///
/// A failing kernel may have written a partial document before exiting; the
/// snapshot taken here is the only copy of what the store held before.
pub(crate) fn invoke_with_rollback(
    store: &StateStore,
    kernel: &dyn SimulationKernel,
    args: &[String],
    into_failure: impl FnOnce(&KernelError) -> PipelineError,
) -> Result<(), PipelineError> {
    let snapshot = store.snapshot()?;
    let Err(err) = kernel.invoke(args) else {
        return Ok(());
    };
    tracing::warn!(kernel = kernel.name(), error = %err, "kernel failed, restoring state file");
    if let Err(restore_err) = store.restore(&snapshot) {
        tracing::error!(
            kernel = kernel.name(),
            error = %restore_err,
            "could not restore state file after kernel failure"
        );
    }
    Err(into_failure(&err))
}
