//! In-process kernels for tests.
//!
//! The fakes read and write the state store the same way the external
//! kernels do, with fixed arithmetic so results are easy to assert on.

use std::sync::Arc;

use grid_core::{round2, DistrictRecord};
use grid_store::StateStore;
use parking_lot::Mutex;
use serde_json::{Map, Value};

use crate::error::KernelError;
use crate::kernel::SimulationKernel;
use crate::pipeline::Kernels;

/// Fraction of `total_emission` taken as the pre-dispersion concentration.
pub const CONCENTRATION_FACTOR: f64 = 0.1;
/// Fraction of the concentration left after dispersion.
pub const DISPERSION_RETAINED: f64 = 0.9;
/// Capture reduction applied for the `tree_planting` scenario.
pub const TREE_PLANTING_REDUCTION: f64 = 0.2;
/// Capture reduction applied for any other scenario.
pub const DEFAULT_REDUCTION: f64 = 0.1;

/// A kernel backed by a closure.
pub struct FnKernel<F> {
    name: String,
    f: F,
}

impl<F> FnKernel<F>
where
    F: Fn(&[String]) -> Result<(), KernelError> + Send + Sync,
{
    pub fn new(name: &str, f: F) -> Self {
        Self {
            name: name.to_string(),
            f,
        }
    }
}

impl<F> SimulationKernel for FnKernel<F>
where
    F: Fn(&[String]) -> Result<(), KernelError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn invoke(&self, args: &[String]) -> Result<(), KernelError> {
        (self.f)(args)
    }
}

/// Every argument list a kernel was invoked with, in call order.
pub type CallLog = Arc<Mutex<Vec<Vec<String>>>>;

/// Wrap `inner`, recording each call's arguments into the returned log.
pub fn recording(inner: Box<dyn SimulationKernel>) -> (Box<dyn SimulationKernel>, CallLog) {
    let log: CallLog = Arc::default();
    let sink = Arc::clone(&log);
    let name = inner.name().to_string();
    let kernel = FnKernel::new(&name, move |args: &[String]| {
        sink.lock().push(args.to_vec());
        inner.invoke(args)
    });
    (Box::new(kernel), log)
}

pub fn exited(kernel: &str, stderr: &str) -> KernelError {
    KernelError::Exited {
        kernel: kernel.to_string(),
        status: "exit status: 1".to_string(),
        stderr: stderr.to_string(),
    }
}

/// A kernel that scribbles over the store, then fails with `stderr`.
pub fn failing_kernel(store: StateStore, stderr: &str) -> Box<dyn SimulationKernel> {
    let stderr = stderr.to_string();
    Box::new(FnKernel::new("failing", move |_args: &[String]| {
        std::fs::write(store.path(), b"{\"partial\": ").map_err(|source| KernelError::Spawn {
            kernel: "failing".to_string(),
            source,
        })?;
        Err(exited("failing", &stderr))
    }))
}

fn store_failure(kernel: &str, err: &grid_store::StoreError) -> KernelError {
    exited(kernel, &err.to_string())
}

fn disperse(record: &mut DistrictRecord) {
    let initial = round2(record.total_emission.unwrap_or(0.0) * CONCENTRATION_FACTOR);
    record.co2_concentration = Some(initial);
    record.co2_concentration_after_dispersion = Some(round2(initial * DISPERSION_RETAINED));
}

fn capture(record: &mut DistrictRecord, scenario: &str) {
    let reduction = if scenario == "tree_planting" {
        TREE_PLANTING_REDUCTION
    } else {
        DEFAULT_REDUCTION
    };
    let before = record
        .co2_concentration_after_dispersion
        .or(record.co2_concentration)
        .unwrap_or(0.0);
    let captured = round2(before * reduction);
    record.co2_before_capture = Some(before);
    record.co2_after_capture = Some(round2(before - captured));
    record.total_capture = Some(captured);
    record.percent_reduction = Some(round2(reduction * 100.0));
    let mut interventions = Map::new();
    interventions.insert(scenario.to_string(), Value::from(reduction));
    record.interventions = Some(interventions);
}

/// Disperses every district of every year. Arguments are
/// `steps wind_speed wind_direction`; a non-numeric wind speed fails the
/// way the external kernel does.
pub fn fake_diffusion(store: StateStore) -> Box<dyn SimulationKernel> {
    Box::new(FnKernel::new("diffusion", move |args: &[String]| {
        if args.get(1).and_then(|s| s.parse::<f64>().ok()).is_none() {
            return Err(exited("diffusion", "bad wind value"));
        }
        store
            .update(|doc| {
                let years: Vec<String> = doc.years().map(str::to_string).collect();
                for year in years {
                    if let Some(table) = doc.year_mut(&year) {
                        table.districts_mut().for_each(|(_, record)| disperse(record));
                    }
                }
            })
            .map_err(|err| store_failure("diffusion", &err))
    }))
}

/// Captures `scenario_name year` for every district of that year.
pub fn fake_capture(store: StateStore) -> Box<dyn SimulationKernel> {
    Box::new(FnKernel::new("capture", move |args: &[String]| {
        let [scenario, year] = args else {
            return Err(exited("capture", "usage: capture <scenario> <year>"));
        };
        store
            .update(|doc| {
                if let Some(table) = doc.year_mut(year) {
                    table
                        .districts_mut()
                        .for_each(|(_, record)| capture(record, scenario));
                }
            })
            .map_err(|err| store_failure("capture", &err))
    }))
}

/// `scenario_name year` runs dispersion and capture for the year; any
/// other argument list is a comparison and leaves the store untouched.
pub fn fake_workflow(store: StateStore) -> Box<dyn SimulationKernel> {
    Box::new(FnKernel::new("workflow", move |args: &[String]| {
        let is_single_run =
            args.len() == 2 && args[1].bytes().all(|b| b.is_ascii_digit());
        if !is_single_run {
            return Ok(());
        }
        let (scenario, year) = (&args[0], &args[1]);
        store
            .update(|doc| {
                if let Some(table) = doc.year_mut(year) {
                    table.districts_mut().for_each(|(_, record)| {
                        disperse(record);
                        capture(record, scenario);
                    });
                }
            })
            .map_err(|err| store_failure("workflow", &err))
    }))
}

/// All three fakes bound to `store`.
pub fn fake_kernels(store: &StateStore) -> Kernels {
    Kernels {
        diffusion: fake_diffusion(store.clone()),
        capture: fake_capture(store.clone()),
        workflow: fake_workflow(store.clone()),
    }
}
