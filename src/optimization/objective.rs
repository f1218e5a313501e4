use crate::core::{ParameterVector, validate};
use crate::simulation::{SimulationDefaults, SimulationError, Simulator, assemble_with};
use argmin::core::{CostFunction, Error};
use std::any::Any;
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use tracing::warn;

/// Cost returned for any design the simulator could not fly
pub const PENALTY: f64 = 1e6;

/// Negated apogee height of a design, as a minimization cost
///
/// Every evaluation validates the raw vector, assembles a full simulator
/// config and runs one simulation. Failed runs never propagate: they are
/// logged and scored with [`PENALTY`] so the search can carry on.
pub struct ApogeeObjective<S> {
    simulator: S,
    defaults: SimulationDefaults,
    evaluations: Cell<usize>,
    failures: Cell<usize>,
}

impl<S: Simulator> ApogeeObjective<S> {
    pub fn new(simulator: S) -> Self {
        Self::with_defaults(simulator, SimulationDefaults::default())
    }

    pub fn with_defaults(simulator: S, defaults: SimulationDefaults) -> Self {
        Self {
            simulator,
            defaults,
            evaluations: Cell::new(0),
            failures: Cell::new(0),
        }
    }

    /// Cost of one design. Always finite.
    pub fn evaluate(&self, raw: &ParameterVector) -> f64 {
        self.evaluations.set(self.evaluations.get() + 1);

        match self.simulate(raw) {
            Ok(h_max) => -h_max,
            Err(e) => {
                self.failures.set(self.failures.get() + 1);
                warn!(error = %e, params = %raw, "Simulation failed, applying penalty");
                PENALTY
            }
        }
    }

    /// Apogee height of the validated design
    pub fn simulate(&self, raw: &ParameterVector) -> Result<f64, SimulationError> {
        let config = assemble_with(&validate(raw), &self.defaults);

        let result = panic::catch_unwind(AssertUnwindSafe(|| self.simulator.attempt(&config)))
            .map_err(|payload| SimulationError::Panicked(panic_message(payload.as_ref())))??;

        result.max_height()
    }

    /// Number of simulator runs so far
    pub fn evaluations(&self) -> usize {
        self.evaluations.get()
    }

    /// Number of runs that were scored with the penalty
    pub fn failures(&self) -> usize {
        self.failures.get()
    }
}

impl<S: Simulator> CostFunction for ApogeeObjective<S> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, param: &Self::Param) -> Result<Self::Output, Error> {
        let params = ParameterVector::from_slice(param).ok_or_else(|| {
            Error::msg(format!(
                "Expected {} design parameters, got {}",
                crate::core::NUM_PARAMS,
                param.len()
            ))
        })?;
        Ok(self.evaluate(&params))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
