mod options;

pub use options::OptimizerOptions;

use crate::core::{NUM_PARAMS, ParameterVector, validate};
use crate::optimization::solvers::{OptimizationCallback, SolverError, TerminationReason};
use crate::optimization::{ApogeeProblem, ProgressCallback, Solver};
use crate::settings::{Settings, SettingsError};
use crate::simulation::Simulator;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum OptimizeError {
    /// The search stopped without meeting a tolerance; `last` is not an optimum
    #[error("Optimization failed after {iterations} iterations: {message}")]
    NotConverged {
        reason: TerminationReason,
        iterations: u32,
        message: String,
        last: ParameterVector,
    },

    #[error(transparent)]
    Solver(#[from] SolverError),

    #[error(transparent)]
    Settings(#[from] SettingsError),
}

/// Result of a converged run
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OptimizationOutcome {
    /// Optimized design, inside the bounds
    pub parameters: ParameterVector,
    /// Simulated apogee height of the optimized design (m)
    pub h_max: f64,
    /// The design as actually handed to the simulator
    pub simulated: ParameterVector,
    pub iterations: u32,
    /// Simulator runs, gradient evaluations included
    pub evaluations: usize,
    /// Runs that failed and were scored with the penalty
    pub failed_simulations: usize,
    pub message: String,
}

/// Bounded search for the design with the highest simulated apogee
pub struct ApogeeOptimizer<S> {
    problem: ApogeeProblem<S>,
    options: OptimizerOptions,
}

impl<S: Simulator> ApogeeOptimizer<S> {
    /// Fixed starting design, bounds, options and simulation tables
    pub fn new(simulator: S) -> Self {
        Self {
            problem: ApogeeProblem::new(simulator),
            options: OptimizerOptions::default(),
        }
    }

    pub fn from_settings(simulator: S, settings: Settings) -> Result<Self, OptimizeError> {
        settings.check()?;

        Ok(Self {
            problem: ApogeeProblem::with_settings(
                simulator,
                settings.initial_guess,
                settings.bounds,
                settings.simulation,
            ),
            options: settings.options,
        })
    }

    /// Run the search, reporting progress when `disp` is set
    pub fn optimize(&self) -> Result<OptimizationOutcome, OptimizeError> {
        let mut callback = ProgressCallback::new(self.options.disp);
        let outcome = self.optimize_with(&mut callback);

        if self.options.disp {
            match &outcome {
                Ok(o) => callback.print_summary(true, &o.message),
                Err(e) => callback.print_summary(false, &e.to_string()),
            }
        }

        outcome
    }

    /// Run the search with a caller-supplied progress callback
    pub fn optimize_with(
        &self,
        callback: &mut dyn OptimizationCallback,
    ) -> Result<OptimizationOutcome, OptimizeError> {
        let objective = self.problem.objective();
        let evaluations_before = objective.evaluations();
        let failures_before = objective.failures();

        let mut solver = self.options.solver();
        info!(
            solver = solver.name(),
            max_iterations = self.options.max_iterations,
            "Starting apogee optimization"
        );
        let result = solver.solve(&self.problem, callback)?;

        let evaluations = objective.evaluations() - evaluations_before;
        let failed_simulations = objective.failures() - failures_before;
        let last = ParameterVector::from_slice(&result.params).ok_or(
            SolverError::DimensionMismatch {
                params: result.params.len(),
                bounds: NUM_PARAMS,
            },
        )?;

        if !result.success {
            warn!(
                reason = %result.reason,
                iterations = result.iterations,
                "Optimization did not converge"
            );
            return Err(OptimizeError::NotConverged {
                reason: result.reason,
                iterations: result.iterations,
                message: result.message,
                last,
            });
        }

        let h_max = -result.cost;
        info!(
            h_max,
            iterations = result.iterations,
            evaluations,
            failed_simulations,
            "Optimization converged"
        );

        Ok(OptimizationOutcome {
            parameters: last,
            h_max,
            simulated: validate(&last),
            iterations: result.iterations,
            evaluations,
            failed_simulations,
            message: result.message,
        })
    }
}

/// Maximize apogee from the fixed starting design with default settings
pub fn optimize_apogee<S: Simulator>(simulator: S) -> Result<OptimizationOutcome, OptimizeError> {
    ApogeeOptimizer::new(simulator).optimize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Bounds, INITIAL_GUESS};
    use crate::optimization::PENALTY;
    use crate::simulation::{SimulationConfig, SimulationError, SimulationResult};

    fn quiet(max_iterations: u32) -> Settings {
        Settings {
            options: OptimizerOptions {
                max_iterations,
                disp: false,
                ..OptimizerOptions::default()
            },
            ..Settings::default()
        }
    }

    fn payload_penalized(config: &SimulationConfig) -> Result<SimulationResult, SimulationError> {
        // Lighter payload flies higher, bounded below by the box
        Ok(SimulationResult::with_max_height(
            2000.0 - 300.0 * config.params.mpl,
        ))
    }

    #[test]
    fn converges_to_the_payload_bound() {
        let optimizer = ApogeeOptimizer::from_settings(payload_penalized, quiet(50)).unwrap();
        let outcome = optimizer.optimize().unwrap();

        let min_payload = Bounds::default().lower(8);
        assert_eq!(outcome.parameters.mpl, min_payload);
        assert!(outcome.parameters.is_within(&Bounds::default()));
        assert!((outcome.h_max - (2000.0 - 300.0 * min_payload)).abs() < 1e-6);
        assert_eq!(outcome.failed_simulations, 0);
    }

    #[test]
    fn failing_simulator_leaves_guess_unchanged() {
        let optimizer = ApogeeOptimizer::from_settings(
            |_: &SimulationConfig| {
                Err::<SimulationResult, _>(SimulationError::Other("no result".into()))
            },
            quiet(50),
        )
        .unwrap();
        let outcome = optimizer.optimize().unwrap();

        assert_eq!(outcome.parameters, ParameterVector::from(INITIAL_GUESS));
        assert_eq!(outcome.h_max, -PENALTY);
        assert_eq!(outcome.iterations, 0);
        assert_eq!(outcome.evaluations, 1 + NUM_PARAMS);
        assert_eq!(outcome.failed_simulations, outcome.evaluations);
    }

    #[test]
    fn settings_with_guess_outside_bounds_are_rejected() {
        let mut settings = quiet(5);
        settings.initial_guess.alpha = 45.0;
        assert!(matches!(
            ApogeeOptimizer::from_settings(payload_penalized, settings),
            Err(OptimizeError::Settings(SettingsError::InitialGuessOutOfBounds(_)))
        ));
    }
}
