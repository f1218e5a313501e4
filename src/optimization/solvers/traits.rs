use argmin::core::CostFunction;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Why a solver stopped
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// Projected gradient norm fell below `gtol`
    GradientTolerance,
    /// Relative objective reduction fell below `ftol`
    FunctionTolerance,
    MaxIterations,
    MaxEvaluations,
    /// No step along the search direction gave sufficient decrease
    LineSearchFailed,
    StoppedByCallback,
}

impl TerminationReason {
    /// Only tolerance-based stops count as convergence
    pub fn is_converged(&self) -> bool {
        matches!(self, Self::GradientTolerance | Self::FunctionTolerance)
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::GradientTolerance => "Converged: projected gradient norm <= gtol",
            Self::FunctionTolerance => "Converged: relative reduction of f <= ftol",
            Self::MaxIterations => "Stopped: total number of iterations reached limit",
            Self::MaxEvaluations => "Stopped: total number of objective evaluations exceeded limit",
            Self::LineSearchFailed => "Abnormal termination in line search",
            Self::StoppedByCallback => "Stopped by callback",
        };
        f.write_str(msg)
    }
}

#[derive(Clone, Debug)]
pub struct SolverResult {
    pub success: bool,
    pub reason: TerminationReason,
    pub cost: f64,
    pub iterations: u32,
    pub message: String,
    pub params: Vec<f64>,
    pub cost_evals: usize,
}

#[derive(Debug, Error)]
pub enum SolverError {
    #[error("Problem has {params} parameters but {bounds} bounds")]
    DimensionMismatch { params: usize, bounds: usize },

    #[error("Objective evaluation failed: {0}")]
    Objective(argmin::core::Error),

    #[error("Callback error: {0}")]
    Callback(String),
}

/// Callback interface for optimization progress
pub trait OptimizationCallback {
    /// Called with the starting point (iteration 0) and after every accepted step
    fn on_iteration(&mut self, iteration: u32, params: &[f64], cost: f64) -> Result<(), String>;

    /// Check if optimization should stop early
    fn should_stop(&self) -> bool {
        false
    }
}

/// Box-constrained minimization problem
///
/// The cost is argmin's `CostFunction`, so anything that plugs into argmin
/// plugs in here. Each cost call may run a full simulation.
pub trait Problem: CostFunction<Param = Vec<f64>, Output = f64> {
    /// Number of parameters
    fn num_params(&self) -> usize;

    /// Initial parameter values
    fn initial_params(&self) -> &[f64];

    /// Parameter bounds (min, max) for each parameter
    fn bounds(&self) -> &[(f64, f64)];
}

/// Solver interface - takes problem and callback
pub trait Solver {
    fn name(&self) -> &str;

    /// Minimize the problem's cost inside its bounds
    fn solve<P: Problem>(
        &mut self,
        problem: &P,
        callback: &mut dyn OptimizationCallback,
    ) -> Result<SolverResult, SolverError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_tolerance_stops_converge() {
        assert!(TerminationReason::GradientTolerance.is_converged());
        assert!(TerminationReason::FunctionTolerance.is_converged());
        assert!(!TerminationReason::MaxIterations.is_converged());
        assert!(!TerminationReason::MaxEvaluations.is_converged());
        assert!(!TerminationReason::LineSearchFailed.is_converged());
        assert!(!TerminationReason::StoppedByCallback.is_converged());
    }
}
