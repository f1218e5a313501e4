use super::objective::ApogeeObjective;
use super::solvers::traits::Problem;
use crate::core::{Bounds, ParameterVector};
use crate::simulation::{SimulationDefaults, Simulator};
use argmin::core::{CostFunction, Error};

/// Apogee maximization as a box-constrained minimization problem
pub struct ApogeeProblem<S> {
    objective: ApogeeObjective<S>,
    initial: Vec<f64>,
    bounds: Vec<(f64, f64)>,
}

impl<S: Simulator> ApogeeProblem<S> {
    pub fn new(simulator: S) -> Self {
        Self::with_settings(
            simulator,
            ParameterVector::default(),
            Bounds::default(),
            SimulationDefaults::default(),
        )
    }

    pub fn with_settings(
        simulator: S,
        initial: ParameterVector,
        bounds: Bounds,
        defaults: SimulationDefaults,
    ) -> Self {
        Self {
            objective: ApogeeObjective::with_defaults(simulator, defaults),
            initial: initial.into(),
            bounds: bounds.as_slice().to_vec(),
        }
    }

    pub fn objective(&self) -> &ApogeeObjective<S> {
        &self.objective
    }
}

impl<S: Simulator> CostFunction for ApogeeProblem<S> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, param: &Self::Param) -> Result<Self::Output, Error> {
        self.objective.cost(param)
    }
}

impl<S: Simulator> Problem for ApogeeProblem<S> {
    fn num_params(&self) -> usize {
        self.initial.len()
    }

    fn initial_params(&self) -> &[f64] {
        &self.initial
    }

    fn bounds(&self) -> &[(f64, f64)] {
        &self.bounds
    }
}
