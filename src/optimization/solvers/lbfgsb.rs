use super::traits::{
    OptimizationCallback, Problem, Solver, SolverError, SolverResult, TerminationReason,
};
use argmin_math::{ArgminDot, ArgminL2Norm, ArgminMul, ArgminScaledAdd, ArgminSub};
use std::collections::VecDeque;
use tracing::debug;

/// Curvature pairs with s'y below this fraction of y'y are skipped
const CURVATURE_EPS: f64 = 2.2e-16;

/// Trial points this close to a bound (relative to the box width) land on it
const SNAP_TOL: f64 = 1e-10;

/// One (s, y) correction pair of the inverse-Hessian approximation
struct Correction {
    s: Vec<f64>,
    y: Vec<f64>,
    rho: f64,
}

enum LineSearch {
    Accepted(Vec<f64>, f64),
    Failed,
    OutOfBudget,
}

/// Box-constrained limited-memory BFGS with finite-difference gradients
///
/// Variables pinned at a bound by the gradient are held fixed, the two-loop
/// recursion runs on the rest, and every trial point is projected back into
/// the box. Suitable for expensive black-box objectives: the gradient costs
/// one extra evaluation per parameter and the line search usually one or two.
pub struct LbfgsbOptimizer {
    max_iter: u32,
    max_evals: usize,
    ftol: f64,
    gtol: f64,
    memory: usize,
    fd_step: f64,
    armijo_c: f64,     // Armijo condition parameter
    max_backtracks: u32,
}

impl LbfgsbOptimizer {
    pub fn new(max_iter: u32, ftol: f64, gtol: f64) -> Self {
        Self {
            max_iter,
            max_evals: 15_000,
            ftol,
            gtol,
            memory: 10,
            fd_step: 1e-8,
            armijo_c: 1e-4,
            max_backtracks: 20,
        }
    }

    /// Number of stored correction pairs (default: 10)
    pub fn with_memory(mut self, memory: usize) -> Self {
        self.memory = memory.max(1);
        self
    }

    /// Objective evaluation budget (default: 15000)
    pub fn with_max_evaluations(mut self, max_evals: usize) -> Self {
        self.max_evals = max_evals;
        self
    }

    /// Absolute finite-difference step (default: 1e-8)
    pub fn with_fd_step(mut self, step: f64) -> Self {
        self.fd_step = step;
        self
    }

    #[inline]
    fn clamp_params(params: &mut [f64], bounds: &[(f64, f64)]) {
        for (p, &(min, max)) in params.iter_mut().zip(bounds) {
            *p = p.clamp(min, max);
        }
    }

    fn evaluate<P: Problem>(
        problem: &P,
        params: &[f64],
        cost_evals: &mut usize,
    ) -> Result<f64, SolverError> {
        *cost_evals += 1;
        problem
            .cost(&params.to_vec())
            .map_err(SolverError::Objective)
    }

    /// Forward-difference gradient; steps backward at the upper bound
    fn compute_gradient<P: Problem>(
        &self,
        problem: &P,
        params: &[f64],
        cost: f64,
        bounds: &[(f64, f64)],
        cost_evals: &mut usize,
    ) -> Result<Vec<f64>, SolverError> {
        let mut grad = vec![0.0; params.len()];

        for (i, &(_, max)) in bounds.iter().enumerate() {
            let h = if params[i] + self.fd_step > max {
                -self.fd_step
            } else {
                self.fd_step
            };

            let mut shifted = params.to_vec();
            shifted[i] += h;
            let shifted_cost = Self::evaluate(problem, &shifted, cost_evals)?;
            grad[i] = (shifted_cost - cost) / h;
        }

        Ok(grad)
    }

    /// Search direction from the two-loop recursion over the free variables
    fn direction(
        &self,
        params: &[f64],
        grad: &[f64],
        bounds: &[(f64, f64)],
        history: &VecDeque<Correction>,
    ) -> Vec<f64> {
        let free = free_variables(params, grad, bounds);
        let masked = |v: Vec<f64>| -> Vec<f64> {
            v.into_iter()
                .zip(&free)
                .map(|(x, &is_free)| if is_free { x } else { 0.0 })
                .collect()
        };

        let mut q = masked(grad.to_vec());
        let mut alphas = Vec::with_capacity(history.len());
        for c in history.iter().rev() {
            let sq: f64 = c.s.dot(&q);
            let a = c.rho * sq;
            q = q.scaled_add(&(-a), &c.y);
            alphas.push(a);
        }

        let gamma = history
            .back()
            .map(|c| {
                let sy: f64 = c.s.dot(&c.y);
                let yy: f64 = c.y.dot(&c.y);
                sy / yy
            })
            .unwrap_or(1.0);
        let mut r = q.mul(&gamma);

        for (c, a) in history.iter().zip(alphas.into_iter().rev()) {
            let yr: f64 = c.y.dot(&r);
            let b = c.rho * yr;
            r = r.scaled_add(&(a - b), &c.s);
        }

        // Components pushing out of the box through an active bound are dropped
        let mut d = masked(r.mul(&(-1.0_f64)));
        for ((di, &x), &(min, max)) in d.iter_mut().zip(params).zip(bounds) {
            if (x <= min && *di < 0.0) || (x >= max && *di > 0.0) {
                *di = 0.0;
            }
        }
        d
    }

    /// Steepest descent restricted to the free variables
    fn steepest(params: &[f64], grad: &[f64], bounds: &[(f64, f64)]) -> Vec<f64> {
        free_variables(params, grad, bounds)
            .into_iter()
            .zip(grad)
            .map(|(is_free, &g)| if is_free { -g } else { 0.0 })
            .collect()
    }

    /// Backtracking line search along the projected path `clamp(x + alpha d)`
    ///
    /// Several variables may land on their bounds in one step. Sufficient
    /// decrease is measured against the actual displacement `g'(x_trial - x)`.
    #[allow(clippy::too_many_arguments)]
    fn line_search<P: Problem>(
        &self,
        problem: &P,
        params: &[f64],
        cost: f64,
        grad: &[f64],
        direction: &[f64],
        bounds: &[(f64, f64)],
        unit_scaled: bool,
        cost_evals: &mut usize,
    ) -> Result<LineSearch, SolverError> {
        let direction = direction.to_vec();
        let slope: f64 = grad.to_vec().dot(&direction);
        let norm: f64 = direction.l2_norm();

        let mut alpha = if unit_scaled {
            1.0 / norm
        } else {
            1.0
        };
        // Past the last breakpoint every moving variable sits on a bound
        alpha = alpha.min(last_breakpoint(params, &direction, bounds));

        for attempt in 0..self.max_backtracks {
            if *cost_evals >= self.max_evals {
                return Ok(LineSearch::OutOfBudget);
            }

            let mut trial = params.to_vec().scaled_add(&alpha, &direction);
            Self::clamp_params(&mut trial, bounds);
            snap_to_bounds(&mut trial, bounds);

            let trial_cost = Self::evaluate(problem, &trial, cost_evals)?;
            let displacement = trial.sub(&params.to_vec());
            let actual_slope: f64 = grad.to_vec().dot(&displacement);
            if actual_slope < 0.0 && trial_cost <= cost + self.armijo_c * actual_slope {
                return Ok(LineSearch::Accepted(trial, trial_cost));
            }

            // Minimizer of the quadratic through f(0), f'(0) and f(alpha)
            let curvature = 2.0 * (trial_cost - cost - slope * alpha);
            let next = if curvature > 0.0 {
                -slope * alpha * alpha / curvature
            } else {
                0.5 * alpha
            };

            debug!(attempt, alpha, trial_cost, "Line search backtracking");
            alpha = next.clamp(0.1 * alpha, 0.5 * alpha);
        }

        Ok(LineSearch::Failed)
    }

    fn finish(
        reason: TerminationReason,
        params: Vec<f64>,
        cost: f64,
        iterations: u32,
        cost_evals: usize,
    ) -> SolverResult {
        SolverResult {
            success: reason.is_converged(),
            reason,
            cost,
            iterations,
            message: reason.to_string(),
            params,
            cost_evals,
        }
    }
}

impl Solver for LbfgsbOptimizer {
    fn name(&self) -> &str {
        "L-BFGS-B"
    }

    fn solve<P: Problem>(
        &mut self,
        problem: &P,
        callback: &mut dyn OptimizationCallback,
    ) -> Result<SolverResult, SolverError> {
        let n = problem.num_params();
        let bounds = problem.bounds();
        if bounds.len() != n || problem.initial_params().len() != n {
            return Err(SolverError::DimensionMismatch {
                params: problem.initial_params().len(),
                bounds: bounds.len(),
            });
        }

        let mut params = problem.initial_params().to_vec();
        Self::clamp_params(&mut params, bounds);

        let mut cost_evals = 0;
        let mut history: VecDeque<Correction> = VecDeque::with_capacity(self.memory);

        let mut cost = Self::evaluate(problem, &params, &mut cost_evals)?;
        let mut grad = self.compute_gradient(problem, &params, cost, bounds, &mut cost_evals)?;

        callback
            .on_iteration(0, &params, cost)
            .map_err(SolverError::Callback)?;

        let mut iterations = 0;
        let reason = loop {
            if projected_gradient_norm(&params, &grad, bounds) <= self.gtol {
                break TerminationReason::GradientTolerance;
            }
            if iterations >= self.max_iter {
                break TerminationReason::MaxIterations;
            }
            if cost_evals >= self.max_evals {
                break TerminationReason::MaxEvaluations;
            }

            let mut direction = self.direction(&params, &grad, bounds, &history);
            let descent: f64 = grad.dot(&direction);
            if descent >= 0.0 {
                debug!(iteration = iterations, "Not a descent direction, resetting memory");
                history.clear();
                direction = Self::steepest(&params, &grad, bounds);
            }

            let mut step = self.line_search(
                problem,
                &params,
                cost,
                &grad,
                &direction,
                bounds,
                history.is_empty(),
                &mut cost_evals,
            )?;

            if matches!(step, LineSearch::Failed) && !history.is_empty() {
                debug!(iteration = iterations, "Line search failed, retrying along steepest descent");
                history.clear();
                direction = Self::steepest(&params, &grad, bounds);
                step = self.line_search(
                    problem,
                    &params,
                    cost,
                    &grad,
                    &direction,
                    bounds,
                    true,
                    &mut cost_evals,
                )?;
            }

            let (next_params, next_cost) = match step {
                LineSearch::Accepted(next_params, next_cost) => (next_params, next_cost),
                LineSearch::Failed => break TerminationReason::LineSearchFailed,
                LineSearch::OutOfBudget => break TerminationReason::MaxEvaluations,
            };
            iterations += 1;

            // Not enough budget left for a gradient: keep the improved point and stop
            if cost_evals + n > self.max_evals {
                params = next_params;
                cost = next_cost;
                callback
                    .on_iteration(iterations, &params, cost)
                    .map_err(SolverError::Callback)?;
                break TerminationReason::MaxEvaluations;
            }

            let next_grad =
                self.compute_gradient(problem, &next_params, next_cost, bounds, &mut cost_evals)?;

            let s = next_params.sub(&params);
            let y = next_grad.sub(&grad);
            let sy: f64 = s.dot(&y);
            let yy: f64 = y.dot(&y);
            if sy > CURVATURE_EPS * yy {
                if history.len() == self.memory {
                    history.pop_front();
                }
                history.push_back(Correction { s, y, rho: 1.0 / sy });
            } else {
                debug!(iteration = iterations, sy, "Skipping correction pair");
            }

            let previous_cost = cost;
            params = next_params;
            cost = next_cost;
            grad = next_grad;

            callback
                .on_iteration(iterations, &params, cost)
                .map_err(SolverError::Callback)?;
            if callback.should_stop() {
                break TerminationReason::StoppedByCallback;
            }

            let scale = previous_cost.abs().max(cost.abs()).max(1.0);
            if (previous_cost - cost) / scale <= self.ftol {
                break TerminationReason::FunctionTolerance;
            }
        };

        Ok(Self::finish(reason, params, cost, iterations, cost_evals))
    }
}

/// Variables free to move: not held at a bound by the gradient
fn free_variables(params: &[f64], grad: &[f64], bounds: &[(f64, f64)]) -> Vec<bool> {
    params
        .iter()
        .zip(grad)
        .zip(bounds)
        .map(|((&x, &g), &(min, max))| !((x <= min && g > 0.0) || (x >= max && g < 0.0)))
        .collect()
}

/// Infinity norm of `x - clamp(x - g)`
fn projected_gradient_norm(params: &[f64], grad: &[f64], bounds: &[(f64, f64)]) -> f64 {
    params
        .iter()
        .zip(grad)
        .zip(bounds)
        .map(|((&x, &g), &(min, max))| (x - (x - g).clamp(min, max)).abs())
        .fold(0.0, f64::max)
}

/// Move values within rounding distance of a bound exactly onto it
fn snap_to_bounds(params: &mut [f64], bounds: &[(f64, f64)]) {
    for (p, &(min, max)) in params.iter_mut().zip(bounds) {
        let tol = SNAP_TOL * (max - min);
        if *p - min <= tol {
            *p = min;
        } else if max - *p <= tol {
            *p = max;
        }
    }
}

/// Step at which the last moving variable reaches its bound
fn last_breakpoint(params: &[f64], direction: &[f64], bounds: &[(f64, f64)]) -> f64 {
    params
        .iter()
        .zip(direction)
        .zip(bounds)
        .filter(|((_, d), _)| **d != 0.0)
        .map(|((&x, &d), &(min, max))| {
            if d > 0.0 {
                (max - x) / d
            } else {
                (min - x) / d
            }
        })
        .fold(0.0, f64::max)
}
