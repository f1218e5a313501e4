use apogee_optimizer::optimization::solvers::{OptimizationCallback, TerminationReason};
use apogee_optimizer::{
    ApogeeObjective, ApogeeOptimizer, optimize_apogee, Bounds, EPSILON, INITIAL_GUESS, NUM_PARAMS,
    OptimizeError, OptimizerOptions, PENALTY, ParameterVector, Settings, SimulationConfig,
    SimulationError, SimulationResult,
};
use approx::assert_abs_diff_eq;
use std::cell::RefCell;

fn quiet_settings(max_iterations: u32) -> Settings {
    Settings {
        options: OptimizerOptions {
            max_iterations,
            disp: false,
            ..OptimizerOptions::default()
        },
        ..Settings::default()
    }
}

fn radius_peak(config: &SimulationConfig) -> Result<SimulationResult, SimulationError> {
    let r = config.params.r;
    Ok(SimulationResult::with_max_height(1000.0 - (r - 0.07).powi(2)))
}

fn never_flies(_: &SimulationConfig) -> Result<SimulationResult, SimulationError> {
    Err(SimulationError::Other("motor failed to ignite".into()))
}

/// Smooth bowl with its peak at an interior design point
fn interior_peak(config: &SimulationConfig) -> Result<SimulationResult, SimulationError> {
    let p = &config.params;
    let h = 3000.0
        - 1e5 * (p.r - 0.06).powi(2)
        - 1e5 * (p.l - 0.3).powi(2)
        - 10.0 * (p.alpha - 12.0).powi(2);
    Ok(SimulationResult::with_max_height(h))
}

/// Lighter payload always helps; radius has an interior optimum
fn light_payload_wins(config: &SimulationConfig) -> Result<SimulationResult, SimulationError> {
    let p = &config.params;
    Ok(SimulationResult::with_max_height(
        2000.0 - 300.0 * p.mpl - 1e5 * (p.r - 0.06).powi(2),
    ))
}

#[test]
fn default_run_moves_payload_toward_its_lower_bound() {
    let outcome = optimize_apogee(light_payload_wins).unwrap();
    let start = ParameterVector::from(INITIAL_GUESS);

    assert!(outcome.parameters.mpl < start.mpl, "Mpl = {}", outcome.parameters.mpl);
    assert!((outcome.parameters.r - 0.06).abs() < 5e-3, "R = {}", outcome.parameters.r);
    assert!(outcome.parameters.is_within(&Bounds::default()));
}

#[test]
fn single_peak_in_radius_is_found() {
    let optimizer = ApogeeOptimizer::from_settings(radius_peak, quiet_settings(50)).unwrap();
    let outcome = optimizer.optimize().unwrap();

    assert_abs_diff_eq!(outcome.parameters.r, 0.07, epsilon = 1e-3);
    assert_abs_diff_eq!(outcome.h_max, 1000.0, epsilon = 1e-3);
    assert!(outcome.parameters.is_within(&Bounds::default()));

    // Nothing else affects the height, so nothing else moves
    let start = ParameterVector::from(INITIAL_GUESS);
    assert_eq!(outcome.parameters.l, start.l);
    assert_eq!(outcome.parameters.mpl, start.mpl);
}

#[test]
fn failing_simulator_gives_no_improvement() {
    let optimizer = ApogeeOptimizer::from_settings(never_flies, quiet_settings(50)).unwrap();
    let outcome = optimizer.optimize().unwrap();

    assert_eq!(outcome.parameters, ParameterVector::from(INITIAL_GUESS));
    assert_eq!(outcome.h_max, -PENALTY);
    assert_eq!(outcome.failed_simulations, outcome.evaluations);
}

#[test]
fn exit_radius_is_corrected_before_simulation() {
    let seen = RefCell::new(Vec::new());
    let objective = ApogeeObjective::new(|config: &SimulationConfig| {
        seen.borrow_mut().push(config.params);
        Ok::<_, SimulationError>(SimulationResult::with_max_height(100.0))
    });

    let mut raw = INITIAL_GUESS;
    raw[2] = 0.02;
    raw[3] = 0.01;
    let cost = objective.evaluate(&ParameterVector::from(raw));

    assert_eq!(cost, -100.0);
    let seen = seen.borrow();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].rg, 0.02);
    assert_abs_diff_eq!(seen[0].rs, 0.02 + EPSILON, epsilon = 1e-15);
}

#[test]
fn evaluation_is_finite_for_any_vector() {
    let objective = ApogeeObjective::new(interior_peak);
    let vectors = [
        [0.0; NUM_PARAMS],
        [-1.0; NUM_PARAMS],
        [f64::NAN; NUM_PARAMS],
        [1e9; NUM_PARAMS],
        INITIAL_GUESS,
    ];
    for v in vectors {
        assert!(objective.evaluate(&ParameterVector::from(v)).is_finite());
    }

    let failing = ApogeeObjective::new(never_flies);
    for v in vectors {
        assert_eq!(failing.evaluate(&ParameterVector::from(v)), PENALTY);
    }
}

#[test]
fn interior_optimum_stays_inside_bounds() {
    let optimizer = ApogeeOptimizer::from_settings(interior_peak, quiet_settings(50)).unwrap();
    let outcome = optimizer.optimize().unwrap();

    let start_cost = ApogeeObjective::new(interior_peak).evaluate(&ParameterVector::default());
    assert!(outcome.parameters.is_within(&Bounds::default()));
    assert!(outcome.h_max > -start_cost);
}

#[derive(Default)]
struct CountingCallback {
    iterations: Vec<u32>,
}

impl OptimizationCallback for CountingCallback {
    fn on_iteration(&mut self, iteration: u32, _params: &[f64], _cost: f64) -> Result<(), String> {
        self.iterations.push(iteration);
        Ok(())
    }
}

#[test]
fn iteration_cap_is_respected_and_reported() {
    let mut settings = quiet_settings(2);
    settings.options.ftol = 0.0;
    settings.options.gtol = 0.0;

    let optimizer = ApogeeOptimizer::from_settings(interior_peak, settings).unwrap();
    let mut callback = CountingCallback::default();

    match optimizer.optimize_with(&mut callback) {
        Err(OptimizeError::NotConverged {
            reason,
            iterations,
            last,
            ..
        }) => {
            assert_eq!(reason, TerminationReason::MaxIterations);
            assert_eq!(iterations, 2);
            assert!(last.is_within(&Bounds::default()));
        }
        other => panic!("expected NotConverged, got {other:?}"),
    }
    assert_eq!(callback.iterations, vec![0, 1, 2]);
}

#[test]
fn outcome_serializes_with_simulator_field_names() {
    let optimizer = ApogeeOptimizer::from_settings(radius_peak, quiet_settings(50)).unwrap();
    let outcome = optimizer.optimize().unwrap();

    let json = serde_json::to_value(&outcome).unwrap();
    assert!(json["parameters"]["R"].is_number());
    assert!(json["simulated"]["Rs"].is_number());
    assert!(json["h_max"].is_number());
}
