//! Apogee optimization for solid rocket designs.
//!
//! A raw design vector is validated, merged with fixed physical and numerical
//! tables, flown by a [`Simulator`](simulation::Simulator) and scored by its
//! negated apogee height. A projected L-BFGS search over the design bounds
//! looks for the highest apogee; failed simulations are scored with a fixed
//! penalty instead of aborting the run.

pub mod core;
pub mod optimization;
pub mod optimizer;
pub mod settings;
pub mod simulation;

pub use crate::core::*;
pub use optimization::{ApogeeObjective, ApogeeProblem, PENALTY, ProgressCallback};
pub use optimizer::{
    ApogeeOptimizer, OptimizationOutcome, OptimizeError, OptimizerOptions, optimize_apogee,
};
pub use settings::{Settings, SettingsError};
pub use simulation::{
    SimulationConfig, SimulationError, SimulationResult, Simulator, SolidRocket,
};
