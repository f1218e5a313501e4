pub mod config;
pub mod reference;

pub use config::{
    InitialConditions, Integrator, PhysicalConstants, SimulationConfig,
    SimulationDefaults, SolverSelection, StopCondition, assemble, assemble_with,
};
pub use reference::SolidRocket;

use indexmap::IndexMap;
use serde::Serialize;
use thiserror::Error;

/// Key of the apogee height in a [`SimulationResult`]
pub const MAX_HEIGHT: &str = "h_max";

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Numerical divergence: {0}")]
    Diverged(String),

    #[error("Result is missing '{0}'")]
    MissingResult(&'static str),

    #[error("Result '{name}' is not finite: {value}")]
    NonFinite { name: &'static str, value: f64 },

    #[error("Simulator panicked: {0}")]
    Panicked(String),

    #[error("Simulator error: {0}")]
    Other(String),
}

/// Named outputs of one simulator run
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SimulationResult {
    values: IndexMap<String, f64>,
}

impl SimulationResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Result holding only the apogee height
    pub fn with_max_height(h_max: f64) -> Self {
        let mut result = Self::new();
        result.insert(MAX_HEIGHT, h_max);
        result
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, &v)| (k.as_str(), v))
    }

    /// Apogee height; missing or non-finite values count as a failed run
    pub fn max_height(&self) -> Result<f64, SimulationError> {
        let h_max = self
            .get(MAX_HEIGHT)
            .ok_or(SimulationError::MissingResult(MAX_HEIGHT))?;

        if !h_max.is_finite() {
            return Err(SimulationError::NonFinite {
                name: MAX_HEIGHT,
                value: h_max,
            });
        }

        Ok(h_max)
    }
}

/// External trajectory simulator
///
/// One call runs a full engine + trajectory simulation. Implementations may
/// fail for any reason; callers only distinguish success from failure.
pub trait Simulator {
    fn attempt(&self, config: &SimulationConfig) -> Result<SimulationResult, SimulationError>;
}

impl<F> Simulator for F
where
    F: Fn(&SimulationConfig) -> Result<SimulationResult, SimulationError>,
{
    fn attempt(&self, config: &SimulationConfig) -> Result<SimulationResult, SimulationError> {
        self(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_height_reads_named_field() {
        let mut result = SimulationResult::with_max_height(1234.5);
        result.insert("t_apogee", 17.0);
        assert_eq!(result.max_height().unwrap(), 1234.5);
        assert_eq!(result.get("t_apogee"), Some(17.0));
    }

    #[test]
    fn missing_height_is_an_error() {
        let mut result = SimulationResult::new();
        result.insert("t_apogee", 17.0);
        assert!(matches!(
            result.max_height(),
            Err(SimulationError::MissingResult("h_max"))
        ));
    }

    #[test]
    fn non_finite_height_is_an_error() {
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let result = SimulationResult::with_max_height(bad);
            assert!(matches!(
                result.max_height(),
                Err(SimulationError::NonFinite { .. })
            ));
        }
    }

    #[test]
    fn closures_are_simulators() {
        let sim = |_: &SimulationConfig| {
            Ok::<_, SimulationError>(SimulationResult::with_max_height(10.0))
        };
        let config = assemble(&crate::core::ParameterVector::default());
        assert_eq!(sim.attempt(&config).unwrap().max_height().unwrap(), 10.0);
    }
}
