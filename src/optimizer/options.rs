use crate::optimization::LbfgsbOptimizer;
use serde::{Deserialize, Serialize};

/// Search options for the bounded optimizer
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerOptions {
    /// Iteration cap
    pub max_iterations: u32,
    /// Report progress per iteration and print the end-of-run summary
    pub disp: bool,
    /// Relative objective reduction tolerance
    pub ftol: f64,
    /// Projected gradient tolerance
    pub gtol: f64,
    /// Stored correction pairs
    pub memory: usize,
    /// Simulator run budget
    pub max_evaluations: usize,
    /// Finite-difference step
    pub fd_step: f64,
}

impl Default for OptimizerOptions {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            disp: true,
            ftol: 1e-3,
            gtol: 1e-3,
            memory: 10,
            max_evaluations: 15_000,
            fd_step: 1e-8,
        }
    }
}

impl OptimizerOptions {
    pub fn solver(&self) -> LbfgsbOptimizer {
        LbfgsbOptimizer::new(self.max_iterations, self.ftol, self.gtol)
            .with_memory(self.memory)
            .with_max_evaluations(self.max_evaluations)
            .with_fd_step(self.fd_step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_fixed_run() {
        let options = OptimizerOptions::default();
        assert_eq!(options.max_iterations, 50);
        assert!(options.disp);
        assert_eq!(options.ftol, 1e-3);
        assert_eq!(options.gtol, 1e-3);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let options: OptimizerOptions =
            serde_json::from_str(r#"{ "max_iterations": 5, "disp": false }"#).unwrap();
        assert_eq!(options.max_iterations, 5);
        assert!(!options.disp);
        assert_eq!(options.memory, 10);
        assert_eq!(options.fd_step, 1e-8);
    }
}
