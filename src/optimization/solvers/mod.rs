mod lbfgsb;
pub mod traits;

pub use lbfgsb::LbfgsbOptimizer;
pub use traits::{
    OptimizationCallback, Problem, Solver, SolverError, SolverResult, TerminationReason,
};
