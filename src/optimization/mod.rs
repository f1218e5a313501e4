pub mod callback;
pub mod objective;
pub mod problem;
pub mod solvers;

pub use callback::{IterationResult, ProgressCallback};
pub use objective::{ApogeeObjective, PENALTY};
pub use problem::ApogeeProblem;
pub use solvers::{LbfgsbOptimizer, Problem, Solver, SolverResult};
