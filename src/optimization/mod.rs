pub mod history;
pub mod problem;
pub mod solvers;

pub use history::{EvaluationRecord, History};
pub use problem::InternalProblem;
pub use solvers::{AlgoInfo, Options, algorithm_info, algorithms};
