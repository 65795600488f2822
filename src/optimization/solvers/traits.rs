use crate::core::Result;
use crate::optimization::problem::InternalProblem;
use serde::Serialize;

/// Static description of what an algorithm can do with bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct AlgoInfo {
    pub name: &'static str,
    pub supports_bounds: bool,
    pub needs_bounds: bool,
}

/// Raw outcome of a backend run, still in flat form.
#[derive(Clone, Debug, PartialEq)]
pub struct InternalResult {
    pub x: Vec<f64>,
    pub fun: f64,
}

/// Solver interface - one implementation per backend
pub trait Algorithm: std::fmt::Debug {
    /// Minimize `problem` starting from `x0`.
    fn solve(&self, problem: &InternalProblem<'_>, x0: Vec<f64>) -> Result<InternalResult>;
}

// ============================================================================
// ADDING A BACKEND
// ============================================================================
//
// 1. Create an options struct. Derive `Deserialize` with
//    `#[serde(default, deny_unknown_fields)]` and implement `Default` with
//    the backend defaults. Field names follow the `convergence_*` /
//    `stopping_*` convention so callers can reuse option maps:
//
//    #[derive(Clone, Debug, PartialEq, Deserialize)]
//    #[serde(default, deny_unknown_fields)]
//    pub struct MyBackend {
//        pub convergence_ftol: f64,
//        pub stopping_maxiter: u64,
//    }
//
// 2. Give it an `AlgoInfo` constant and validate values in `validate()`,
//    returning `Error::InvalidOption` for anything the backend would reject.
//
// 3. Implement `Algorithm::solve`:
//    - translate `problem.lower_bounds()` / `problem.upper_bounds()` into
//      whatever the backend wants (or clamp through `problem.clamp`)
//    - call the backend with `problem.fun` (and `problem.gradient` if the
//      backend is gradient based)
//    - once the backend returns (Ok or Err), return
//      `problem.take_failure()` first if it holds an objective error;
//      backends may swallow the stand-in error `problem.fun` hands them
//    - map remaining backend failures to `Error::SolverFailure`
//    - return `InternalResult { x, fun }`
//
// 4. Add a `Registration` to `REGISTRY` in `solvers/mod.rs`.
//
// ============================================================================
