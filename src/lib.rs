//! Minimize functions of named or flat parameters through interchangeable
//! solver backends.
//!
//! The objective sees [`Params`] exactly as the caller built them, the
//! solver sees a flat `Vec<f64>`, and every evaluation in between ends up in
//! the [`History`] of the returned [`OptimizeResult`].
//!
//! | method        | gradient | bounds |
//! |---------------|----------|--------|
//! | `L-BFGS-B`    | numeric  | yes    |
//! | `CG`          | numeric  | no     |
//! | `Nelder-Mead` | none     | yes    |
//! | `bobyqa`      | none     | yes (feature `nlopt`) |
//!
//! Options are passed as a JSON object and checked against the method's own
//! option set, so a misspelled name is an error rather than silently ignored.
//!
//! Logging goes through `tracing`; install a subscriber to see it.

mod core;
mod optimization;
mod optimizer;

pub use self::core::{Converter, Error, Params, Result};
pub use optimization::{AlgoInfo, EvaluationRecord, History, Options, algorithm_info, algorithms};
pub use optimizer::{OptimizeResult, compare, convergence_series, minimize, try_minimize};
