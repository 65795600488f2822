mod compare;

pub use compare::{compare, convergence_series};

use crate::core::{Converter, Error, Params, Result};
use crate::optimization::History;
use crate::optimization::problem::{InternalProblem, ObjectiveFn};
use crate::optimization::solvers::{AlgoInfo, Options, lookup};
use serde::Serialize;
use std::convert::Infallible;

/// Outcome of a [`minimize`] call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizeResult {
    /// Best parameters found, in the same shape as the initial parameters.
    pub x: Params,
    /// Every evaluation made during the run.
    pub history: History,
    /// Objective value reported by the backend for `x`.
    pub fun: f64,
    /// Canonical name of the algorithm that ran.
    pub method: &'static str,
}

impl OptimizeResult {
    /// Number of objective evaluations.
    pub fn n_evals(&self) -> usize {
        self.history.len()
    }
}

/// Minimize `fun` starting from `params`.
///
/// `params` may be named or flat; `res.x` comes back in the same shape and
/// bounds must match it key for key. See [`crate::algorithms`] for the
/// accepted `method` names and [`Options`] for how options are passed.
///
/// ```no_run
/// use unimin::{Params, minimize};
///
/// let params = Params::from([("a", 1.0), ("b", 2.0)]);
/// let res = minimize(|p| p["a"].powi(2) + p["b"].powi(2), &params, "L-BFGS-B", None, None, None)?;
/// assert!(res.x["a"].abs() < 1e-4);
/// # Ok::<(), unimin::Error>(())
/// ```
pub fn minimize<F>(
    fun: F,
    params: &Params,
    method: &str,
    lower_bounds: Option<&Params>,
    upper_bounds: Option<&Params>,
    options: Option<Options>,
) -> Result<OptimizeResult>
where
    F: Fn(&Params) -> f64,
{
    try_minimize(
        |p: &Params| Ok::<f64, Infallible>(fun(p)),
        params,
        method,
        lower_bounds,
        upper_bounds,
        options,
    )
}

/// Like [`minimize`], for objectives that can fail.
///
/// The first error returned by `fun` aborts the run and comes back as
/// [`Error::Objective`] holding that same error.
pub fn try_minimize<F, E>(
    fun: F,
    params: &Params,
    method: &str,
    lower_bounds: Option<&Params>,
    upper_bounds: Option<&Params>,
    options: Option<Options>,
) -> Result<OptimizeResult>
where
    F: Fn(&Params) -> std::result::Result<f64, E>,
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let objective = |p: &Params| fun(p).map_err(|e| Error::Objective(e.into()));
    dispatch(&objective, params, method, lower_bounds, upper_bounds, options)
}

fn dispatch(
    objective: &ObjectiveFn<'_>,
    params: &Params,
    method: &str,
    lower_bounds: Option<&Params>,
    upper_bounds: Option<&Params>,
    options: Option<Options>,
) -> Result<OptimizeResult> {
    let registration = lookup(method)?;
    let info = registration.info;
    let algorithm = registration.build(options)?;
    check_bound_support(info, lower_bounds.is_some(), upper_bounds.is_some())?;

    let converter = Converter::new(params);
    let lower = lower_bounds.map(|b| converter.flatten(b)).transpose()?;
    let upper = upper_bounds.map(|b| converter.flatten(b)).transpose()?;
    if let (Some(lower), Some(upper)) = (&lower, &upper) {
        check_bound_order(lower, upper)?;
    }
    let x0 = converter.flatten(params)?;

    tracing::debug!(
        algorithm = info.name,
        n_params = x0.len(),
        bounded = lower.is_some() || upper.is_some(),
        "starting minimization"
    );

    let problem = InternalProblem::new(objective, converter, lower, upper);
    let raw = algorithm.solve(&problem, x0)?;

    let x = problem.converter().unflatten(&raw.x);
    let history = problem.into_history();
    tracing::info!(
        algorithm = info.name,
        n_evals = history.len(),
        fun = raw.fun,
        "minimization finished"
    );

    Ok(OptimizeResult {
        x,
        history,
        fun: raw.fun,
        method: info.name,
    })
}

fn check_bound_support(info: AlgoInfo, has_lower: bool, has_upper: bool) -> Result<()> {
    if info.needs_bounds && !(has_lower && has_upper) {
        return Err(Error::MissingBounds {
            algorithm: info.name,
        });
    }
    if !info.supports_bounds && (has_lower || has_upper) {
        return Err(Error::UnsupportedBounds {
            algorithm: info.name,
        });
    }
    Ok(())
}

fn check_bound_order(lower: &[f64], upper: &[f64]) -> Result<()> {
    match lower.iter().zip(upper).position(|(lo, hi)| lo > hi) {
        Some(index) => Err(Error::InvalidBounds {
            index,
            lower: lower[index],
            upper: upper[index],
        }),
        None => Ok(()),
    }
}
