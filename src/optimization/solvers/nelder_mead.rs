use super::argmin_adapter::{ArgminProblem, Param, box_penalty, finish, run_error};
use super::traits::{AlgoInfo, Algorithm, InternalResult};
use crate::core::{Error, Result};
use crate::optimization::problem::InternalProblem;
use argmin::core::{Executor, State};
use argmin::solver::neldermead::NelderMead as ArgminNelderMead;
use serde::Deserialize;

/// Relative step used to build the initial simplex around `x0`.
const NONZERO_STEP: f64 = 0.05;
/// Absolute step for components of `x0` that are exactly zero.
const ZERO_STEP: f64 = 0.00025;

/// Derivative-free downhill simplex.
///
/// Bounds are honored by evaluating every vertex at its clamped position and
/// charging vertices outside the box their squared distance to it.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NelderMead {
    pub stopping_maxiter: u64,
    /// Stop once the standard deviation of the simplex's cost values falls
    /// below this.
    pub convergence_ftol: f64,
    /// Scale the simplex coefficients with the problem dimension.
    pub adaptive: bool,
}

impl NelderMead {
    pub const INFO: AlgoInfo = AlgoInfo {
        name: "Nelder-Mead",
        supports_bounds: true,
        needs_bounds: false,
    };

    pub fn validate(self) -> Result<Self> {
        let name = Self::INFO.name;
        if !(self.convergence_ftol.is_finite() && self.convergence_ftol > 0.0) {
            return Err(Error::option(name, "convergence_ftol must be finite and > 0"));
        }
        if self.stopping_maxiter == 0 {
            return Err(Error::option(name, "stopping_maxiter must be > 0"));
        }
        Ok(self)
    }

    /// `x0` plus one vertex per dimension, each nudged along its own axis.
    fn initial_simplex(&self, problem: &InternalProblem<'_>, x0: &[f64]) -> Vec<Param> {
        let mut simplex = Vec::with_capacity(x0.len() + 1);
        simplex.push(x0.to_vec());
        for i in 0..x0.len() {
            let mut vertex = x0.to_vec();
            vertex[i] = if vertex[i] != 0.0 {
                vertex[i] * (1.0 + NONZERO_STEP)
            } else {
                ZERO_STEP
            };
            problem.clamp(&mut vertex);
            // a vertex pinned back onto x0 by a bound would collapse the simplex
            if vertex[i] == x0[i] {
                vertex[i] = x0[i] - (vertex[i].abs() * NONZERO_STEP).max(ZERO_STEP);
                problem.clamp(&mut vertex);
            }
            simplex.push(vertex);
        }
        simplex
    }
}

impl Default for NelderMead {
    fn default() -> Self {
        Self {
            stopping_maxiter: 10_000,
            convergence_ftol: 1e-8,
            adaptive: true,
        }
    }
}

impl Algorithm for NelderMead {
    fn solve(&self, problem: &InternalProblem<'_>, x0: Vec<f64>) -> Result<InternalResult> {
        let name = Self::INFO.name;
        let to_error = |e| run_error(name, problem, e);

        let mut x0 = x0;
        problem.clamp(&mut x0);
        let simplex = self.initial_simplex(problem, &x0);

        let mut solver = ArgminNelderMead::new(simplex)
            .with_sd_tolerance(self.convergence_ftol)
            .map_err(to_error)?;

        // Gao & Han coefficients; argmin caps contraction at 0.5
        let n = x0.len() as f64;
        if self.adaptive && n >= 2.0 {
            solver = solver
                .with_alpha(1.0)
                .map_err(to_error)?
                .with_gamma(1.0 + 2.0 / n)
                .map_err(to_error)?
                .with_rho((0.75 - 1.0 / (2.0 * n)).min(0.5))
                .map_err(to_error)?
                .with_sigma(1.0 - 1.0 / n)
                .map_err(to_error)?;
        }
        let max_iters = self.stopping_maxiter;

        let result = Executor::new(ArgminProblem::penalized(problem), solver)
            .configure(|state| state.max_iters(max_iters))
            .run()
            .map_err(to_error)?;

        let state = result.state();
        let penalty = state
            .get_best_param()
            .map_or(0.0, |best| box_penalty(problem, best));
        let mut res = finish(name, problem, state)?;
        res.fun -= penalty;
        Ok(res)
    }
}
