use super::argmin_adapter::{ArgminProblem, GradientTolerance, Param, finish, run_error};
use super::traits::{AlgoInfo, Algorithm, InternalResult};
use crate::core::{Error, Result};
use crate::optimization::problem::InternalProblem;
use argmin::core::Executor;
use argmin::solver::conjugategradient::NonlinearConjugateGradient;
use argmin::solver::conjugategradient::beta::PolakRibiere;
use argmin::solver::linesearch::MoreThuenteLineSearch;
use serde::Deserialize;

/// Nonlinear conjugate gradient (Polak-Ribière), unbounded only.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConjugateGradient {
    /// Stop when the gradient norm drops below this.
    pub convergence_gtol: f64,
    pub stopping_maxiter: u64,
}

impl ConjugateGradient {
    pub const INFO: AlgoInfo = AlgoInfo {
        name: "CG",
        supports_bounds: false,
        needs_bounds: false,
    };

    pub fn validate(self) -> Result<Self> {
        let name = Self::INFO.name;
        if !(self.convergence_gtol.is_finite() && self.convergence_gtol > 0.0) {
            return Err(Error::option(name, "convergence_gtol must be finite and > 0"));
        }
        if self.stopping_maxiter == 0 {
            return Err(Error::option(name, "stopping_maxiter must be > 0"));
        }
        Ok(self)
    }
}

impl Default for ConjugateGradient {
    fn default() -> Self {
        Self {
            convergence_gtol: 1e-8,
            stopping_maxiter: 10_000,
        }
    }
}

impl Algorithm for ConjugateGradient {
    fn solve(&self, problem: &InternalProblem<'_>, x0: Vec<f64>) -> Result<InternalResult> {
        let name = Self::INFO.name;
        let to_error = |e| run_error(name, problem, e);

        let linesearch: MoreThuenteLineSearch<Param, Param, f64> = MoreThuenteLineSearch::new();
        let cg = NonlinearConjugateGradient::new(linesearch, PolakRibiere::new())
            .restart_iters(10)
            .restart_orthogonality(0.1);
        let solver = GradientTolerance::new(cg, self.convergence_gtol);
        let max_iters = self.stopping_maxiter;

        let result = Executor::new(ArgminProblem::new(problem), solver)
            .configure(|state| state.param(x0).max_iters(max_iters))
            .run()
            .map_err(to_error)?;

        finish(name, problem, result.state())
    }
}
