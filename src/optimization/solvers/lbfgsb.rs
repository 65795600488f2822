use super::argmin_adapter::{ArgminProblem, Param, finish, run_error};
use super::traits::{AlgoInfo, Algorithm, InternalResult};
use crate::core::{Error, Result};
use crate::optimization::problem::InternalProblem;
use argmin::core::Executor;
use argmin::solver::linesearch::MoreThuenteLineSearch;
use argmin::solver::quasinewton::LBFGS;
use serde::Deserialize;

type MoreThuente = MoreThuenteLineSearch<Param, Param, f64>;

/// Limited-memory BFGS with box constraints.
///
/// Runs argmin's L-BFGS with a More-Thuente line search on the projected
/// problem described in [`super::argmin_adapter`].
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LbfgsB {
    /// Stop when the cost changes by less than this between iterations.
    pub convergence_ftol: f64,
    /// Stop when the (projected) gradient norm drops below this.
    pub convergence_gtol: f64,
    pub stopping_maxiter: u64,
    /// Number of correction pairs kept for the Hessian approximation.
    pub limited_memory_length: usize,
}

impl LbfgsB {
    pub const INFO: AlgoInfo = AlgoInfo {
        name: "L-BFGS-B",
        supports_bounds: true,
        needs_bounds: false,
    };

    pub fn validate(self) -> Result<Self> {
        let name = Self::INFO.name;
        if !(self.convergence_ftol.is_finite() && self.convergence_ftol > 0.0) {
            return Err(Error::option(name, "convergence_ftol must be finite and > 0"));
        }
        if !(self.convergence_gtol.is_finite() && self.convergence_gtol > 0.0) {
            return Err(Error::option(name, "convergence_gtol must be finite and > 0"));
        }
        if self.stopping_maxiter == 0 {
            return Err(Error::option(name, "stopping_maxiter must be > 0"));
        }
        if self.limited_memory_length == 0 {
            return Err(Error::option(name, "limited_memory_length must be > 0"));
        }
        Ok(self)
    }
}

impl Default for LbfgsB {
    fn default() -> Self {
        Self {
            convergence_ftol: 1e-8,
            convergence_gtol: 1e-8,
            stopping_maxiter: 10_000,
            limited_memory_length: 12,
        }
    }
}

impl Algorithm for LbfgsB {
    fn solve(&self, problem: &InternalProblem<'_>, x0: Vec<f64>) -> Result<InternalResult> {
        let name = Self::INFO.name;
        let to_error = |e| run_error(name, problem, e);

        let solver: LBFGS<MoreThuente, Param, Param, f64> =
            LBFGS::new(MoreThuente::new(), self.limited_memory_length)
                .with_tolerance_grad(self.convergence_gtol)
                .map_err(to_error)?
                .with_tolerance_cost(self.convergence_ftol)
                .map_err(to_error)?;

        let mut x0 = x0;
        problem.clamp(&mut x0);
        let max_iters = self.stopping_maxiter;

        let result = Executor::new(ArgminProblem::new(problem), solver)
            .configure(|state| state.param(x0).max_iters(max_iters))
            .run()
            .map_err(to_error)?;

        finish(name, problem, result.state())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Converter, Params};
    use approx::assert_abs_diff_eq;

    fn bowl(p: &Params) -> Result<f64> {
        Ok((p[0] - 1.0).powi(2) + 4.0 * (p[1] + 0.5).powi(2))
    }

    #[test]
    fn finds_unconstrained_minimum() {
        let params = Params::from(vec![3.0, 3.0]);
        let problem = InternalProblem::new(&bowl, Converter::new(&params), None, None);

        let res = LbfgsB::default().solve(&problem, vec![3.0, 3.0]).unwrap();

        assert_abs_diff_eq!(res.x[0], 1.0, epsilon = 1e-4);
        assert_abs_diff_eq!(res.x[1], -0.5, epsilon = 1e-4);
        assert_abs_diff_eq!(res.fun, 0.0, epsilon = 1e-7);
    }

    #[test]
    fn stops_on_active_upper_bound() {
        let params = Params::from(vec![0.0, 0.0]);
        let problem = InternalProblem::new(
            &bowl,
            Converter::new(&params),
            None,
            Some(vec![0.5, 10.0]),
        );

        let res = LbfgsB::default().solve(&problem, vec![0.0, 0.0]).unwrap();

        assert_abs_diff_eq!(res.x[0], 0.5, epsilon = 1e-4);
        assert_abs_diff_eq!(res.x[1], -0.5, epsilon = 1e-4);
        assert!(res.x[0] <= 0.5);
    }

    #[test]
    fn rejects_zero_memory() {
        let opts = LbfgsB {
            limited_memory_length: 0,
            ..LbfgsB::default()
        };

        assert!(matches!(opts.validate(), Err(Error::InvalidOption { .. })));
    }

    #[test]
    fn objective_error_inside_line_search_is_returned() {
        // the minimum sits at a = 1, so some line-search trial must fail;
        // argmin's LBFGS turns such errors into a plain termination
        let guarded = |p: &Params| -> Result<f64> {
            if p[0] < 1.5 {
                Err(Error::Objective("outside model range".into()))
            } else {
                bowl(p)
            }
        };
        let params = Params::from(vec![3.0, 3.0]);
        let problem = InternalProblem::new(&guarded, Converter::new(&params), None, None);

        let err = LbfgsB::default().solve(&problem, vec![3.0, 3.0]).unwrap_err();

        assert!(matches!(err, Error::Objective(ref e) if e.to_string() == "outside model range"));
    }

    #[test]
    fn solver_exit_is_a_failure() {
        use argmin::core::{IterState, State, TerminationReason};

        let params = Params::from(vec![3.0]);
        let problem = InternalProblem::new(&bowl, Converter::new(&params), None, None);
        let state: IterState<Param, Param, (), (), (), f64> = IterState::new()
            .param(vec![3.0])
            .terminate_with(TerminationReason::SolverExit("line search failed".into()));

        let err = finish(LbfgsB::INFO.name, &problem, &state).unwrap_err();

        match err {
            Error::SolverFailure { algorithm, message } => {
                assert_eq!(algorithm, "L-BFGS-B");
                assert_eq!(message, "line search failed");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
