use super::traits::{AlgoInfo, Algorithm, InternalResult};
use crate::core::{Error, Result};
use crate::optimization::problem::InternalProblem;
use nlopt::{Algorithm as NlAlgorithm, FailState, Nlopt, Target};
use serde::Deserialize;

/// Powell's BOBYQA through NLopt: derivative-free, quadratic trust-region
/// models, native box constraints.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Bobyqa {
    pub stopping_maxfun: u32,
    pub convergence_ftol_rel: f64,
}

impl Bobyqa {
    pub const INFO: AlgoInfo = AlgoInfo {
        name: "bobyqa",
        supports_bounds: true,
        needs_bounds: false,
    };

    pub fn validate(self) -> Result<Self> {
        let name = Self::INFO.name;
        if !(self.convergence_ftol_rel.is_finite() && self.convergence_ftol_rel > 0.0) {
            return Err(Error::option(name, "convergence_ftol_rel must be finite and > 0"));
        }
        if self.stopping_maxfun == 0 {
            return Err(Error::option(name, "stopping_maxfun must be > 0"));
        }
        Ok(self)
    }
}

impl Default for Bobyqa {
    fn default() -> Self {
        Self {
            stopping_maxfun: 100,
            convergence_ftol_rel: 1e-4,
        }
    }
}

fn nlopt_error(state: FailState) -> Error {
    Error::solver(Bobyqa::INFO.name, format!("{state:?}"))
}

impl Algorithm for Bobyqa {
    fn solve(&self, problem: &InternalProblem<'_>, x0: Vec<f64>) -> Result<InternalResult> {
        // NLopt wants an f64 back; the problem parks the first objective
        // error and every later call short-circuits to NaN.
        let objective = |x: &[f64], grad: Option<&mut [f64]>, _: &mut ()| -> f64 {
            if problem.failed() {
                return f64::NAN;
            }
            let evaluated = match grad {
                Some(grad) => problem.fun_and_grad(x).map(|(value, g)| {
                    grad.copy_from_slice(&g);
                    value
                }),
                None => problem.fun(x),
            };
            evaluated.unwrap_or(f64::NAN)
        };

        let mut opt = Nlopt::new(
            NlAlgorithm::Bobyqa,
            problem.num_params(),
            objective,
            Target::Minimize,
            (),
        );
        opt.set_ftol_rel(self.convergence_ftol_rel)
            .map_err(nlopt_error)?;
        opt.set_maxeval(self.stopping_maxfun).map_err(nlopt_error)?;
        if let Some(lower) = problem.lower_bounds() {
            opt.set_lower_bounds(lower).map_err(nlopt_error)?;
        }
        if let Some(upper) = problem.upper_bounds() {
            opt.set_upper_bounds(upper).map_err(nlopt_error)?;
        }

        let mut x = x0;
        problem.clamp(&mut x);
        let outcome = opt.optimize(&mut x);

        if let Some(err) = problem.take_failure() {
            return Err(err);
        }
        match outcome {
            Ok((state, fun)) => {
                tracing::debug!(algorithm = Bobyqa::INFO.name, status = ?state, "backend finished");
                if matches!(state, nlopt::SuccessState::MaxEvalReached) {
                    tracing::warn!(
                        algorithm = Bobyqa::INFO.name,
                        maxfun = self.stopping_maxfun,
                        "stopped at evaluation cap"
                    );
                }
                Ok(InternalResult { x, fun })
            }
            Err((state, _)) => Err(nlopt_error(state)),
        }
    }
}
