//! Glue between [`InternalProblem`] and `argmin`.
//!
//! Argmin has no notion of box constraints, so bounded runs evaluate the
//! objective at the clamped point and project the gradient: a component that
//! would push further out of a bound it already sits on is zeroed. Solutions
//! are clamped once more on the way out.
//!
//! Derivative-free solvers use [`ArgminProblem::penalized`] instead: the
//! clamped cost plus the squared distance to the box, so vertices outside the
//! box never tie with the boundary point they clamp to.
use crate::core::{Error, Result};
use crate::optimization::problem::InternalProblem;
use crate::optimization::solvers::traits::InternalResult;
use argmin::core::{
    CostFunction, Gradient, IterState, KV, Problem, Solver, State, TerminationReason,
    TerminationStatus,
};
use argmin_math::ArgminL2Norm;
use serde::{Deserialize, Serialize};

/// Flat parameter vector as argmin sees it.
pub type Param = Vec<f64>;

const BOUND_EPS: f64 = 1e-12;

/// Exposes an [`InternalProblem`] as an argmin `CostFunction` + `Gradient`.
pub struct ArgminProblem<'p, 'a> {
    problem: &'p InternalProblem<'a>,
    penalize: bool,
}

impl<'p, 'a> ArgminProblem<'p, 'a> {
    pub fn new(problem: &'p InternalProblem<'a>) -> Self {
        Self {
            problem,
            penalize: false,
        }
    }

    /// Cost of an infeasible point grows with its distance to the box.
    pub fn penalized(problem: &'p InternalProblem<'a>) -> Self {
        Self {
            problem,
            penalize: true,
        }
    }

    fn feasible(&self, x: &Param) -> Param {
        let mut x = x.clone();
        self.problem.clamp(&mut x);
        x
    }
}

impl CostFunction for ArgminProblem<'_, '_> {
    type Param = Param;
    type Output = f64;

    fn cost(&self, x: &Self::Param) -> std::result::Result<Self::Output, argmin::core::Error> {
        if !self.problem.has_bounds() {
            return Ok(self.problem.fun(x)?);
        }
        let value = self.problem.fun(&self.feasible(x))?;
        if self.penalize {
            Ok(value + box_penalty(self.problem, x))
        } else {
            Ok(value)
        }
    }
}

/// Squared distance from `x` to the box.
pub fn box_penalty(problem: &InternalProblem<'_>, x: &[f64]) -> f64 {
    let mut clamped = x.to_vec();
    problem.clamp(&mut clamped);
    x.iter().zip(&clamped).map(|(v, c)| (v - c).powi(2)).sum()
}

impl Gradient for ArgminProblem<'_, '_> {
    type Param = Param;
    type Gradient = Param;

    fn gradient(&self, x: &Self::Param) -> std::result::Result<Self::Gradient, argmin::core::Error> {
        if !self.problem.has_bounds() {
            return Ok(self.problem.gradient(x)?);
        }
        let clamped = self.feasible(x);
        let mut grad = self.problem.gradient(&clamped)?;
        if let Some(lower) = self.problem.lower_bounds() {
            for ((g, &v), &lo) in grad.iter_mut().zip(&clamped).zip(lower) {
                if v <= lo + BOUND_EPS && *g > 0.0 {
                    *g = 0.0;
                }
            }
        }
        if let Some(upper) = self.problem.upper_bounds() {
            for ((g, &v), &hi) in grad.iter_mut().zip(&clamped).zip(upper) {
                if v >= hi - BOUND_EPS && *g < 0.0 {
                    *g = 0.0;
                }
            }
        }
        Ok(grad)
    }
}

/// Stops a gradient-based argmin solver once `||grad|| < tol`.
///
/// Used for solvers that have no gradient tolerance of their own.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GradientTolerance<S> {
    inner: S,
    tol: f64,
}

impl<S> GradientTolerance<S> {
    pub fn new(inner: S, tol: f64) -> Self {
        Self { inner, tol }
    }
}

type GradState = IterState<Param, Param, (), (), (), f64>;

impl<O, S> Solver<O, GradState> for GradientTolerance<S>
where
    S: Solver<O, GradState>,
{
    const NAME: &'static str = S::NAME;

    fn init(
        &mut self,
        problem: &mut Problem<O>,
        state: GradState,
    ) -> std::result::Result<(GradState, Option<KV>), argmin::core::Error> {
        self.inner.init(problem, state)
    }

    fn next_iter(
        &mut self,
        problem: &mut Problem<O>,
        state: GradState,
    ) -> std::result::Result<(GradState, Option<KV>), argmin::core::Error> {
        self.inner.next_iter(problem, state)
    }

    fn terminate(&mut self, state: &GradState) -> TerminationStatus {
        if let Some(grad) = state.get_gradient() {
            if grad.l2_norm() < self.tol {
                return TerminationStatus::Terminated(TerminationReason::SolverConverged);
            }
        }
        self.inner.terminate(state)
    }
}

/// Map an error out of an argmin run, preferring a parked objective error.
pub fn run_error(
    algorithm: &'static str,
    problem: &InternalProblem<'_>,
    err: argmin::core::Error,
) -> Error {
    problem
        .take_failure()
        .unwrap_or_else(|| Error::from_argmin(algorithm, err))
}

/// Turn the final argmin state into an [`InternalResult`].
///
/// A parked objective error wins over whatever the solver reported, and a
/// solver that bailed out (`SolverExit`) is a failure, not a result.
pub fn finish<I>(
    algorithm: &'static str,
    problem: &InternalProblem<'_>,
    state: &I,
) -> Result<InternalResult>
where
    I: State<Param = Param, Float = f64>,
{
    if let Some(err) = problem.take_failure() {
        return Err(err);
    }
    let mut x = state
        .get_best_param()
        .or_else(|| state.get_param())
        .cloned()
        .ok_or_else(|| Error::solver(algorithm, "backend returned no solution"))?;
    problem.clamp(&mut x);

    match state.get_termination_status() {
        TerminationStatus::Terminated(TerminationReason::SolverExit(reason)) => {
            return Err(Error::solver(algorithm, reason.clone()));
        }
        TerminationStatus::Terminated(TerminationReason::MaxItersReached) => {
            tracing::warn!(algorithm, iterations = state.get_iter(), "stopped at iteration cap");
        }
        status => {
            tracing::debug!(algorithm, iterations = state.get_iter(), status = ?status, "backend finished");
        }
    }

    Ok(InternalResult {
        x,
        fun: state.get_best_cost(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Converter, Params};

    fn shifted(p: &Params) -> Result<f64> {
        Ok((p[0] - 2.0).powi(2) + (p[1] + 2.0).powi(2))
    }

    #[test]
    fn cost_is_taken_at_the_clamped_point() {
        let params = Params::from(vec![0.0, 0.0]);
        let problem = InternalProblem::new(
            &shifted,
            Converter::new(&params),
            Some(vec![-1.0, -1.0]),
            Some(vec![1.0, 1.0]),
        );
        let adapter = ArgminProblem::new(&problem);

        let cost = adapter.cost(&vec![5.0, -5.0]).unwrap();

        assert_eq!(cost, 2.0);
        assert_eq!(
            problem.into_history().records()[0].params,
            Params::from([1.0, -1.0])
        );
    }

    #[test]
    fn gradient_is_projected_on_active_bounds() {
        let params = Params::from(vec![0.0, 0.0]);
        let problem = InternalProblem::new(
            &shifted,
            Converter::new(&params),
            Some(vec![-1.0, -1.0]),
            Some(vec![1.0, 1.0]),
        );
        let adapter = ArgminProblem::new(&problem);

        // both components sit on a bound and point outward
        let grad = adapter.gradient(&vec![1.0, -1.0]).unwrap();
        assert_eq!(grad, vec![0.0, 0.0]);

        // interior point keeps the full gradient
        let grad = adapter.gradient(&vec![0.0, 0.0]).unwrap();
        assert!((grad[0] + 4.0).abs() < 1e-6);
        assert!((grad[1] - 4.0).abs() < 1e-6);
    }

    #[test]
    fn penalized_cost_separates_points_outside_the_box() {
        let params = Params::from(vec![0.0, 0.0]);
        let problem = InternalProblem::new(
            &shifted,
            Converter::new(&params),
            Some(vec![-1.0, -1.0]),
            Some(vec![1.0, 1.0]),
        );
        let adapter = ArgminProblem::penalized(&problem);

        let near = adapter.cost(&vec![1.5, -1.0]).unwrap();
        let far = adapter.cost(&vec![3.0, -1.0]).unwrap();

        assert_eq!(near, 2.0 + 0.25);
        assert_eq!(far, 2.0 + 4.0);
        assert_eq!(box_penalty(&problem, &[0.5, 0.5]), 0.0);
    }

    #[test]
    fn unbounded_gradient_is_untouched() {
        let params = Params::from(vec![0.0, 0.0]);
        let problem = InternalProblem::new(&shifted, Converter::new(&params), None, None);
        let adapter = ArgminProblem::new(&problem);

        let grad = adapter.gradient(&vec![2.0, 0.0]).unwrap();

        assert!(grad[0].abs() < 1e-6);
        assert!((grad[1] - 4.0).abs() < 1e-6);
    }
}
