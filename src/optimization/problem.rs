use crate::core::{Converter, Error, Params, Result};
use crate::optimization::history::History;
use finitediff::FiniteDiff;
use std::cell::RefCell;

/// User objective after its error type has been erased.
pub type ObjectiveFn<'a> = dyn Fn(&Params) -> Result<f64> + 'a;

/// The user objective seen through a flat vector.
///
/// Every call unflattens `x`, runs the objective and logs the evaluation.
/// Nothing is cached: a solver probing the same point twice gets two
/// evaluations and two history entries.
pub struct InternalProblem<'a> {
    user_fun: &'a ObjectiveFn<'a>,
    converter: Converter,
    history: RefCell<History>,
    /// First error raised by the objective. Later calls are refused.
    failure: RefCell<Option<Error>>,
    lower_bounds: Option<Vec<f64>>,
    upper_bounds: Option<Vec<f64>>,
}

/// Finite-difference step, the same one `finitediff` uses.
const FD_STEP: f64 = 1.490_116_119_384_765_6e-8;

impl<'a> InternalProblem<'a> {
    pub fn new(
        user_fun: &'a ObjectiveFn<'a>,
        converter: Converter,
        lower_bounds: Option<Vec<f64>>,
        upper_bounds: Option<Vec<f64>>,
    ) -> Self {
        Self {
            user_fun,
            converter,
            history: RefCell::new(History::new()),
            failure: RefCell::new(None),
            lower_bounds,
            upper_bounds,
        }
    }

    /// Number of free parameters
    pub fn num_params(&self) -> usize {
        self.converter.len()
    }

    pub fn lower_bounds(&self) -> Option<&[f64]> {
        self.lower_bounds.as_deref()
    }

    pub fn upper_bounds(&self) -> Option<&[f64]> {
        self.upper_bounds.as_deref()
    }

    pub fn has_bounds(&self) -> bool {
        self.lower_bounds.is_some() || self.upper_bounds.is_some()
    }

    /// Evaluate the objective at `x` and record it.
    ///
    /// A failing objective is parked (see [`Self::take_failure`]) and the
    /// backend gets a stand-in error; once parked, no further evaluations run.
    /// Some backends swallow errors raised mid-run, so adapters must check
    /// the slot before trusting a result.
    pub fn fun(&self, x: &[f64]) -> Result<f64> {
        if self.failed() {
            return Err(Error::solver("objective", "objective failed earlier in this run"));
        }
        let params = self.converter.unflatten(x);
        match (self.user_fun)(&params) {
            Ok(value) => {
                self.history.borrow_mut().add(value, params);
                Ok(value)
            }
            Err(err) => {
                let message = err.to_string();
                *self.failure.borrow_mut() = Some(err);
                Err(Error::solver("objective", message))
            }
        }
    }

    /// Whether the objective has failed during this run.
    pub fn failed(&self) -> bool {
        self.failure.borrow().is_some()
    }

    /// The parked objective error, if any.
    pub fn take_failure(&self) -> Option<Error> {
        self.failure.borrow_mut().take()
    }

    /// Finite-difference gradient of [`Self::fun`].
    ///
    /// Each probe is an ordinary recorded evaluation. Unbounded problems use
    /// central differences. With bounds, `x` is clamped first and a component
    /// sitting on (or within one step of) a bound is differenced one-sided,
    /// stepping into the box, so the objective never sees an infeasible point.
    /// The first failing probe stops the rest.
    pub fn gradient(&self, x: &[f64]) -> Result<Vec<f64>> {
        if self.has_bounds() {
            return self.bounded_gradient(x);
        }
        let probe = |p: &Vec<f64>| -> f64 { self.fun(p).unwrap_or(f64::NAN) };
        let grad = x.to_vec().central_diff(&probe);
        if self.failed() {
            return Err(Error::solver("objective", "objective failed during gradient"));
        }
        Ok(grad)
    }

    fn bounded_gradient(&self, x: &[f64]) -> Result<Vec<f64>> {
        let mut center = x.to_vec();
        self.clamp(&mut center);
        let mut probe = center.clone();
        let mut f_center = None;
        let mut grad = vec![0.0; center.len()];

        for (i, g) in grad.iter_mut().enumerate() {
            let xi = center[i];
            let lo = self.lower_bounds.as_ref().map_or(f64::NEG_INFINITY, |b| b[i]);
            let hi = self.upper_bounds.as_ref().map_or(f64::INFINITY, |b| b[i]);
            let (up, down) = (xi + FD_STEP, xi - FD_STEP);

            *g = match (down >= lo, up <= hi) {
                (true, true) => {
                    probe[i] = up;
                    let f_up = self.fun(&probe)?;
                    probe[i] = down;
                    let f_down = self.fun(&probe)?;
                    (f_up - f_down) / (2.0 * FD_STEP)
                }
                (false, true) => {
                    let f0 = self.center_value(&mut f_center, &center)?;
                    probe[i] = up;
                    (self.fun(&probe)? - f0) / FD_STEP
                }
                (true, false) => {
                    let f0 = self.center_value(&mut f_center, &center)?;
                    probe[i] = down;
                    (f0 - self.fun(&probe)?) / FD_STEP
                }
                // box narrower than one step: the component is pinned
                (false, false) => 0.0,
            };
            probe[i] = xi;
        }
        Ok(grad)
    }

    fn center_value(&self, cached: &mut Option<f64>, center: &[f64]) -> Result<f64> {
        match *cached {
            Some(value) => Ok(value),
            None => {
                let value = self.fun(center)?;
                *cached = Some(value);
                Ok(value)
            }
        }
    }

    /// Value and gradient, for backends that ask for both at once.
    pub fn fun_and_grad(&self, x: &[f64]) -> Result<(f64, Vec<f64>)> {
        let value = self.fun(x)?;
        let grad = self.gradient(x)?;
        Ok((value, grad))
    }

    /// Clamp `x` into the bounds in place.
    #[inline]
    pub fn clamp(&self, x: &mut [f64]) {
        if let Some(lower) = &self.lower_bounds {
            for (v, &lo) in x.iter_mut().zip(lower) {
                *v = v.max(lo);
            }
        }
        if let Some(upper) = &self.upper_bounds {
            for (v, &hi) in x.iter_mut().zip(upper) {
                *v = v.min(hi);
            }
        }
    }

    pub fn converter(&self) -> &Converter {
        &self.converter
    }

    /// Evaluations recorded so far
    pub fn evaluations(&self) -> usize {
        self.history.borrow().len()
    }

    pub fn into_history(self) -> History {
        self.history.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sum_of_squares(p: &Params) -> Result<f64> {
        Ok(p.values().iter().map(|v| v * v).sum())
    }

    #[test]
    fn records_every_call_without_caching() {
        let params = Params::from([("a", 1.0), ("b", 2.0)]);
        let problem = InternalProblem::new(&sum_of_squares, Converter::new(&params), None, None);

        assert_eq!(problem.fun(&[1.0, 2.0]).unwrap(), 5.0);
        assert_eq!(problem.fun(&[1.0, 2.0]).unwrap(), 5.0);
        assert_eq!(problem.fun(&[0.0, 3.0]).unwrap(), 9.0);

        let history = problem.into_history();
        assert_eq!(history.values(), vec![5.0, 5.0, 9.0]);
        assert_eq!(history.records()[2].params, Params::from([("a", 0.0), ("b", 3.0)]));
    }

    #[test]
    fn gradient_matches_analytic_and_logs_probes() {
        let params = Params::from(vec![1.0, -2.0]);
        let problem = InternalProblem::new(&sum_of_squares, Converter::new(&params), None, None);

        let (value, grad) = problem.fun_and_grad(&[1.0, -2.0]).unwrap();

        assert_relative_eq!(value, 5.0);
        assert_relative_eq!(grad[0], 2.0, epsilon = 1e-6);
        assert_relative_eq!(grad[1], -4.0, epsilon = 1e-6);
        // one plain evaluation plus two probes per dimension
        assert_eq!(problem.evaluations(), 5);
    }

    #[test]
    fn objective_error_stops_gradient_probes() {
        let calls = std::cell::Cell::new(0);
        let failing = |_: &Params| -> Result<f64> {
            calls.set(calls.get() + 1);
            Err(Error::Objective("negative volume".into()))
        };
        let params = Params::from(vec![0.0, 0.0, 0.0]);
        let problem = InternalProblem::new(&failing, Converter::new(&params), None, None);

        assert!(problem.gradient(&[0.0, 0.0, 0.0]).is_err());
        assert!(problem.fun(&[1.0, 1.0, 1.0]).is_err());

        assert_eq!(calls.get(), 1);
        assert_eq!(problem.evaluations(), 0);
        let err = problem.take_failure().unwrap();
        assert!(matches!(err, Error::Objective(ref e) if e.to_string() == "negative volume"));
        assert!(problem.take_failure().is_none());
    }

    #[test]
    fn bounded_gradient_never_leaves_the_box() {
        let root = |p: &Params| -> Result<f64> { Ok(p["a"].sqrt() + p["b"].powi(2)) };
        let params = Params::from([("a", 1.0), ("b", 1.0)]);
        let problem = InternalProblem::new(
            &root,
            Converter::new(&params),
            Some(vec![0.0, -5.0]),
            Some(vec![4.0, 1.0]),
        );

        // a on its lower bound, b on its upper bound
        let grad = problem.gradient(&[0.0, 1.0]).unwrap();
        assert!(grad[0].is_finite() && grad[0] > 0.0);
        assert_relative_eq!(grad[1], 2.0, epsilon = 1e-4);

        // interior point falls back to central differences
        let grad = problem.gradient(&[1.0, 0.5]).unwrap();
        assert_relative_eq!(grad[0], 0.5, epsilon = 1e-6);
        assert_relative_eq!(grad[1], 1.0, epsilon = 1e-6);

        for record in &problem.into_history() {
            assert!(!record.value.is_nan());
            assert!(record.params["a"] >= 0.0);
            assert!(record.params["b"] <= 1.0);
        }
    }

    #[test]
    fn pinned_component_has_zero_gradient() {
        let params = Params::from(vec![2.0, 1.0]);
        let problem = InternalProblem::new(
            &sum_of_squares,
            Converter::new(&params),
            Some(vec![2.0, -1.0]),
            Some(vec![2.0, 3.0]),
        );

        let grad = problem.gradient(&[2.0, 1.0]).unwrap();

        assert_eq!(grad[0], 0.0);
        assert_relative_eq!(grad[1], 2.0, epsilon = 1e-6);
        // only the two central probes for `b`
        assert_eq!(problem.evaluations(), 2);
    }

    #[test]
    fn clamps_into_partial_bounds() {
        let params = Params::from(vec![0.0, 0.0]);
        let problem = InternalProblem::new(
            &sum_of_squares,
            Converter::new(&params),
            Some(vec![-1.0, 1.0]),
            None,
        );

        let mut x = [-5.0, 0.0];
        problem.clamp(&mut x);

        assert_eq!(x, [-1.0, 1.0]);
        assert!(problem.has_bounds());
        assert!(problem.upper_bounds().is_none());
    }
}
