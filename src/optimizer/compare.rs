use super::{OptimizeResult, minimize};
use crate::core::{Params, Result};
use indexmap::IndexMap;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Run every method in `methods` on the same problem with default options.
///
/// Each run gets its own converter and history, so results are independent.
/// With the `parallel` feature the runs are spread over the rayon pool.
/// Failures are kept per method instead of aborting the whole comparison;
/// e.g. passing bounds to `"CG"` only fails that entry.
pub fn compare<F>(
    fun: F,
    params: &Params,
    methods: &[&str],
    lower_bounds: Option<&Params>,
    upper_bounds: Option<&Params>,
) -> IndexMap<String, Result<OptimizeResult>>
where
    F: Fn(&Params) -> f64 + Sync,
{
    let run = |method: &&str| {
        let res = minimize(&fun, params, method, lower_bounds, upper_bounds, None);
        if let Err(err) = &res {
            tracing::warn!(method = *method, error = %err, "comparison run failed");
        }
        (method.to_string(), res)
    };

    #[cfg(feature = "parallel")]
    let runs: Vec<_> = methods.par_iter().map(run).collect();
    #[cfg(not(feature = "parallel"))]
    let runs: Vec<_> = methods.iter().map(run).collect();

    runs.into_iter().collect()
}

/// `(n_evals, value)` points per method, ready to be plotted.
///
/// `n_evals` counts from zero. With `monotone` the values are the running
/// minimum instead of the raw evaluations. Points past `max_n_evals` are
/// dropped and failed runs are skipped.
pub fn convergence_series(
    results: &IndexMap<String, Result<OptimizeResult>>,
    max_n_evals: Option<usize>,
    monotone: bool,
) -> IndexMap<String, Vec<(usize, f64)>> {
    results
        .iter()
        .filter_map(|(method, res)| res.as_ref().ok().map(|r| (method, r)))
        .map(|(method, res)| {
            let values = if monotone {
                res.history.monotone()
            } else {
                res.history.values()
            };
            let limit = max_n_evals.map_or(values.len(), |max| max.saturating_add(1));
            let series = values.into_iter().enumerate().take(limit).collect();
            (method.clone(), series)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Error;

    fn sphere(p: &Params) -> f64 {
        p.values().iter().map(|v| v * v).sum()
    }

    #[test]
    fn keeps_method_order_and_isolates_failures() {
        let params = Params::from([("a", 1.0), ("b", -1.0)]);
        let lower = Params::from([("a", -2.0), ("b", -2.0)]);

        let results = compare(sphere, &params, &["Nelder-Mead", "CG", "L-BFGS-B"], Some(&lower), None);

        let methods: Vec<&str> = results.keys().map(String::as_str).collect();
        assert_eq!(methods, ["Nelder-Mead", "CG", "L-BFGS-B"]);
        assert!(matches!(results["CG"], Err(Error::UnsupportedBounds { algorithm: "CG" })));
        for method in ["Nelder-Mead", "L-BFGS-B"] {
            let res = results[method].as_ref().unwrap();
            assert!(res.fun < 1e-6, "{method}: {}", res.fun);
            assert!(res.x.is_named());
        }
    }

    #[test]
    fn series_is_truncated_and_monotone() {
        let params = Params::from(vec![3.0, -2.0]);
        let results = compare(sphere, &params, &["L-BFGS-B", "nope"], None, None);

        let series = convergence_series(&results, Some(4), true);

        assert_eq!(series.len(), 1);
        let points = &series["L-BFGS-B"];
        assert_eq!(points.len(), 5);
        assert_eq!(points[0], (0, 13.0));
        assert!(points.windows(2).all(|w| w[1].1 <= w[0].1));
    }
}
