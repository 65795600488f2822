use crate::core::Params;
use serde::Serialize;

/// One objective evaluation: the value returned and the parameters it saw.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationRecord {
    pub value: f64,
    pub params: Params,
}

/// Every evaluation of the objective during one `minimize` call, in the
/// order the solver asked for them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct History {
    records: Vec<EvaluationRecord>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an evaluation
    pub fn add(&mut self, value: f64, params: Params) {
        self.records.push(EvaluationRecord { value, params });
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[EvaluationRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EvaluationRecord> {
        self.records.iter()
    }

    /// Objective values in evaluation order.
    pub fn values(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.value).collect()
    }

    /// Running minimum of the objective values.
    ///
    /// Leading NaN values stay NaN until the first comparable value; after
    /// that a NaN never replaces the best so far.
    pub fn monotone(&self) -> Vec<f64> {
        let mut best = f64::NAN;
        self.records
            .iter()
            .map(|r| {
                if r.value < best || best.is_nan() {
                    best = r.value;
                }
                best
            })
            .collect()
    }

    /// Lowest recorded evaluation, ignoring NaN values.
    pub fn best(&self) -> Option<&EvaluationRecord> {
        self.records
            .iter()
            .filter(|r| !r.value.is_nan())
            .min_by(|a, b| a.value.total_cmp(&b.value))
    }
}

impl<'a> IntoIterator for &'a History {
    type Item = &'a EvaluationRecord;
    type IntoIter = std::slice::Iter<'a, EvaluationRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history(values: &[f64]) -> History {
        let mut history = History::new();
        for (i, &v) in values.iter().enumerate() {
            history.add(v, Params::from(vec![i as f64]));
        }
        history
    }

    #[test]
    fn keeps_evaluation_order_and_duplicates() {
        let history = history(&[3.0, 1.0, 1.0, 2.0]);

        assert_eq!(history.len(), 4);
        assert_eq!(history.values(), vec![3.0, 1.0, 1.0, 2.0]);
        assert_eq!(history.records()[3].params, Params::from([3.0]));
    }

    #[test]
    fn monotone_is_running_minimum() {
        let history = history(&[3.0, 4.0, 1.0, f64::NAN, 2.0, 0.5]);

        assert_eq!(history.monotone(), vec![3.0, 3.0, 1.0, 1.0, 1.0, 0.5]);
    }

    #[test]
    fn monotone_keeps_leading_nan() {
        let history = history(&[f64::NAN, f64::NAN, 3.0, f64::NAN, 1.0]);

        let running = history.monotone();

        assert!(running[0].is_nan() && running[1].is_nan());
        assert_eq!(running[2..], [3.0, 3.0, 1.0]);
    }

    #[test]
    fn best_skips_nan() {
        let history = history(&[f64::NAN, 2.0, -1.0, 5.0]);

        let best = history.best().unwrap();
        assert_eq!(best.value, -1.0);
        assert_eq!(best.params, Params::from([2.0]));
        assert!(History::new().best().is_none());
    }
}
