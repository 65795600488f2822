use super::error::{Error, Result};
use super::types::Params;

/// Maps between [`Params`] and the flat vector a solver works on.
///
/// A converter is bound to the parameters it was built from. Everything it
/// flattens must have the same shape and keys, and everything it unflattens
/// comes back in that shape.
#[derive(Clone, Debug)]
pub struct Converter {
    original: Params,
}

impl Converter {
    pub fn new(original: &Params) -> Self {
        Self {
            original: original.clone(),
        }
    }

    /// Number of entries in the flat vector.
    pub fn len(&self) -> usize {
        self.original.len()
    }

    pub fn is_empty(&self) -> bool {
        self.original.is_empty()
    }

    /// Lay `params` out in the original's order.
    ///
    /// Fails with [`Error::KeyMismatch`] when `params` does not have exactly
    /// the original's keys (or length, for flat parameters).
    pub fn flatten(&self, params: &Params) -> Result<Vec<f64>> {
        match (&self.original, params) {
            (Params::Named(original), Params::Named(map)) => {
                if let Some(extra) = map.keys().find(|k| !original.contains_key(*k)) {
                    return Err(Error::KeyMismatch {
                        message: format!("unexpected key '{extra}'"),
                    });
                }
                original
                    .keys()
                    .map(|key| {
                        map.get(key).copied().ok_or_else(|| Error::KeyMismatch {
                            message: format!("missing key '{key}'"),
                        })
                    })
                    .collect()
            }
            (Params::Flat(original), Params::Flat(values)) => {
                if original.len() != values.len() {
                    return Err(Error::KeyMismatch {
                        message: format!(
                            "expected {} values, found {}",
                            original.len(),
                            values.len()
                        ),
                    });
                }
                Ok(values.clone())
            }
            (Params::Named(_), Params::Flat(_)) => Err(Error::KeyMismatch {
                message: "expected named parameters, found a flat vector".into(),
            }),
            (Params::Flat(_), Params::Named(_)) => Err(Error::KeyMismatch {
                message: "expected a flat vector, found named parameters".into(),
            }),
        }
    }

    /// Rebuild parameters shaped like the original from a flat vector.
    pub fn unflatten(&self, x: &[f64]) -> Params {
        match &self.original {
            Params::Named(original) => Params::Named(
                original
                    .keys()
                    .zip(x.iter())
                    .map(|(k, &v)| (k.clone(), v))
                    .collect(),
            ),
            Params::Flat(_) => Params::Flat(x.to_vec()),
        }
    }
}
