use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::ops::Index;

// ===== PARAMETERS =====

/// Parameters handed to a user objective.
///
/// `Named` keeps insertion order, which is also the order used when the
/// values are laid out in the flat vector a solver works on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Params {
    Named(IndexMap<String, f64>),
    Flat(Vec<f64>),
}

impl Params {
    /// Number of scalar values.
    pub fn len(&self) -> usize {
        match self {
            Self::Named(map) => map.len(),
            Self::Flat(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_named(&self) -> bool {
        matches!(self, Self::Named(_))
    }

    /// Look up a named value. Always `None` for flat parameters.
    pub fn get(&self, key: &str) -> Option<f64> {
        match self {
            Self::Named(map) => map.get(key).copied(),
            Self::Flat(_) => None,
        }
    }

    /// Keys in flattening order, `None` for flat parameters.
    pub fn keys(&self) -> Option<impl Iterator<Item = &str>> {
        match self {
            Self::Named(map) => Some(map.keys().map(String::as_str)),
            Self::Flat(_) => None,
        }
    }

    /// Values in flattening order.
    pub fn values(&self) -> Vec<f64> {
        match self {
            Self::Named(map) => map.values().copied().collect(),
            Self::Flat(values) => values.clone(),
        }
    }

    /// Borrow the underlying vector of flat parameters.
    pub fn as_slice(&self) -> Option<&[f64]> {
        match self {
            Self::Named(_) => None,
            Self::Flat(values) => Some(values),
        }
    }
}

impl From<Vec<f64>> for Params {
    fn from(values: Vec<f64>) -> Self {
        Self::Flat(values)
    }
}

impl From<&[f64]> for Params {
    fn from(values: &[f64]) -> Self {
        Self::Flat(values.to_vec())
    }
}

impl<const N: usize> From<[f64; N]> for Params {
    fn from(values: [f64; N]) -> Self {
        Self::Flat(values.to_vec())
    }
}

impl From<IndexMap<String, f64>> for Params {
    fn from(map: IndexMap<String, f64>) -> Self {
        Self::Named(map)
    }
}

impl<K: Into<String>, const N: usize> From<[(K, f64); N]> for Params {
    fn from(pairs: [(K, f64); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self::Named(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl Index<&str> for Params {
    type Output = f64;

    /// Panics if the key is missing or the parameters are flat.
    fn index(&self, key: &str) -> &f64 {
        match self {
            Self::Named(map) => &map[key],
            Self::Flat(_) => panic!("flat parameters have no key '{key}'"),
        }
    }
}

impl Index<usize> for Params {
    type Output = f64;

    /// Positional access in flattening order.
    fn index(&self, index: usize) -> &f64 {
        match self {
            Self::Named(map) => &map[index],
            Self::Flat(values) => &values[index],
        }
    }
}
