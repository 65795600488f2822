mod argmin_adapter;
#[cfg(feature = "nlopt")]
mod bobyqa;
mod cg;
mod lbfgsb;
mod nelder_mead;
pub mod traits;

#[cfg(feature = "nlopt")]
pub use bobyqa::Bobyqa;
pub use cg::ConjugateGradient;
pub use lbfgsb::LbfgsB;
pub use nelder_mead::NelderMead;
pub use traits::{AlgoInfo, Algorithm, InternalResult};

use crate::core::{Error, Result};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// User supplied algorithm options, keyed by option name.
pub type Options = Map<String, Value>;

/// Capabilities plus a constructor for one algorithm.
#[derive(Clone, Copy)]
pub struct Registration {
    pub info: AlgoInfo,
    build: fn(Option<Options>) -> Result<Box<dyn Algorithm>>,
}

impl Registration {
    /// Build the algorithm, layering `options` over its defaults.
    pub fn build(&self, options: Option<Options>) -> Result<Box<dyn Algorithm>> {
        (self.build)(options)
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration").field("info", &self.info).finish()
    }
}

/// Deserialize `options` over `T::default()`.
fn parse<T>(algorithm: &'static str, options: Option<Options>) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    match options {
        None => Ok(T::default()),
        Some(map) => serde_json::from_value(Value::Object(map))
            .map_err(|e| Error::option(algorithm, e.to_string())),
    }
}

fn build_lbfgsb(options: Option<Options>) -> Result<Box<dyn Algorithm>> {
    let algo: LbfgsB = parse(LbfgsB::INFO.name, options)?;
    Ok(Box::new(algo.validate()?))
}

fn build_cg(options: Option<Options>) -> Result<Box<dyn Algorithm>> {
    let algo: ConjugateGradient = parse(ConjugateGradient::INFO.name, options)?;
    Ok(Box::new(algo.validate()?))
}

fn build_nelder_mead(options: Option<Options>) -> Result<Box<dyn Algorithm>> {
    let algo: NelderMead = parse(NelderMead::INFO.name, options)?;
    Ok(Box::new(algo.validate()?))
}

#[cfg(feature = "nlopt")]
fn build_bobyqa(options: Option<Options>) -> Result<Box<dyn Algorithm>> {
    let algo: Bobyqa = parse(Bobyqa::INFO.name, options)?;
    Ok(Box::new(algo.validate()?))
}

static REGISTRY: &[Registration] = &[
    Registration {
        info: LbfgsB::INFO,
        build: build_lbfgsb,
    },
    Registration {
        info: ConjugateGradient::INFO,
        build: build_cg,
    },
    Registration {
        info: NelderMead::INFO,
        build: build_nelder_mead,
    },
    #[cfg(feature = "nlopt")]
    Registration {
        info: Bobyqa::INFO,
        build: build_bobyqa,
    },
];

/// Extra names accepted by [`lookup`].
static ALIASES: &[(&str, &str)] = &[("nlopt_bobyqa", "bobyqa")];

/// Find the registration for `name`.
pub fn lookup(name: &str) -> Result<&'static Registration> {
    let canonical = ALIASES
        .iter()
        .find(|(alias, _)| *alias == name)
        .map_or(name, |&(_, target)| target);
    REGISTRY
        .iter()
        .find(|r| r.info.name == canonical)
        .ok_or_else(|| Error::UnknownAlgorithm {
            name: name.to_string(),
        })
}

/// Every registered algorithm, in registration order.
pub fn algorithms() -> impl Iterator<Item = AlgoInfo> {
    REGISTRY.iter().map(|r| r.info)
}

/// Capabilities of `name`, aliases included.
pub fn algorithm_info(name: &str) -> Result<AlgoInfo> {
    lookup(name).map(|r| r.info)
}
