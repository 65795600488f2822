/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can make a `minimize` call fail.
///
/// All variants except [`Error::SolverFailure`] and [`Error::Objective`] are
/// raised before the objective is evaluated for the first time.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unknown algorithm '{name}'")]
    UnknownAlgorithm { name: String },

    #[error("invalid option for {algorithm}: {message}")]
    InvalidOption {
        algorithm: &'static str,
        message: String,
    },

    #[error("{algorithm} requires both lower and upper bounds")]
    MissingBounds { algorithm: &'static str },

    #[error("{algorithm} does not support bounds")]
    UnsupportedBounds { algorithm: &'static str },

    #[error("parameter keys do not match: {message}")]
    KeyMismatch { message: String },

    #[error("lower bound {lower} exceeds upper bound {upper} at index {index}")]
    InvalidBounds { index: usize, lower: f64, upper: f64 },

    #[error("{algorithm} failed: {message}")]
    SolverFailure {
        algorithm: &'static str,
        message: String,
    },

    /// Error raised by the user objective, passed through untouched.
    #[error(transparent)]
    Objective(Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    pub(crate) fn solver(algorithm: &'static str, message: impl Into<String>) -> Self {
        Error::SolverFailure {
            algorithm,
            message: message.into(),
        }
    }

    pub(crate) fn option(algorithm: &'static str, message: impl Into<String>) -> Self {
        Error::InvalidOption {
            algorithm,
            message: message.into(),
        }
    }

    /// Convert an error coming back out of argmin.
    ///
    /// Crate errors raised inside a cost or gradient call travel through
    /// argmin wrapped in its `anyhow`-style error and are unwrapped here.
    pub(crate) fn from_argmin(algorithm: &'static str, err: argmin::core::Error) -> Self {
        match err.downcast::<Error>() {
            Ok(inner) => inner,
            Err(other) => Error::solver(algorithm, other.to_string()),
        }
    }
}
