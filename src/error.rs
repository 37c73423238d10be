/// Reasons a parameter space is rejected before any fitting happens.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SpaceError {
    /// Returned when the space has no parameters.
    #[error("parameter space must contain at least one parameter")]
    Empty,

    /// Returned when a parameter has an empty name.
    #[error("parameter at position {index} has an empty name")]
    EmptyName {
        /// Position of the offending parameter.
        index: usize,
    },

    /// Returned when two parameters share a name.
    #[error("duplicate parameter name '{name}'")]
    DuplicateName {
        /// The repeated name.
        name: String,
    },

    /// Returned when the lower bound is not strictly below the upper bound.
    #[error("invalid bounds for '{name}': lower ({lower}) must be less than upper ({upper})")]
    InvalidBounds {
        /// The parameter name.
        name: String,
        /// The lower bound value.
        lower: f64,
        /// The upper bound value.
        upper: f64,
    },

    /// Returned when a bound is NaN or infinite.
    #[error("non-finite bound for '{name}'")]
    NonFiniteBound {
        /// The parameter name.
        name: String,
    },

    /// Returned when `upper - lower` overflows to infinity.
    #[error("bounds of '{name}' are too far apart: [{lower}, {upper}]")]
    WidthOverflow {
        /// The parameter name.
        name: String,
        /// The lower bound value.
        lower: f64,
        /// The upper bound value.
        upper: f64,
    },
}

/// Reasons a single experiment record is not registered.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DropReason {
    /// A parameter of the space has no value in the record.
    #[error("missing value for parameter '{name}'")]
    MissingCoordinate {
        /// The parameter name.
        name: String,
    },

    /// A parameter or metric value is NaN or infinite.
    #[error("non-finite value for '{name}'")]
    NonFiniteValue {
        /// The offending key.
        name: String,
    },

    /// The primary metric is absent and no fallback target is configured.
    #[error("missing value for primary metric '{metric}'")]
    MissingTarget {
        /// The primary metric name.
        metric: String,
    },
}

/// Errors surfaced to callers of the recommendation pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when the parameter space is malformed.
    #[error("invalid space: {0}")]
    InvalidSpace(#[from] SpaceError),

    /// Returned when an experiment record cannot be turned into an observation.
    ///
    /// The advisor absorbs this per record; it only surfaces from the
    /// strict [`ObservationStore::try_register`](crate::ObservationStore::try_register).
    #[error("malformed observation: {0}")]
    MalformedObservation(#[from] DropReason),

    /// Returned when the covariance matrix could not be factorized.
    #[error("covariance matrix is not positive definite (jitter {jitter:e})")]
    NumericalInstability {
        /// The diagonal jitter in use when the factorization failed.
        jitter: f64,
    },

    /// Returned when no recommendation could be produced.
    #[error("optimization failed: {cause}")]
    OptimizationFailed {
        /// Description of the underlying failure.
        cause: String,
    },

    /// Returned when a configuration value is out of range.
    #[error("invalid configuration for `{field}`: {reason}")]
    InvalidConfig {
        /// The configuration field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// Returned when a point does not have one coordinate per dimension.
    #[error("dimension mismatch: expected {expected} coordinates, got {got}")]
    DimensionMismatch {
        /// The dimension of the space.
        expected: usize,
        /// The length of the supplied point.
        got: usize,
    },

    /// Returned when an async task fails.
    #[cfg(feature = "async")]
    #[error("async task error: {0}")]
    TaskError(String),
}

impl Error {
    /// Stable name of the error kind, suitable for a failure response.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidSpace(_) => "InvalidSpace",
            Self::MalformedObservation(_) => "MalformedObservation",
            Self::NumericalInstability { .. } => "NumericalInstability",
            Self::OptimizationFailed { .. } => "OptimizationFailed",
            Self::InvalidConfig { .. } => "InvalidConfig",
            Self::DimensionMismatch { .. } => "DimensionMismatch",
            #[cfg(feature = "async")]
            Self::TaskError(_) => "TaskError",
        }
    }

    /// Whether the error was caused by caller input rather than the optimizer.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidSpace(_)
                | Self::MalformedObservation(_)
                | Self::InvalidConfig { .. }
                | Self::DimensionMismatch { .. }
        )
    }

    pub(crate) fn optimization_failed(cause: impl Into<String>) -> Self {
        Self::OptimizationFailed {
            cause: cause.into(),
        }
    }
}

pub type Result<T> = core::result::Result<T, Error>;
