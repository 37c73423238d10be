#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![deny(unreachable_pub)]
#![deny(clippy::correctness)]
#![deny(clippy::suspicious)]
#![deny(clippy::style)]
#![deny(clippy::complexity)]
#![deny(clippy::perf)]
#![deny(clippy::pedantic)]
#![deny(clippy::std_instead_of_core)]

//! Sequential Bayesian optimization for human-paced experiment loops.
//!
//! Given named, bounded continuous parameters and the history of past
//! experiments, `nextpoint` fits a Gaussian-process surrogate to the
//! observed target and recommends the next point by maximizing an
//! acquisition function (Upper Confidence Bound by default). Nothing is
//! cached between calls: every recommendation is recomputed from the full
//! history, and a fixed seed makes it bit-for-bit reproducible.
//!
//! # Getting Started
//!
//! ```
//! use nextpoint::prelude::*;
//!
//! let space = ParameterSpace::new(vec![
//!     Parameter::new("temperature", 20.0, 80.0),
//!     Parameter::new("pressure", 1.0, 5.0),
//! ])
//! .unwrap();
//!
//! let history = vec![
//!     ExperimentRecord::new([("temperature", 30.0), ("pressure", 2.0), ("yield", 0.41)]),
//!     ExperimentRecord::new([("temperature", 60.0), ("pressure", 4.0), ("yield", 0.63)]),
//! ];
//!
//! let config = AdvisorConfig::builder().n_warmup(1_000).build().unwrap();
//! let advice = Advisor::new(config)
//!     .recommend(&space, &["yield".to_owned()], &history)
//!     .unwrap();
//!
//! for (name, value) in advice.recommendation.iter() {
//!     println!("{name} = {value:.3}");
//! }
//! assert!(advice.diagnostics.is_none()); // curves are only produced in 1-D
//! ```
//!
//! # Core Concepts
//!
//! | Type | Role |
//! |------|------|
//! | [`ParameterSpace`] | Ordered, named, bounded continuous domain; unit-cube normalization. |
//! | [`ObservationStore`] | Registered `(point, target)` pairs with the duplicate and fallback-target policies. |
//! | [`GaussianProcess`] / [`SurrogateModel`] | Matérn 5/2 GP fit by multi-restart marginal-likelihood search; posterior mean and std. |
//! | [`AcquisitionFunction`] | Utility over the posterior: [`UpperConfidenceBound`], [`ExpectedImprovement`], [`ProbabilityOfImprovement`]. |
//! | [`Suggester`] | Multi-start acquisition maximization within the bounds. |
//! | [`DiagnosticCurve`] | Posterior mean/std on a dense grid, for one-parameter spaces. |
//! | [`Advisor`] | The whole pipeline, configured by [`AdvisorConfig`]. |
//!
//! The [`request`] module wraps the pipeline in JSON request/response types.
//!
//! # Feature Flags
//!
//! | Flag | What it enables | Default |
//! |------|----------------|---------|
//! | `async` | [`Advisor::recommend_async`], running requests on tokio's blocking pool | off |
//! | `tracing` | Structured log events via [`tracing`](https://docs.rs/tracing) at key pipeline points | off |

/// Emit a `tracing::info!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_info {
    ($($arg:tt)*) => { tracing::info!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_info {
    ($($arg:tt)*) => {};
}

/// Emit a `tracing::debug!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_debug {
    ($($arg:tt)*) => { tracing::debug!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_debug {
    ($($arg:tt)*) => {};
}

pub mod acquisition;
pub mod advisor;
pub mod config;
pub mod diagnostics;
mod error;
pub mod gp;
pub mod kernel;
pub mod local;
pub mod observation;
pub mod request;
mod rng_util;
pub mod space;
pub mod suggest;

pub use acquisition::{
    AcquisitionFunction, AcquisitionKind, ExpectedImprovement, FittedAcquisition,
    ProbabilityOfImprovement, UpperConfidenceBound,
};
pub use advisor::{Advice, Advisor, ExperimentRecord, Recommendation, RegistrationSummary};
pub use config::{AdvisorConfig, AdvisorConfigBuilder};
pub use diagnostics::DiagnosticCurve;
pub use error::{DropReason, Error, Result, SpaceError};
pub use gp::{GaussianProcess, GaussianProcessBuilder, Prediction, SurrogateModel};
pub use kernel::Matern52;
pub use observation::{Observation, ObservationStore, Registration};
pub use space::{Parameter, ParameterSpace};
pub use suggest::{Suggester, SuggesterBuilder, Suggestion};

/// Convenient wildcard import for the most common types.
///
/// ```
/// use nextpoint::prelude::*;
/// ```
pub mod prelude {
    pub use crate::acquisition::{
        AcquisitionFunction, AcquisitionKind, ExpectedImprovement, ProbabilityOfImprovement,
        UpperConfidenceBound,
    };
    pub use crate::advisor::{Advice, Advisor, ExperimentRecord, Recommendation};
    pub use crate::config::AdvisorConfig;
    pub use crate::diagnostics::DiagnosticCurve;
    pub use crate::error::{Error, Result};
    pub use crate::gp::{GaussianProcess, Prediction, SurrogateModel};
    pub use crate::observation::{Observation, ObservationStore, Registration};
    pub use crate::space::{Parameter, ParameterSpace};
    pub use crate::suggest::{Suggester, Suggestion};
}
