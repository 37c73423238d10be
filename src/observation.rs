//! Append-only store of `(point, target)` observations.
//!
//! Records arrive as name→value mappings. A record becomes an
//! [`Observation`] only if every parameter of the space has a finite value;
//! otherwise it is dropped and counted, never imputed. The target is the
//! primary metric when present, else the configured fallback target.
//!
//! # Fallback target
//!
//! By default a record without its primary metric is registered with target
//! `0.0`. This keeps the surrogate computable when callers submit partially
//! filled rows, but the value carries no statistical meaning. Set
//! [`ObservationStore::with_default_target`] to `None` to drop such records.
//!
//! # Duplicates
//!
//! With `allow_duplicates = true` repeated points are kept and all of them
//! enter the fit, tightening the posterior at that location. With `false`,
//! a point within [`DUPLICATE_TOLERANCE`] of a registered point (on every
//! coordinate) is skipped silently.

use std::collections::HashMap;

use crate::error::{DropReason, Error, Result};
use crate::space::ParameterSpace;

/// Per-coordinate tolerance under which two points are considered identical.
pub const DUPLICATE_TOLERANCE: f64 = 1e-9;

/// Default target used when a record has no value for the primary metric.
pub const DEFAULT_FALLBACK_TARGET: f64 = 0.0;

/// A registered experiment result.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct Observation {
    /// Coordinates in parameter order, raw units.
    pub point: Vec<f64>,
    /// Scalar objective value (higher is better).
    pub target: f64,
}

/// Outcome of registering one record.
#[derive(Clone, Debug, PartialEq)]
pub enum Registration {
    /// Registered at the given index.
    Added(usize),
    /// Skipped because it repeats the observation at the given index.
    Duplicate {
        /// Index of the already-registered observation.
        of: usize,
    },
    /// Not registered.
    Dropped(DropReason),
}

impl Registration {
    /// Whether the record became an observation.
    #[must_use]
    pub fn is_added(&self) -> bool {
        matches!(self, Self::Added(_))
    }
}

/// Observations accumulated for a single recommendation request.
#[derive(Clone, Debug)]
pub struct ObservationStore {
    space: ParameterSpace,
    allow_duplicates: bool,
    default_target: Option<f64>,
    observations: Vec<Observation>,
    n_duplicates: usize,
    n_dropped: usize,
}

impl ObservationStore {
    /// Creates an empty store over `space`.
    #[must_use]
    pub fn new(space: ParameterSpace, allow_duplicates: bool) -> Self {
        Self {
            space,
            allow_duplicates,
            default_target: Some(DEFAULT_FALLBACK_TARGET),
            observations: Vec::new(),
            n_duplicates: 0,
            n_dropped: 0,
        }
    }

    /// Sets the fallback target for records without the primary metric.
    ///
    /// `None` drops those records instead.
    #[must_use]
    pub fn with_default_target(mut self, target: Option<f64>) -> Self {
        self.default_target = target;
        self
    }

    /// Register a record, absorbing per-record problems.
    ///
    /// `raw_values` may contain keys outside the space; they are ignored.
    /// Problems are reported through [`Registration::Dropped`] and counted.
    pub fn register(
        &mut self,
        raw_values: &HashMap<String, f64>,
        metric_values: &HashMap<String, f64>,
        primary_metric: &str,
    ) -> Registration {
        match self.resolve(raw_values, metric_values, primary_metric) {
            Ok((point, target)) => self.push(point, target),
            Err(reason) => {
                trace_debug!(%reason, "record dropped");
                self.n_dropped += 1;
                Registration::Dropped(reason)
            }
        }
    }

    /// Register a record, surfacing malformed records as errors.
    ///
    /// Returns `Ok(None)` when the point is a skipped duplicate.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedObservation`] if a coordinate is missing or
    /// non-finite, or the primary metric is missing with no fallback target.
    pub fn try_register(
        &mut self,
        raw_values: &HashMap<String, f64>,
        metric_values: &HashMap<String, f64>,
        primary_metric: &str,
    ) -> Result<Option<usize>> {
        let (point, target) = self.resolve(raw_values, metric_values, primary_metric)?;
        Ok(match self.push(point, target) {
            Registration::Added(index) => Some(index),
            _ => None,
        })
    }

    /// Register a point given directly in coordinate order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if `point` does not have one
    /// coordinate per parameter.
    pub fn register_point(&mut self, point: Vec<f64>, target: f64) -> Result<Registration> {
        if point.len() != self.space.dim() {
            return Err(Error::DimensionMismatch {
                expected: self.space.dim(),
                got: point.len(),
            });
        }
        let non_finite = point
            .iter()
            .position(|v| !v.is_finite())
            .map(|i| self.space.parameters()[i].name.clone())
            .or_else(|| (!target.is_finite()).then(|| "target".to_owned()));
        if let Some(name) = non_finite {
            self.n_dropped += 1;
            return Ok(Registration::Dropped(DropReason::NonFiniteValue { name }));
        }
        Ok(self.push(point, target))
    }

    fn resolve(
        &self,
        raw_values: &HashMap<String, f64>,
        metric_values: &HashMap<String, f64>,
        primary_metric: &str,
    ) -> core::result::Result<(Vec<f64>, f64), DropReason> {
        let point = self.space.point_from_values(raw_values)?;
        let target = match (metric_values.get(primary_metric), self.default_target) {
            (Some(v), _) if !v.is_finite() => {
                return Err(DropReason::NonFiniteValue {
                    name: primary_metric.to_owned(),
                });
            }
            (Some(&v), _) => v,
            (None, Some(fallback)) => {
                trace_debug!(
                    metric = primary_metric,
                    fallback,
                    "primary metric missing, using fallback target"
                );
                fallback
            }
            (None, None) => {
                return Err(DropReason::MissingTarget {
                    metric: primary_metric.to_owned(),
                });
            }
        };
        Ok((point, target))
    }

    fn push(&mut self, point: Vec<f64>, target: f64) -> Registration {
        if !self.allow_duplicates
            && let Some(of) = self.find_duplicate(&point)
        {
            trace_debug!(of, "duplicate point skipped");
            self.n_duplicates += 1;
            return Registration::Duplicate { of };
        }
        self.observations.push(Observation { point, target });
        Registration::Added(self.observations.len() - 1)
    }

    fn find_duplicate(&self, point: &[f64]) -> Option<usize> {
        self.observations.iter().position(|o| {
            o.point
                .iter()
                .zip(point)
                .all(|(a, b)| (a - b).abs() <= DUPLICATE_TOLERANCE)
        })
    }

    /// The space observations are expressed in.
    #[must_use]
    pub fn space(&self) -> &ParameterSpace {
        &self.space
    }

    /// Whether repeated points are kept.
    #[must_use]
    pub fn allows_duplicates(&self) -> bool {
        self.allow_duplicates
    }

    /// Number of registered observations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    /// Whether no observation is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Registered observations in insertion order.
    #[must_use]
    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// Targets in insertion order.
    #[must_use]
    pub fn targets(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.target).collect()
    }

    /// Points mapped to unit-cube coordinates, in insertion order.
    #[must_use]
    pub fn normalized_points(&self) -> Vec<Vec<f64>> {
        self.observations
            .iter()
            .map(|o| self.space.normalize(&o.point))
            .collect()
    }

    /// The observation with the highest target; earliest wins ties.
    #[must_use]
    pub fn best(&self) -> Option<&Observation> {
        self.observations.iter().reduce(|best, o| {
            if o.target > best.target { o } else { best }
        })
    }

    /// Number of records skipped as duplicates.
    #[must_use]
    pub fn n_duplicates(&self) -> usize {
        self.n_duplicates
    }

    /// Number of records dropped as malformed.
    #[must_use]
    pub fn n_dropped(&self) -> usize {
        self.n_dropped
    }
}
