//! Bounded continuous search domain.
//!
//! A [`ParameterSpace`] is an ordered list of named [`Parameter`]s, each a
//! closed interval `[lower, upper]`. The order of parameters defines the
//! coordinate order of every point handled by the crate.
//!
//! Internally the surrogate and the acquisition optimizer work in the unit
//! hypercube `[0, 1]^d`; [`ParameterSpace::normalize`] and
//! [`ParameterSpace::denormalize`] convert between the two conventions.
//! Denormalization clamps into the declared bounds, so a recommendation
//! never leaves `[lower, upper]`, boundaries included.

use std::collections::HashMap;

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::error::{DropReason, SpaceError};

/// A single named continuous parameter with closed bounds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    /// Unique name within the space.
    pub name: String,
    /// Lower bound (inclusive).
    pub lower: f64,
    /// Upper bound (inclusive).
    pub upper: f64,
}

impl Parameter {
    /// Creates a new parameter. Bounds are validated when the space is built.
    #[must_use]
    pub fn new(name: impl Into<String>, lower: f64, upper: f64) -> Self {
        Self {
            name: name.into(),
            lower,
            upper,
        }
    }

    /// Width of the interval.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

/// Ordered, validated set of parameters.
///
/// # Examples
///
/// ```
/// use nextpoint::{Parameter, ParameterSpace};
///
/// let space = ParameterSpace::new(vec![
///     Parameter::new("temperature", 20.0, 80.0),
///     Parameter::new("pressure", 1.0, 5.0),
/// ])
/// .unwrap();
///
/// assert_eq!(space.dim(), 2);
/// assert_eq!(space.index_of("pressure"), Some(1));
/// assert_eq!(space.normalize(&[50.0, 3.0]), vec![0.5, 0.5]);
/// ```
#[derive(Clone, Debug)]
pub struct ParameterSpace {
    parameters: Vec<Parameter>,
    index: HashMap<String, usize>,
}

impl ParameterSpace {
    /// Builds a space from an ordered list of parameters.
    ///
    /// # Errors
    ///
    /// Returns [`SpaceError`] if the list is empty, a name is empty or
    /// repeated, a bound is not finite, `lower >= upper`, or the width
    /// `upper - lower` overflows.
    pub fn new(parameters: Vec<Parameter>) -> Result<Self, SpaceError> {
        if parameters.is_empty() {
            return Err(SpaceError::Empty);
        }

        let mut index = HashMap::with_capacity(parameters.len());
        for (i, p) in parameters.iter().enumerate() {
            if p.name.is_empty() {
                return Err(SpaceError::EmptyName { index: i });
            }
            if !p.lower.is_finite() || !p.upper.is_finite() {
                return Err(SpaceError::NonFiniteBound {
                    name: p.name.clone(),
                });
            }
            if p.lower >= p.upper {
                return Err(SpaceError::InvalidBounds {
                    name: p.name.clone(),
                    lower: p.lower,
                    upper: p.upper,
                });
            }
            if !(p.upper - p.lower).is_finite() {
                return Err(SpaceError::WidthOverflow {
                    name: p.name.clone(),
                    lower: p.lower,
                    upper: p.upper,
                });
            }
            if index.insert(p.name.clone(), i).is_some() {
                return Err(SpaceError::DuplicateName {
                    name: p.name.clone(),
                });
            }
        }

        Ok(Self { parameters, index })
    }

    /// Number of dimensions.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.parameters.len()
    }

    /// The parameters in coordinate order.
    #[must_use]
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Parameter names in coordinate order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.parameters.iter().map(|p| p.name.as_str())
    }

    /// Coordinate index of a parameter name.
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// `(lower, upper)` per dimension.
    #[must_use]
    pub fn bounds(&self) -> Vec<(f64, f64)> {
        self.parameters.iter().map(|p| (p.lower, p.upper)).collect()
    }

    /// Bounds as a `[dim, 2]` matrix; column 0 holds lower, column 1 upper.
    #[must_use]
    pub fn bounds_matrix(&self) -> DMatrix<f64> {
        DMatrix::from_fn(self.dim(), 2, |i, j| {
            let p = &self.parameters[i];
            if j == 0 { p.lower } else { p.upper }
        })
    }

    /// Whether every coordinate lies inside its closed interval.
    #[must_use]
    pub fn contains(&self, point: &[f64]) -> bool {
        point.len() == self.dim()
            && self
                .parameters
                .iter()
                .zip(point)
                .all(|(p, &v)| v >= p.lower && v <= p.upper)
    }

    /// Map raw coordinates into unit-cube coordinates.
    ///
    /// Points outside the bounds map outside `[0, 1]`; no clamping happens
    /// here so that registered observations keep their true location.
    #[must_use]
    pub fn normalize(&self, point: &[f64]) -> Vec<f64> {
        self.parameters
            .iter()
            .zip(point)
            .map(|(p, &v)| (v - p.lower) / p.width())
            .collect()
    }

    /// Map unit-cube coordinates back to raw units, clamped into bounds.
    #[must_use]
    pub fn denormalize(&self, unit: &[f64]) -> Vec<f64> {
        self.parameters
            .iter()
            .zip(unit)
            .map(|(p, &u)| {
                if u <= 0.0 {
                    p.lower
                } else if u >= 1.0 {
                    p.upper
                } else {
                    (p.lower + u * p.width()).clamp(p.lower, p.upper)
                }
            })
            .collect()
    }

    /// Assemble a point from a name→value mapping.
    ///
    /// Keys that are not parameters of the space are ignored. Every
    /// parameter must be present with a finite value; nothing is imputed.
    ///
    /// # Errors
    ///
    /// Returns the [`DropReason`] for the first missing or non-finite
    /// coordinate in parameter order.
    pub fn point_from_values(&self, values: &HashMap<String, f64>) -> Result<Vec<f64>, DropReason> {
        self.parameters
            .iter()
            .map(|p| match values.get(&p.name) {
                None => Err(DropReason::MissingCoordinate {
                    name: p.name.clone(),
                }),
                Some(v) if !v.is_finite() => Err(DropReason::NonFiniteValue {
                    name: p.name.clone(),
                }),
                Some(&v) => Ok(v),
            })
            .collect()
    }
}
