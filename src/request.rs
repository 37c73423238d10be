//! JSON request/response boundary.
//!
//! A transport layer deserializes an [`ExperimentRequest`], hands it to
//! [`process_experiments`] and serializes the returned [`Response`]. Record
//! values arrive loosely typed: numbers are taken as-is, numeric strings are
//! parsed, and anything else is left out of the record (so a parameter with
//! such a value makes the record drop as missing a coordinate).
//!
//! ```
//! use nextpoint::AdvisorConfig;
//! use nextpoint::request::{ExperimentRequest, process_experiments};
//!
//! let request: ExperimentRequest = serde_json::from_str(r#"{
//!     "parameters": [{ "name": "temp", "min": 20, "max": 80 }],
//!     "metrics": [{ "name": "yield" }],
//!     "experiments": [
//!         { "id": 1, "values": { "temp": 30, "yield": "0.42" } },
//!         { "id": 2, "values": { "temp": "65.5", "yield": 0.61 } },
//!         { "id": 3, "values": {} }
//!     ]
//! }"#).unwrap();
//!
//! let config = AdvisorConfig::builder().n_warmup(500).build().unwrap();
//! let response = process_experiments(&request, &config);
//! assert!(response.is_success());
//!
//! let json = serde_json::to_value(&response).unwrap();
//! let temp = json["next_values"]["temp"].as_f64().unwrap();
//! assert!((20.0..=80.0).contains(&temp));
//! assert_eq!(json["plot_data"]["x"].as_array().unwrap().len(), 1000);
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::advisor::{Advice, Advisor, ExperimentRecord, Recommendation};
use crate::config::AdvisorConfig;
use crate::diagnostics::DiagnosticCurve;
use crate::error::{Error, Result};
use crate::space::{Parameter, ParameterSpace};

/// Message attached to a successful response.
pub const SUCCESS_MESSAGE: &str = "Next parameter values suggested";
/// Message attached to a failed response.
pub const FAILURE_MESSAGE: &str = "Error during optimization";

/// A bounded parameter as sent on the wire.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParameterEntry {
    /// Parameter name.
    pub name: String,
    /// Lower bound.
    pub min: f64,
    /// Upper bound.
    pub max: f64,
}

impl From<&ParameterEntry> for Parameter {
    fn from(entry: &ParameterEntry) -> Self {
        Parameter::new(entry.name.clone(), entry.min, entry.max)
    }
}

/// A metric name as sent on the wire.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricEntry {
    /// Metric name.
    pub name: String,
}

/// One past experiment as sent on the wire.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExperimentRow {
    /// Caller-side identifier; not used by the optimizer.
    #[serde(default)]
    pub id: i64,
    /// Loosely typed parameter and metric values.
    #[serde(default)]
    pub values: Map<String, Value>,
}

impl ExperimentRow {
    /// The numeric view of this row.
    #[must_use]
    pub fn to_record(&self) -> ExperimentRecord {
        let values: HashMap<String, f64> = self
            .values
            .iter()
            .filter_map(|(k, v)| coerce(v).map(|x| (k.clone(), x)))
            .collect();
        ExperimentRecord { values }
    }
}

/// A complete recommendation request.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperimentRequest {
    /// Parameters in coordinate order.
    pub parameters: Vec<ParameterEntry>,
    /// Metrics; the first one is optimized.
    #[serde(default)]
    pub metrics: Vec<MetricEntry>,
    /// Experiment history.
    #[serde(default)]
    pub experiments: Vec<ExperimentRow>,
}

impl ExperimentRequest {
    /// Build the parameter space.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSpace`] for empty or duplicate names and bad bounds.
    pub fn space(&self) -> Result<ParameterSpace> {
        Ok(ParameterSpace::new(
            self.parameters.iter().map(Parameter::from).collect(),
        )?)
    }

    /// Metric names in request order.
    #[must_use]
    pub fn metric_names(&self) -> Vec<String> {
        self.metrics.iter().map(|m| m.name.clone()).collect()
    }

    /// Numeric records, skipping rows with no values at all.
    #[must_use]
    pub fn records(&self) -> Vec<ExperimentRecord> {
        self.experiments
            .iter()
            .filter(|row| !row.values.is_empty())
            .map(ExperimentRow::to_record)
            .collect()
    }

    /// Run the recommendation pipeline on this request.
    ///
    /// # Errors
    ///
    /// See [`Advisor::recommend`]; an invalid space fails before any fitting.
    pub fn advise(&self, config: &AdvisorConfig) -> Result<Advice> {
        let space = self.space()?;
        Advisor::new(config.clone()).recommend(&space, &self.metric_names(), &self.records())
    }
}

/// Reply to an [`ExperimentRequest`].
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Response {
    /// A recommendation was produced.
    Success {
        /// Always [`SUCCESS_MESSAGE`].
        message: String,
        /// Recommended value per parameter, in parameter order.
        next_values: Recommendation,
        /// Posterior curves; `{}` unless the space is one-dimensional.
        #[serde(serialize_with = "serialize_plot_data")]
        plot_data: Option<DiagnosticCurve>,
    },
    /// The request failed.
    Failure {
        /// Always [`FAILURE_MESSAGE`].
        message: String,
        /// Error kind and description.
        error: String,
    },
}

impl Response {
    /// Whether a recommendation was produced.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    fn success(advice: Advice) -> Self {
        Self::Success {
            message: SUCCESS_MESSAGE.to_owned(),
            next_values: advice.recommendation,
            plot_data: advice.diagnostics,
        }
    }

    fn failure(error: &Error) -> Self {
        Self::Failure {
            message: FAILURE_MESSAGE.to_owned(),
            error: format!("{}: {error}", error.kind()),
        }
    }
}

/// Answer `request` with `config`, turning failures into a [`Response::Failure`].
#[must_use]
pub fn process_experiments(request: &ExperimentRequest, config: &AdvisorConfig) -> Response {
    match request.advise(config) {
        Ok(advice) => Response::success(advice),
        Err(e) => {
            trace_info!(kind = e.kind(), error = %e, "request failed");
            Response::failure(&e)
        }
    }
}

/// Numbers pass through; strings holding a number are parsed.
fn coerce(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[allow(clippy::ref_option)]
fn serialize_plot_data<S: Serializer>(
    curve: &Option<DiagnosticCurve>,
    serializer: S,
) -> core::result::Result<S::Ok, S::Error> {
    match curve {
        Some(curve) => curve.serialize(serializer),
        None => Map::new().serialize(serializer),
    }
}
