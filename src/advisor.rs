//! End-to-end recommendation pipeline.
//!
//! Every call is self-contained: the observation store, the surrogate and
//! the acquisition optimizer are built from the supplied history, used and
//! dropped. Nothing is cached between calls, so concurrent calls share no
//! state and the same inputs always produce the same recommendation.

use std::collections::HashMap;

use serde::Serialize;
use serde::ser::SerializeMap;

use crate::acquisition::FittedAcquisition;
use crate::config::AdvisorConfig;
use crate::diagnostics::{self, DiagnosticCurve};
use crate::error::Result;
use crate::observation::ObservationStore;
use crate::space::ParameterSpace;

/// One past experiment: parameter and metric values keyed by name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExperimentRecord {
    /// Parameter and metric values. Keys that are neither are ignored.
    pub values: HashMap<String, f64>,
}

impl ExperimentRecord {
    /// Creates a record from `(name, value)` pairs.
    #[must_use]
    pub fn new<I, K>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, f64)>,
        K: Into<String>,
    {
        Self {
            values: values.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// The recommended next point, in parameter order.
#[derive(Clone, Debug, PartialEq)]
pub struct Recommendation {
    names: Vec<String>,
    values: Vec<f64>,
}

impl Recommendation {
    pub(crate) fn new(space: &ParameterSpace, values: Vec<f64>) -> Self {
        Self {
            names: space.names().map(str::to_owned).collect(),
            values,
        }
    }

    /// Value of a parameter by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.values[i])
    }

    /// Values in parameter order.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// `(name, value)` pairs in parameter order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }
}

impl Serialize for Recommendation {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, &value)?;
        }
        map.end()
    }
}

/// How the supplied records were absorbed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RegistrationSummary {
    /// Records that became observations.
    pub registered: usize,
    /// Records skipped as duplicate points.
    pub duplicates: usize,
    /// Records dropped as malformed.
    pub dropped: usize,
}

/// Result of a recommendation request.
#[derive(Clone, Debug, PartialEq)]
pub struct Advice {
    /// The next point to evaluate.
    pub recommendation: Recommendation,
    /// Acquisition utility at the recommendation.
    pub acquisition_value: f64,
    /// Posterior curves; present only for one-dimensional spaces.
    pub diagnostics: Option<DiagnosticCurve>,
    /// Record bookkeeping.
    pub summary: RegistrationSummary,
}

/// Runs recommendation requests with a fixed configuration.
///
/// # Examples
///
/// ```
/// use nextpoint::{Advisor, AdvisorConfig, ExperimentRecord, Parameter, ParameterSpace};
///
/// let space = ParameterSpace::new(vec![Parameter::new("x", 0.0, 10.0)]).unwrap();
/// let history = vec![
///     ExperimentRecord::new([("x", 2.0), ("y", 1.0)]),
///     ExperimentRecord::new([("x", 8.0), ("y", 5.0)]),
/// ];
///
/// let config = AdvisorConfig::builder().n_warmup(500).build().unwrap();
/// let advice = Advisor::new(config)
///     .recommend(&space, &["y".to_owned()], &history)
///     .unwrap();
///
/// let x = advice.recommendation.get("x").unwrap();
/// assert!((0.0..=10.0).contains(&x));
/// assert_eq!(advice.diagnostics.unwrap().len(), 1000);
/// ```
#[derive(Clone, Debug, Default)]
pub struct Advisor {
    config: AdvisorConfig,
}

impl Advisor {
    /// Creates an advisor with the given settings.
    #[must_use]
    pub fn new(config: AdvisorConfig) -> Self {
        Self { config }
    }

    /// The settings in use.
    #[must_use]
    pub fn config(&self) -> &AdvisorConfig {
        &self.config
    }

    /// Register `experiments` into a fresh store.
    ///
    /// The first entry of `metrics` is the optimized target.
    #[must_use]
    pub fn build_store(
        &self,
        space: &ParameterSpace,
        metrics: &[String],
        experiments: &[ExperimentRecord],
    ) -> ObservationStore {
        let primary = metrics.first().map_or("", String::as_str);
        let mut store = ObservationStore::new(space.clone(), self.config.allow_duplicate_points)
            .with_default_target(self.config.default_target);

        for record in experiments {
            let metric_values: HashMap<String, f64> = metrics
                .iter()
                .filter_map(|m| record.values.get(m).map(|&v| (m.clone(), v)))
                .collect();
            store.register(&record.values, &metric_values, primary);
        }
        store
    }

    /// Recommend the next point to evaluate.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`](crate::Error::InvalidConfig) for
    /// out-of-range settings and
    /// [`Error::OptimizationFailed`](crate::Error::OptimizationFailed) when
    /// the surrogate or the acquisition optimizer fails. Malformed records
    /// never fail the request; they are counted in the summary.
    pub fn recommend(
        &self,
        space: &ParameterSpace,
        metrics: &[String],
        experiments: &[ExperimentRecord],
    ) -> Result<Advice> {
        #[cfg(feature = "tracing")]
        let _span = tracing::info_span!(
            "recommend",
            dim = space.dim(),
            n_experiments = experiments.len()
        )
        .entered();

        self.config.validate()?;

        let store = self.build_store(space, metrics, experiments);
        let summary = RegistrationSummary {
            registered: store.len(),
            duplicates: store.n_duplicates(),
            dropped: store.n_dropped(),
        };
        trace_debug!(
            registered = summary.registered,
            duplicates = summary.duplicates,
            dropped = summary.dropped,
            "experiments registered"
        );

        let model = self.config.gaussian_process().fit(&store)?;
        let kind = self.config.acquisition_kind();
        let incumbent = store.best().map(|o| o.target);
        let acquisition = FittedAcquisition::new(&model, &kind, incumbent);
        let suggestion = self.config.suggester().suggest(&acquisition)?;

        let diagnostics = diagnostics::emit(&model, &store, self.config.grid_resolution);

        trace_info!(point = ?suggestion.point, "recommendation ready");
        Ok(Advice {
            recommendation: Recommendation::new(space, suggestion.point),
            acquisition_value: suggestion.acquisition_value,
            diagnostics,
            summary,
        })
    }

    /// Run [`recommend`](Self::recommend) on tokio's blocking pool.
    ///
    /// Independent requests awaited concurrently run in parallel on worker
    /// threads.
    ///
    /// # Errors
    ///
    /// Same as [`recommend`](Self::recommend), plus
    /// [`Error::TaskError`](crate::Error::TaskError) if the blocking task panics.
    #[cfg(feature = "async")]
    pub async fn recommend_async(
        &self,
        space: ParameterSpace,
        metrics: Vec<String>,
        experiments: Vec<ExperimentRecord>,
    ) -> Result<Advice> {
        let advisor = self.clone();
        tokio::task::spawn_blocking(move || advisor.recommend(&space, &metrics, &experiments))
            .await
            .map_err(|e| crate::Error::TaskError(e.to_string()))?
    }
}
