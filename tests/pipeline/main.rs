#![allow(clippy::cast_precision_loss)]

#[path = "../../benches/test_functions.rs"]
#[allow(dead_code)]
mod test_functions;

mod recommend;
mod sequential;
mod suggest;
mod surrogate;

use nextpoint::{AdvisorConfig, ExperimentRecord, ObservationStore, Parameter, ParameterSpace};

/// Default settings with a smaller random warm-up, to keep the suite fast.
pub(crate) fn quick_config() -> AdvisorConfig {
    AdvisorConfig::builder().n_warmup(500).build().unwrap()
}

pub(crate) fn space_1d() -> ParameterSpace {
    ParameterSpace::new(vec![Parameter::new("x", 0.0, 10.0)]).unwrap()
}

/// `{x: 2, y: 1.0}` and `{x: 8, y: 5.0}` over `x ∈ [0, 10]`.
pub(crate) fn two_point_history() -> Vec<ExperimentRecord> {
    vec![
        ExperimentRecord::new([("x", 2.0), ("y", 1.0)]),
        ExperimentRecord::new([("x", 8.0), ("y", 5.0)]),
    ]
}

pub(crate) fn store_from(space: ParameterSpace, points: &[(Vec<f64>, f64)]) -> ObservationStore {
    let mut store = ObservationStore::new(space, true);
    for (p, t) in points {
        store.register_point(p.clone(), *t).unwrap();
    }
    store
}

pub(crate) fn metric(name: &str) -> Vec<String> {
    vec![name.to_owned()]
}
