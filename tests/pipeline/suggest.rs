use nextpoint::{
    AcquisitionFunction, AcquisitionKind, Error, ExpectedImprovement, FittedAcquisition,
    GaussianProcess, Parameter, ParameterSpace, Prediction, Suggester, UpperConfidenceBound,
};

use crate::{space_1d, store_from};

fn suggester() -> Suggester {
    Suggester::builder().n_warmup(500).build()
}

#[test]
fn suggestion_respects_odd_bounds() {
    let space = ParameterSpace::new(vec![
        Parameter::new("tiny", 1e-6, 2e-6),
        Parameter::new("wide", -1e4, 1e4),
        Parameter::new("neg", -3.0, -2.5),
    ])
    .unwrap();
    let store = store_from(
        space.clone(),
        &[
            (vec![1.2e-6, 0.0, -2.9], 1.0),
            (vec![1.9e-6, 5e3, -2.6], 2.0),
            (vec![1.5e-6, -9e3, -2.75], 0.5),
        ],
    );
    let model = GaussianProcess::default().fit(&store).unwrap();
    let ucb = UpperConfidenceBound::default();
    let acq = FittedAcquisition::new(&model, &ucb, Some(2.0));

    let s = suggester().suggest(&acq).unwrap();
    assert!(space.contains(&s.point), "{:?} out of bounds", s.point);
    assert!(s.unit.iter().all(|u| (0.0..=1.0).contains(u)));
    assert!(s.acquisition_value.is_finite());
}

#[test]
fn local_search_does_not_lose_to_warmup() {
    let store = store_from(space_1d(), &[(vec![3.0], 0.0), (vec![7.0], 1.0)]);
    let model = GaussianProcess::default().fit(&store).unwrap();
    let ucb = UpperConfidenceBound { kappa: 1.0 };
    let acq = FittedAcquisition::new(&model, &ucb, Some(1.0));

    let warmup_only = Suggester::builder().n_warmup(500).n_local_starts(0).build();
    let refined = suggester();

    let a = warmup_only.suggest(&acq).unwrap();
    let b = refined.suggest(&acq).unwrap();
    assert_eq!(a.n_local_runs, 0);
    assert!(b.n_local_runs > 0);
    assert!(b.acquisition_value >= a.acquisition_value);
}

#[test]
fn reported_value_matches_acquisition_at_point() {
    let store = store_from(space_1d(), &[(vec![1.0], 2.0), (vec![6.0], 1.0)]);
    let model = GaussianProcess::default().fit(&store).unwrap();
    let ucb = UpperConfidenceBound::default();
    let acq = FittedAcquisition::new(&model, &ucb, Some(2.0));

    let s = suggester().suggest(&acq).unwrap();
    let direct = acq.value(&s.point);
    assert!((direct - s.acquisition_value).abs() < 1e-9 * direct.abs().max(1.0));
}

#[test]
fn same_seed_same_suggestion() {
    let store = store_from(space_1d(), &[(vec![2.0], 1.0), (vec![8.0], 5.0)]);
    let model = GaussianProcess::default().fit(&store).unwrap();
    let kind = AcquisitionKind::default();
    let acq = FittedAcquisition::new(&model, &kind, Some(5.0));

    let a = suggester().suggest(&acq).unwrap();
    let b = suggester().suggest(&acq).unwrap();
    assert_eq!(a, b);
}

#[test]
fn empty_history_yields_in_bounds_point() {
    let store = store_from(space_1d(), &[]);
    let model = GaussianProcess::default().fit(&store).unwrap();

    for kind in [
        AcquisitionKind::default(),
        AcquisitionKind::ExpectedImprovement { xi: 0.01 },
        AcquisitionKind::ProbabilityOfImprovement { xi: 0.0 },
    ] {
        let acq = FittedAcquisition::new(&model, &kind, None);
        let s = suggester().suggest(&acq).unwrap();
        assert!((0.0..=10.0).contains(&s.point[0]));
        assert!(s.acquisition_value.is_finite());
    }
}

#[test]
fn expected_improvement_avoids_known_bad_region() {
    let store = store_from(
        space_1d(),
        &[(vec![0.5], -4.0), (vec![1.5], -3.5), (vec![6.0], 1.0), (vec![7.0], 1.2)],
    );
    let model = GaussianProcess::default().fit(&store).unwrap();
    let ei = ExpectedImprovement::default();
    let acq = FittedAcquisition::new(&model, &ei, Some(1.2));

    let s = suggester().suggest(&acq).unwrap();
    assert!(s.point[0] > 2.5, "EI picked {} near the worst observations", s.point[0]);
}

/// Utility that is undefined everywhere.
struct Undefined;

impl AcquisitionFunction for Undefined {
    fn utility(&self, _prediction: Prediction, _incumbent: Option<f64>) -> f64 {
        f64::NAN
    }

    fn name(&self) -> &'static str {
        "undefined"
    }
}

#[test]
fn no_finite_candidate_is_an_optimization_failure() {
    let store = store_from(space_1d(), &[(vec![2.0], 1.0), (vec![8.0], 5.0)]);
    let model = GaussianProcess::default().fit(&store).unwrap();
    let acq = FittedAcquisition::new(&model, &Undefined, Some(5.0));

    let err = suggester().suggest(&acq).unwrap_err();
    let Error::OptimizationFailed { cause } = &err else {
        panic!("expected OptimizationFailed, got {err:?}");
    };
    assert!(cause.contains("not finite at any candidate"), "{cause}");
    assert_eq!(err.kind(), "OptimizationFailed");
}
