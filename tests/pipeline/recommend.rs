use nextpoint::{
    AcquisitionKind, Advisor, AdvisorConfig, Error, ExperimentRecord, Parameter, ParameterSpace,
};

use crate::{metric, quick_config, space_1d, two_point_history};

fn recommend_x(config: AdvisorConfig) -> f64 {
    let advice = Advisor::new(config)
        .recommend(&space_1d(), &metric("y"), &two_point_history())
        .unwrap();
    advice.recommendation.get("x").unwrap()
}

fn distance_to_nearest_observed(x: f64) -> f64 {
    (x - 2.0).abs().min((x - 8.0).abs())
}

#[test]
fn two_point_example_stays_in_bounds() {
    let x = recommend_x(quick_config());
    assert!((0.0..=10.0).contains(&x), "x = {x}");
}

#[test]
fn zero_kappa_exploits_best_observation() {
    let config = AdvisorConfig::builder().n_warmup(500).kappa(0.0).build().unwrap();
    let x = recommend_x(config);
    assert!((x - 8.0).abs() < 0.5, "pure exploitation picked x = {x}");
}

#[test]
fn large_kappa_explores_away_from_observations() {
    let config = AdvisorConfig::builder().n_warmup(500).kappa(100.0).build().unwrap();
    let x = recommend_x(config);
    assert!(
        distance_to_nearest_observed(x) > 1.5,
        "exploration picked x = {x}, too close to an observation"
    );
}

#[test]
fn exploration_grows_with_kappa() {
    let distances: Vec<f64> = [0.0, 2.5, 100.0]
        .into_iter()
        .map(|kappa| {
            let config = AdvisorConfig::builder().n_warmup(500).kappa(kappa).build().unwrap();
            distance_to_nearest_observed(recommend_x(config))
        })
        .collect();
    assert!(
        distances.windows(2).all(|w| w[0] <= w[1] + 1e-9),
        "distances not monotone: {distances:?}"
    );
}

#[test]
fn identical_inputs_give_bit_identical_output() {
    let space = ParameterSpace::new(vec![
        Parameter::new("a", 0.0, 1.0),
        Parameter::new("b", 10.0, 20.0),
    ])
    .unwrap();
    let history = vec![
        ExperimentRecord::new([("a", 0.2), ("b", 12.0), ("m", 0.3)]),
        ExperimentRecord::new([("a", 0.7), ("b", 18.0), ("m", 0.9)]),
        ExperimentRecord::new([("a", 0.5), ("b", 15.0), ("m", 0.6)]),
    ];
    let run = || {
        Advisor::new(quick_config())
            .recommend(&space, &metric("m"), &history)
            .unwrap()
    };
    let (first, second) = (run(), run());
    let bits = |v: &[f64]| v.iter().map(|x| x.to_bits()).collect::<Vec<_>>();
    assert_eq!(
        bits(first.recommendation.values()),
        bits(second.recommendation.values())
    );
    assert_eq!(first, second);
}

#[test]
fn no_experiments_still_recommends() {
    let space = ParameterSpace::new(vec![
        Parameter::new("a", -1.0, 1.0),
        Parameter::new("b", 100.0, 200.0),
    ])
    .unwrap();
    let advice = Advisor::new(quick_config())
        .recommend(&space, &metric("m"), &[])
        .unwrap();
    let values = advice.recommendation.values();
    assert!(values.iter().all(|v| v.is_finite()));
    assert!(space.contains(values));
    assert_eq!(advice.summary.registered, 0);
}

#[test]
fn disallowed_duplicates_do_not_grow_the_store() {
    let config = AdvisorConfig::builder()
        .allow_duplicate_points(false)
        .build()
        .unwrap();
    let advisor = Advisor::new(config);
    let record = ExperimentRecord::new([("x", 3.0), ("y", 1.0)]);

    let once = advisor.build_store(&space_1d(), &metric("y"), &[record.clone()]);
    let twice = advisor.build_store(&space_1d(), &metric("y"), &[record.clone(), record]);
    assert_eq!(once.len(), twice.len());
    assert_eq!(twice.n_duplicates(), 1);
}

#[test]
fn allowed_duplicates_are_all_registered() {
    let advisor = Advisor::new(quick_config());
    let record = ExperimentRecord::new([("x", 3.0), ("y", 1.0)]);
    let advice = advisor
        .recommend(&space_1d(), &metric("y"), &[record.clone(), record])
        .unwrap();
    assert_eq!(advice.summary.registered, 2);
    assert_eq!(advice.summary.duplicates, 0);
}

#[test]
fn malformed_records_are_counted_not_fatal() {
    let history = vec![
        ExperimentRecord::new([("x", 2.0), ("y", 1.0)]),
        ExperimentRecord::new([("y", 4.0)]),
        ExperimentRecord::new([("x", 5.0)]),
        ExperimentRecord::new([("x", f64::NAN), ("y", 2.0)]),
    ];
    let advice = Advisor::new(quick_config())
        .recommend(&space_1d(), &metric("y"), &history)
        .unwrap();
    // The record without `y` falls back to target 0.0.
    assert_eq!(advice.summary.registered, 2);
    assert_eq!(advice.summary.dropped, 2);

    let curve = advice.diagnostics.unwrap();
    assert_eq!(curve.observed_x, vec![2.0, 5.0]);
    assert_eq!(curve.observed_y, vec![1.0, 0.0]);
}

#[test]
fn first_metric_is_the_target() {
    let history = vec![
        ExperimentRecord::new([("x", 2.0), ("primary", 1.0), ("secondary", 9.0)]),
        ExperimentRecord::new([("x", 8.0), ("primary", 5.0), ("secondary", -9.0)]),
    ];
    let metrics = vec!["primary".to_owned(), "secondary".to_owned()];
    let advice = Advisor::new(quick_config())
        .recommend(&space_1d(), &metrics, &history)
        .unwrap();
    assert_eq!(advice.diagnostics.unwrap().observed_y, vec![1.0, 5.0]);
}

#[test]
fn diagnostic_curve_spans_bounds() {
    let advice = Advisor::new(quick_config())
        .recommend(&space_1d(), &metric("y"), &two_point_history())
        .unwrap();
    let curve = advice.diagnostics.unwrap();

    assert_eq!(curve.x.len(), 1000);
    assert_eq!(curve.predicted_mean.len(), 1000);
    assert_eq!(curve.predicted_sigma.len(), 1000);
    assert_eq!(curve.x[0], 0.0);
    assert_eq!(curve.x[999], 10.0);
    assert!(curve.x.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn diagnostic_sigma_dips_at_observations() {
    let advice = Advisor::new(quick_config())
        .recommend(&space_1d(), &metric("y"), &two_point_history())
        .unwrap();
    let curve = advice.diagnostics.unwrap();
    let nearest = |target: f64| {
        curve
            .x
            .iter()
            .enumerate()
            .min_by(|a, b| (a.1 - target).abs().total_cmp(&(b.1 - target).abs()))
            .map(|(i, _)| i)
            .unwrap()
    };

    let i8 = nearest(8.0);
    let sigma_max = curve.predicted_sigma.iter().copied().fold(0.0, f64::max);
    assert!(curve.predicted_sigma[i8] < 0.1 * sigma_max);
    assert!(curve.predicted_sigma[i8] < curve.predicted_sigma[nearest(8.5)]);
    assert!(curve.predicted_sigma[nearest(8.5)] < curve.predicted_sigma[nearest(9.0)]);
}

#[test]
fn diagnostics_only_in_one_dimension() {
    let space = ParameterSpace::new(vec![
        Parameter::new("a", 0.0, 1.0),
        Parameter::new("b", 0.0, 1.0),
    ])
    .unwrap();
    let advice = Advisor::new(quick_config())
        .recommend(&space, &metric("m"), &[])
        .unwrap();
    assert!(advice.diagnostics.is_none());
}

#[test]
fn custom_grid_resolution() {
    let config = AdvisorConfig::builder()
        .n_warmup(500)
        .grid_resolution(50)
        .build()
        .unwrap();
    let advice = Advisor::new(config)
        .recommend(&space_1d(), &metric("y"), &two_point_history())
        .unwrap();
    assert_eq!(advice.diagnostics.unwrap().len(), 50);
}

#[test]
fn alternative_acquisitions_recommend_in_bounds() {
    for kind in [
        AcquisitionKind::ExpectedImprovement { xi: 0.0 },
        AcquisitionKind::ProbabilityOfImprovement { xi: 0.01 },
    ] {
        let config = AdvisorConfig::builder()
            .n_warmup(500)
            .acquisition(kind)
            .build()
            .unwrap();
        let x = recommend_x(config);
        assert!((0.0..=10.0).contains(&x));
    }
}

#[test]
fn invalid_config_is_rejected_before_fitting() {
    let config = AdvisorConfig {
        kappa: f64::NAN,
        ..AdvisorConfig::default()
    };
    let err = Advisor::new(config)
        .recommend(&space_1d(), &metric("y"), &two_point_history())
        .unwrap_err();
    assert!(matches!(err, Error::InvalidConfig { field: "kappa", .. }));
    assert!(err.is_client_error());
}

#[test]
fn recommendation_serializes_in_parameter_order() {
    let space = ParameterSpace::new(vec![
        Parameter::new("zeta", 0.0, 1.0),
        Parameter::new("alpha", 0.0, 1.0),
    ])
    .unwrap();
    let advice = Advisor::new(quick_config())
        .recommend(&space, &metric("m"), &[])
        .unwrap();
    let json = serde_json::to_string(&advice.recommendation).unwrap();
    let zeta = json.find("zeta").unwrap();
    let alpha = json.find("alpha").unwrap();
    assert!(zeta < alpha, "{json}");
}

#[test]
fn huge_targets_still_recommend() {
    let history = vec![
        ExperimentRecord::new([("x", 2.0), ("y", 1e200)]),
        ExperimentRecord::new([("x", 8.0), ("y", -1e200)]),
    ];
    let advice = Advisor::new(quick_config())
        .recommend(&space_1d(), &metric("y"), &history)
        .unwrap();

    let x = advice.recommendation.get("x").unwrap();
    assert!((0.0..=10.0).contains(&x), "x = {x}");
    assert!(advice.acquisition_value.is_finite());

    let curve = advice.diagnostics.unwrap();
    assert!(curve.predicted_mean.iter().all(|v| v.is_finite()));
    assert!(curve.predicted_sigma.iter().all(|v| v.is_finite()));
}
