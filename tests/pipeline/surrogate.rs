use nextpoint::{GaussianProcess, Parameter, ParameterSpace};

use crate::{space_1d, store_from};

#[test]
fn posterior_interpolates_observations() {
    let store = store_from(
        space_1d(),
        &[(vec![1.0], 0.5), (vec![4.0], 2.0), (vec![6.5], -1.0), (vec![9.0], 0.0)],
    );
    let model = GaussianProcess::default().fit(&store).unwrap();
    for o in store.observations() {
        let p = model.predict(&o.point);
        assert!(
            (p.mean - o.target).abs() < 0.1,
            "mean {} at {:?}, observed {}",
            p.mean,
            o.point,
            o.target
        );
    }
}

#[test]
fn uncertainty_grows_away_from_observations() {
    let store = store_from(space_1d(), &[(vec![2.0], 1.0), (vec![8.0], 5.0)]);
    let model = GaussianProcess::default().fit(&store).unwrap();
    let at = |x: f64| model.predict(&[x]).std_dev;

    assert!(at(8.0) < 0.1 * at(5.0));
    assert!(at(8.0) < at(8.5));
    assert!(at(8.5) < at(9.0));
    assert!(at(2.0) < at(1.5));
}

#[test]
fn empty_store_predicts_prior_everywhere() {
    let model = GaussianProcess::default().fit(&store_from(space_1d(), &[])).unwrap();
    let a = model.predict(&[0.0]);
    let b = model.predict(&[7.3]);
    assert_eq!(a, b);
    assert_eq!(a.mean, 0.0);
    assert!(a.std_dev > 0.0);
    assert_eq!(model.n_train(), 0);
}

#[test]
fn constant_targets_do_not_break_the_fit() {
    let store = store_from(space_1d(), &[(vec![1.0], 3.0), (vec![5.0], 3.0), (vec![9.0], 3.0)]);
    let model = GaussianProcess::default().fit(&store).unwrap();
    assert_eq!(model.target_scaling(), (3.0, 1.0));
    let p = model.predict(&[5.0]);
    assert!((p.mean - 3.0).abs() < 1e-2);
    assert!(p.std_dev.is_finite());
}

#[test]
fn exact_duplicates_without_jitter_still_fit() {
    let points: Vec<(Vec<f64>, f64)> = (0..6).map(|i| (vec![5.0], f64::from(i))).collect();
    let mut with_other = points.clone();
    with_other.push((vec![1.0], 0.0));
    let store = store_from(space_1d(), &with_other);

    let model = GaussianProcess::builder().alpha(0.0).build().fit(&store).unwrap();
    let p = model.predict(&[5.0]);
    assert!(p.mean.is_finite());
    assert!(p.std_dev.is_finite());
}

#[test]
fn fit_is_deterministic_for_a_seed() {
    let space = ParameterSpace::new(vec![
        Parameter::new("a", 0.0, 1.0),
        Parameter::new("b", -2.0, 2.0),
    ])
    .unwrap();
    let data = vec![
        (vec![0.1, -1.0], 0.3),
        (vec![0.4, 0.5], 1.1),
        (vec![0.8, 1.5], -0.2),
        (vec![0.6, -0.3], 0.9),
    ];
    let fit = || {
        GaussianProcess::builder()
            .seed(11)
            .build()
            .fit(&store_from(space.clone(), &data))
            .unwrap()
    };
    let (m1, m2) = (fit(), fit());
    assert_eq!(m1.kernel(), m2.kernel());
    assert_eq!(m1.predict(&[0.5, 0.0]), m2.predict(&[0.5, 0.0]));
}

#[test]
fn predictions_use_raw_target_units() {
    let store = store_from(space_1d(), &[(vec![2.0], 100.0), (vec![8.0], 300.0)]);
    let model = GaussianProcess::default().fit(&store).unwrap();
    assert_eq!(model.target_scaling().0, 200.0);
    assert!((model.predict(&[8.0]).mean - 300.0).abs() < 5.0);
}

#[test]
fn huge_finite_targets_keep_a_finite_posterior() {
    let store = store_from(space_1d(), &[(vec![2.0], 1e200), (vec![8.0], -1e200)]);
    let model = GaussianProcess::default().fit(&store).unwrap();
    let (mean, scale) = model.target_scaling();
    assert_eq!(mean, 0.0);
    assert!(scale.is_finite() && scale > 0.0);

    for x in [0.0, 2.0, 5.0, 8.0, 10.0] {
        let p = model.predict(&[x]);
        assert!(p.mean.is_finite(), "mean at {x}");
        assert!(p.std_dev.is_finite(), "std at {x}");
    }
    assert!(model.predict(&[2.0]).mean > 0.0);
    assert!(model.predict(&[8.0]).mean < 0.0);
}
