//! Closed-loop runs: recommend, evaluate, append, repeat.

use nextpoint::{Advisor, ExperimentRecord, Parameter, ParameterSpace};

use crate::test_functions::{branin, forrester};
use crate::{metric, quick_config};

fn run_loop(
    space: &ParameterSpace,
    mut history: Vec<ExperimentRecord>,
    rounds: usize,
    target: impl Fn(&[f64]) -> f64,
) -> Vec<ExperimentRecord> {
    let advisor = Advisor::new(quick_config());
    let names: Vec<String> = space.names().map(str::to_owned).collect();
    for _ in 0..rounds {
        let advice = advisor.recommend(space, &metric("f"), &history).unwrap();
        let point = advice.recommendation.values().to_vec();
        assert!(space.contains(&point), "{point:?} out of bounds");

        let mut record = ExperimentRecord::new(names.iter().cloned().zip(point.iter().copied()));
        record.values.insert("f".to_owned(), target(&point));
        history.push(record);
    }
    history
}

fn best(history: &[ExperimentRecord]) -> f64 {
    history
        .iter()
        .map(|r| r.values["f"])
        .fold(f64::NEG_INFINITY, f64::max)
}

#[test]
fn improves_on_forrester() {
    let space = ParameterSpace::new(vec![Parameter::new("x", 0.0, 1.0)]).unwrap();
    let f = |x: &[f64]| -forrester(x[0]);
    let initial: Vec<ExperimentRecord> = [0.1, 0.4, 0.95]
        .into_iter()
        .map(|x| ExperimentRecord::new([("x", x), ("f", f(&[x]))]))
        .collect();
    let start = best(&initial);

    let history = run_loop(&space, initial, 12, f);
    let end = best(&history);
    assert!(end > start, "no improvement: {start} -> {end}");
    assert!(end > 4.0, "best -forrester only {end}");
}

#[test]
fn explores_two_dimensions_from_scratch() {
    let space = ParameterSpace::new(vec![
        Parameter::new("x1", -5.0, 10.0),
        Parameter::new("x2", 0.0, 15.0),
    ])
    .unwrap();
    let history = run_loop(&space, Vec::new(), 8, |x| -branin(x));
    assert_eq!(history.len(), 8);

    let first = &history[0].values;
    let spread = history
        .iter()
        .skip(1)
        .map(|r| (r.values["x1"] - first["x1"]).abs() + (r.values["x2"] - first["x2"]).abs())
        .fold(0.0, f64::max);
    assert!(spread > 1.0, "suggestions did not move: spread {spread}");
}
