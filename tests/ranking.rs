use gpexpr::ga::{Cost, Individual, Ranking, Samples};
use gpexpr::{Config, TreeExpr};

/// Samples of `y = 2 * S0 + 1`.
fn line() -> Samples {
    let inputs = (0..10).map(|i| vec![i as f64 * 0.5]).collect::<Vec<_>>();
    let targets = inputs.iter().map(|s| 2.0 * s[0] + 1.0).collect();
    Samples::new(inputs, targets)
}

fn trees(texts: &[&str]) -> Vec<TreeExpr> {
    texts
        .iter()
        .map(|t| TreeExpr::new(t, &Config::default()).unwrap())
        .collect()
}

#[test]
fn exact_solution_has_zero_cost() {
    let tree = TreeExpr::new("(root (+ (* 2 S0) 1))", &Config::default()).unwrap();
    let cost = tree.fitness(&line());
    assert!(cost.is_valid());
    assert_eq!(cost.0, 0.0);
}

#[test]
fn ranks_by_error() {
    let population = trees(&[
        "(root S0)",
        "(root (+ (* 2 S0) 1))",
        "(root (* 2 S0))",
        "(root (log (- S0 S0)))",
        "(root (+ S3 1))",
    ]);
    let ranking = Ranking::with_num_threads(population, &line(), 3);
    assert_eq!(ranking.population().len(), 5);

    let best = ranking.most_fit().unwrap();
    assert_eq!(best.0.expanded_text(), "(root (+ (* 2 S0) 1))");
    assert_eq!(best.1, Cost(0.0));

    // The NaN and out-of-range individuals rank below every valid one.
    let ranked = ranking.population();
    assert!(!ranked[0].1.is_valid());
    assert!(!ranked[1].1.is_valid());
    assert!(ranked[2..].iter().all(|p| p.1.is_valid()));
    assert_eq!(ranked[2].0.expanded_text(), "(root S0)");
    assert_eq!(ranked[3].0.expanded_text(), "(root (* 2 S0))");
}

#[test]
fn default_thread_count() {
    let ranking = Ranking::new(trees(&["(root 1)", "(root (* 2 S0))"]), &line());
    let population = ranking.into_population();
    assert_eq!(population.len(), 2);
    assert!(population[0].1 <= population[1].1);
}

#[test]
fn empty_samples_are_worst() {
    let tree = TreeExpr::new("(root S0)", &Config::default()).unwrap();
    assert_eq!(tree.fitness(&Samples::default()), Cost::WORST);
}
