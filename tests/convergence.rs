//! End-to-end convergence and budget-discipline tests for the default
//! bundle.


use optimistic::EngineBuilder;

#[test]
fn test_finds_offset_quadratic_optimum() {
    let mut engine = EngineBuilder::new(|x: &[f64]| -(x[0] - 0.3).powi(2), 1, 100)
        .build()
        .unwrap();
    engine.optimize().unwrap();

    let best = engine.best_node().unwrap();
    assert!(best.value().unwrap() > -1e-3);
    assert!((best.center()[0] - 0.3).abs() < 0.05);
}

#[test]
fn test_finds_multimodal_optimum() {
    let mut engine = EngineBuilder::new(test_functions::sin_product, 1, 200)
        .build()
        .unwrap();
    engine.optimize().unwrap();

    // Global maximum ≈ 0.9756 near x ≈ 0.8675, with competitive local
    // maxima elsewhere.
    let best = engine.best_node().unwrap();
    assert!(best.value().unwrap() > 0.95);
    assert!((best.center()[0] - 0.8675).abs() < 0.05);
}

#[test]
fn test_two_dimensional_convergence() {
    let objective = |x: &[f64]| -((x[0] - 0.2).powi(2) + (x[1] - 0.7).powi(2));
    let mut engine = EngineBuilder::new(objective, 2, 250).build().unwrap();
    engine.optimize().unwrap();

    let best = engine.best_node().unwrap();
    assert!(best.value().unwrap() > -0.01);
}

#[test]
fn test_budget_is_respected_across_budgets() {
    for budget in [1, 2, 5, 13, 40, 111] {
        let mut engine = EngineBuilder::new(test_functions::sin_product, 1, budget)
            .build()
            .unwrap();
        engine.optimize().unwrap();
        assert!(
            engine.num_observations() <= budget,
            "budget {budget} exceeded: {}",
            engine.num_observations()
        );
    }
}

#[test]
fn test_minimal_budget_finishes_at_root() {
    let engine = EngineBuilder::new(test_functions::parabola, 3, 1)
        .build()
        .unwrap();
    assert!(engine.is_finished());
    assert_eq!(engine.num_observations(), 1);
    assert_eq!(engine.best_node().unwrap().center(), vec![0.5, 0.5, 0.5]);
}

#[test]
fn test_steps_after_exhaustion_are_harmless() {
    let mut engine = EngineBuilder::new(test_functions::parabola, 2, 10)
        .build()
        .unwrap();
    engine.optimize().unwrap();
    let observations = engine.num_observations();
    let best = engine.best_node().unwrap().clone();

    for _ in 0..5 {
        engine.step().unwrap();
    }
    assert_eq!(engine.num_observations(), observations);
    assert_eq!(engine.best_node().unwrap().center(), best.center());
}

#[test]
fn test_runs_are_deterministic_step_by_step() {
    let build = || {
        EngineBuilder::new(test_functions::sin_product, 1, 120)
            .build()
            .unwrap()
    };
    let mut a = build();
    let mut b = build();

    // Lockstep: the whole best-node sequence must match, not just the
    // final result.
    while !a.is_finished() {
        let before = a.num_observations();
        a.step().unwrap();
        b.step().unwrap();
        let (x, y) = (a.best_node().unwrap(), b.best_node().unwrap());
        assert_eq!(x.center(), y.center());
        assert_eq!(x.value(), y.value());
        assert_eq!(a.num_observations(), b.num_observations());
        if a.num_observations() == before {
            break;
        }
    }
}

#[test]
fn test_seeded_random_splits_reproduce_step_by_step() {
    let build = |seed: u64| {
        EngineBuilder::new(test_functions::rosenbrock, 3, 150)
            .split_uniform(seed)
            .build()
            .unwrap()
    };
    let mut a = build(42);
    let mut b = build(42);

    for _ in 0..30 {
        a.step().unwrap();
        b.step().unwrap();
        let (x, y) = (a.best_node().unwrap(), b.best_node().unwrap());
        assert_eq!(x.center(), y.center());
        assert_eq!(x.value(), y.value());
        assert_eq!(a.num_observations(), b.num_observations());
        if a.is_finished() {
            break;
        }
    }
}
