mod common;

use std::time::Duration;

use discrete_gm::{
    BeliefPropagation, BeliefPropagationParameters, BeliefPropagationState, BruteForce,
    BruteForceParameters, Model, OptimizationStatus, Optimizer, OptimizerParameters, Potts,
    Progress,
};
use proptest::prelude::*;

fn brute_force_energy(model: &Model) -> f64 {
    let mut brute_force = BruteForce::new(model, BruteForceParameters::default()).unwrap();
    brute_force.optimize(None, None).unwrap();
    brute_force.best_solution_value().energy()
}

fn assert_exact_on_tree(model: &Model) -> Result<(), TestCaseError> {
    prop_assert!(model.is_acyclic());
    let mut bp = BeliefPropagation::new(model, BeliefPropagationParameters::default()).unwrap();
    let status = bp.optimize(None, None).unwrap();
    prop_assert_eq!(status, OptimizationStatus::Converged);
    prop_assert_eq!(bp.state(), BeliefPropagationState::Converged);

    let expected = brute_force_energy(model);
    let actual = bp.best_solution_value().energy();
    prop_assert!((actual - expected).abs() < 1e-4, "{} vs {}", actual, expected);
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn exact_on_binary_potts_chains(seed in any::<u64>(), length in 2usize..8) {
        let mut rng = common::rng(seed);
        assert_exact_on_tree(&common::potts_chain(&mut rng, length, 2))?;
    }

    #[test]
    fn exact_on_potts_stars(seed in any::<u64>(), leaves in 1usize..6) {
        let mut rng = common::rng(seed);
        assert_exact_on_tree(&common::potts_star(&mut rng, leaves, 2))?;
    }

    #[test]
    fn exact_on_sparse_chains(seed in any::<u64>()) {
        let mut rng = common::rng(seed);
        assert_exact_on_tree(&common::sparse_potts_chain(&mut rng, 5, 3))?;
    }

    #[test]
    fn reported_values_match_the_labelings(seed in any::<u64>(), damping in 0.0..0.9f64) {
        let mut rng = common::rng(seed);
        let model = common::random_higher_order(&mut rng, 6, 3, 8, 3);
        let mut parameters = BeliefPropagationParameters::default();
        parameters.set_damping(damping).set_max_iterations(50).set_seed(seed);
        let mut bp = BeliefPropagation::new(&model, parameters).unwrap();
        bp.optimize(None, None).unwrap();

        prop_assert!(bp.iteration() <= 50);
        prop_assert_eq!(
            bp.best_solution_value(),
            model.evaluate(bp.best_solution().as_slice(), false)
        );
        prop_assert!(bp.best_solution_value() <= bp.current_solution_value());
    }
}

#[test]
fn five_chain_converges_to_zero() {
    common::init_logger();
    let model = common::five_chain();
    let mut bp = BeliefPropagation::new(&model, BeliefPropagationParameters::default()).unwrap();
    assert_eq!(
        bp.optimize(None, None).unwrap(),
        OptimizationStatus::Converged
    );
    assert_eq!(bp.best_solution_value().energy(), 0.);
    assert_eq!(bp.best_solution().as_slice(), &[0, 0, 0, 0, 0]);
}

#[test]
fn unique_label_chains_decode_feasibly() {
    let mut rng = common::rng(3);
    let model = common::unique_label_chain(&mut rng, 6, 3);
    let mut bp = BeliefPropagation::new(&model, BeliefPropagationParameters::default()).unwrap();
    assert_eq!(
        bp.optimize(None, None).unwrap(),
        OptimizationStatus::Converged
    );
    assert!(bp.best_solution_value().is_feasible());
    assert!((bp.best_solution_value().energy() - brute_force_energy(&model)).abs() < 1e-4);
}

#[test]
fn callback_sees_every_iteration() {
    let mut rng = common::rng(17);
    let model = common::label_cost_chain(&mut rng, 6, 3);
    let mut parameters = BeliefPropagationParameters::default();
    parameters.set_max_iterations(5).set_convergence_tolerance(0.);
    let mut bp = BeliefPropagation::new(&model, parameters).unwrap();

    let mut iterations = Vec::new();
    let mut callback = |progress: &Progress| {
        iterations.push(progress.iteration);
        true
    };
    let status = bp.optimize(Some(&mut callback), None).unwrap();
    assert_eq!(status, OptimizationStatus::IterationLimitReached);
    assert_eq!(bp.state(), BeliefPropagationState::IterationLimitReached);
    assert_eq!(iterations, vec![1, 2, 3, 4, 5]);
}

#[test]
fn zero_time_limit_stops_after_one_iteration() {
    let mut rng = common::rng(23);
    let mut model = common::potts_chain(&mut rng, 6, 3);
    let potts = model.add_energy_function(Potts::new(3, 0.5));
    model.add_factor(vec![0, 5], potts).unwrap();
    assert!(!model.is_acyclic());

    let mut parameters = BeliefPropagationParameters::default();
    parameters.set_time_limit(Duration::ZERO);
    let mut bp = BeliefPropagation::new(&model, parameters).unwrap();
    assert_eq!(
        bp.optimize(None, None).unwrap(),
        OptimizationStatus::TimeLimitReached
    );
    assert_eq!(bp.state(), BeliefPropagationState::TimeLimitReached);
    assert_eq!(bp.iteration(), 1);

    let best = bp.best_solution().as_slice();
    assert!(model.check_labeling(best).is_ok());
    assert_eq!(bp.best_solution_value(), model.evaluate(best, false));
}

#[test]
fn options_come_from_the_parameter_bag() {
    let model = common::five_chain();
    let mut parameters = OptimizerParameters::new();
    parameters
        .set("max_iterations", 3)
        .set("damping", 0.25)
        .set("normalize_messages", false)
        .set("seed", 42);
    let bp = BeliefPropagation::from_parameters(&model, parameters).unwrap();
    assert_eq!(bp.parameters().max_iterations(), 3);
    assert_eq!(bp.parameters().damping(), 0.25);
    assert!(!bp.parameters().normalize_messages());
    assert_eq!(bp.parameters().seed(), Some(42));

    let mut parameters = OptimizerParameters::new();
    parameters.set("max_iterations", 3).set("colour", "blue");
    assert!(BeliefPropagation::from_parameters(&model, parameters).is_err());
}
