mod common;

use discrete_gm::{
    ArrayConstraint, BruteForce, BruteForceParameters, DenseFunction, DiscreteFunction,
    FilteredMoveMaker, HideTerms, Icm, IcmParameters, LabelSpace, Model, MoveMaker,
    OptimizationStatus, Optimizer, SolutionValue,
};
use proptest::prelude::*;
use rand::{rngs::StdRng, Rng};

fn random_model(rng: &mut StdRng) -> Model {
    match rng.gen_range(0..5) {
        0 => common::potts_chain(rng, 6, 3),
        1 => common::sparse_potts_chain(rng, 6, 3),
        2 => common::random_higher_order(rng, 6, 3, 8, 3),
        3 => common::label_cost_chain(rng, 6, 3),
        _ => common::unique_label_chain(rng, 6, 3),
    }
}

// True if no single-variable relabeling strictly improves the labeling
fn is_locally_optimal(model: &Model, labeling: &[usize]) -> bool {
    let value = model.evaluate(labeling, false);
    let mut neighbour = labeling.to_vec();
    for variable in 0..model.num_variables() {
        for label in 0..model.num_labels(variable) {
            neighbour[variable] = label;
            if model.evaluate(&neighbour, false) < value {
                return false;
            }
        }
        neighbour[variable] = labeling[variable];
    }
    true
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn cached_value_matches_fresh_evaluation(seed in any::<u64>()) {
        let mut rng = common::rng(seed);
        let model = random_model(&mut rng);
        let start = common::random_labeling(&mut rng, &model);

        let mut movemaker = MoveMaker::new(&model);
        movemaker.set_solution(&start).unwrap();
        for _ in 0..30 {
            let variable = rng.gen_range(0..model.num_variables());
            movemaker.move_optimal(variable);
            let fresh = model.evaluate(movemaker.solution().as_slice(), false);
            prop_assert!(
                movemaker.solution_value().approx_eq(&fresh, 1e-6),
                "{} vs {}",
                movemaker.solution_value(),
                fresh
            );
        }
    }

    #[test]
    fn passes_without_moves_end_in_local_optima(seed in any::<u64>()) {
        let mut rng = common::rng(seed);
        let model = random_model(&mut rng);
        let start = common::random_labeling(&mut rng, &model);

        let mut movemaker = MoveMaker::new(&model);
        movemaker.set_solution(&start).unwrap();
        loop {
            let mut changed = false;
            for variable in 0..model.num_variables() {
                changed |= movemaker.move_optimal(variable);
            }
            if !changed {
                break;
            }
        }
        prop_assert!(is_locally_optimal(&model, movemaker.solution().as_slice()));
    }

    #[test]
    fn icm_never_worsens_the_start(seed in any::<u64>()) {
        let mut rng = common::rng(seed);
        let model = random_model(&mut rng);
        let start = common::random_labeling(&mut rng, &model);

        let mut icm = Icm::new(&model, IcmParameters::default());
        let status = icm.optimize(None, Some(&start)).unwrap();
        prop_assert_eq!(status, OptimizationStatus::LocalOptimal);
        prop_assert!(icm.best_solution_value() <= model.evaluate(&start, false));
        prop_assert!(is_locally_optimal(&model, icm.best_solution().as_slice()));
    }
}

#[test]
fn five_chain_from_all_ones() {
    common::init_logger();
    let model = common::five_chain();

    let mut brute_force = BruteForce::new(&model, BruteForceParameters::default()).unwrap();
    assert_eq!(
        brute_force.optimize(None, None).unwrap(),
        OptimizationStatus::Optimal
    );
    assert_eq!(brute_force.best_solution().as_slice(), &[0, 0, 0, 0, 0]);
    assert_eq!(brute_force.best_solution_value(), SolutionValue::feasible(0.));

    // one full pass reaches the optimum, the second one confirms it
    let mut movemaker = MoveMaker::new(&model);
    movemaker.set_solution(&[1, 1, 1, 1, 1]).unwrap();
    for variable in 0..5 {
        movemaker.move_optimal(variable);
    }
    assert_eq!(movemaker.solution_value().energy(), 0.);
    assert!((0..5).all(|variable| !movemaker.move_optimal(variable)));

    let mut icm = Icm::new(&model, IcmParameters::default());
    icm.optimize(None, Some(&[1, 1, 1, 1, 1])).unwrap();
    assert_eq!(icm.best_solution_value().energy(), 0.);
}

#[test]
fn hidden_unique_label_constraints_do_not_restrict_moves() {
    let mut rng = common::rng(11);
    let model = common::unique_label_chain(&mut rng, 5, 3);

    let mut filter = HideTerms::new(&model);
    for constraint in 0..model.num_constraints() {
        filter = filter.hide_constraint(constraint).unwrap();
    }
    let mut movemaker = FilteredMoveMaker::with_filter(&model, filter);
    for variable in 0..5 {
        movemaker.move_optimal(variable);
    }

    // without constraints, every variable takes its cheapest unary label
    for variable in 0..5 {
        let unary = model.factor_function(variable);
        let best = (0..3)
            .min_by(|&a, &b| unary.value(&[a]).total_cmp(&unary.value(&[b])))
            .unwrap();
        assert_eq!(
            unary.value(&[movemaker.solution()[variable]]),
            unary.value(&[best])
        );
    }
    assert!(movemaker.evaluate_current().is_feasible());
    assert!(movemaker.is_consistent(1e-9));
}

#[test]
fn icm_escapes_infeasible_starts_when_possible() {
    let mut rng = common::rng(5);
    let model = common::unique_label_chain(&mut rng, 6, 3);
    let mut icm = Icm::new(&model, IcmParameters::default());
    icm.optimize(None, Some(&[0; 6])).unwrap();
    assert!(icm.best_solution_value().is_feasible());
}

#[test]
fn infeasible_models_stay_infeasible() {
    let model = common::infeasible();
    let mut icm = Icm::new(&model, IcmParameters::default());
    icm.optimize(None, None).unwrap();
    assert!(!icm.best_solution_value().is_feasible());
    assert_eq!(icm.best_solution_value().how_violated(), 1.);

    let mut brute_force = BruteForce::new(&model, BruteForceParameters::default()).unwrap();
    assert_eq!(
        brute_force.optimize(None, None).unwrap(),
        OptimizationStatus::Infeasible
    );
}

// Variable 0 prefers label 0 by energy, but label 0 adds a violation below the feasibility limit
fn small_violation_model(other_violation: f64) -> Model {
    let mut model = Model::new(LabelSpace::simple(2, 2).unwrap());
    let unary = model.add_energy_function(DenseFunction::unary(vec![0., 1.]));
    model.add_factor(vec![0], unary).unwrap();
    let small = model
        .add_constraint_function(ArrayConstraint::from_shape_vec(&[2], vec![4e-6, 0.]).unwrap());
    model.add_constraint(vec![0], small).unwrap();
    let other = model.add_constraint_function(
        ArrayConstraint::from_shape_vec(&[2], vec![other_violation, other_violation]).unwrap(),
    );
    model.add_constraint(vec![1], other).unwrap();
    model
}

#[test]
fn small_local_violations_count_towards_the_total() {
    for other_violation in [1., 8e-6] {
        let model = small_violation_model(other_violation);
        let mut movemaker = MoveMaker::new(&model);
        movemaker.set_solution(&[1, 0]).unwrap();
        let before = movemaker.solution_value();

        // label 0 would raise the total violation
        assert!(!movemaker.move_optimal(0), "{other_violation}");
        assert_eq!(movemaker.solution().as_slice(), &[1, 0]);
        assert!(movemaker.solution_value() <= before);
        assert!(is_locally_optimal(&model, movemaker.solution().as_slice()));

        let mut icm = Icm::new(&model, IcmParameters::default());
        icm.optimize(None, Some(&[1, 0])).unwrap();
        assert!(icm.best_solution_value() <= model.evaluate(&[1, 0], false));
        assert_eq!(icm.best_solution().as_slice(), &[1, 0]);
    }

    // without the other violation, the small one stays below the limit
    let model = small_violation_model(0.);
    let mut movemaker = MoveMaker::new(&model);
    movemaker.set_solution(&[1, 0]).unwrap();
    assert!(movemaker.move_optimal(0));
    assert_eq!(movemaker.solution_value(), SolutionValue::feasible(0.));
}
