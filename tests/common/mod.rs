#![allow(dead_code)]

use discrete_gm::{
    ArrayConstraint, DenseFunction, LabelCosts, LabelSpace, Model, Potts, SparseFunction,
    UniqueLabels,
};
use rand::{rngs::StdRng, seq::index::sample, Rng, SeedableRng};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

fn random_unary(rng: &mut StdRng, num_labels: usize) -> DenseFunction {
    DenseFunction::unary((0..num_labels).map(|_| rng.gen_range(0.0..2.0)).collect())
}

fn add_random_unaries(rng: &mut StdRng, model: &mut Model) {
    for variable in 0..model.num_variables() {
        let unary = model.add_energy_function(random_unary(rng, model.num_labels(variable)));
        model.add_factor(vec![variable], unary).unwrap();
    }
}

// Random unaries, Potts couplings between consecutive variables
pub fn potts_chain(rng: &mut StdRng, num_variables: usize, num_labels: usize) -> Model {
    let mut model = Model::new(LabelSpace::simple(num_variables, num_labels).unwrap());
    add_random_unaries(rng, &mut model);
    for variable in 1..num_variables {
        let potts = model.add_energy_function(Potts::new(num_labels, rng.gen_range(0.0..1.5)));
        model.add_factor(vec![variable - 1, variable], potts).unwrap();
    }
    model
}

// Random unaries, Potts couplings between variable 0 and every other variable
pub fn potts_star(rng: &mut StdRng, num_leaves: usize, num_labels: usize) -> Model {
    let mut model = Model::new(LabelSpace::simple(num_leaves + 1, num_labels).unwrap());
    add_random_unaries(rng, &mut model);
    for leaf in 1..=num_leaves {
        let potts = model.add_energy_function(Potts::new(num_labels, rng.gen_range(0.0..1.5)));
        model.add_factor(vec![0, leaf], potts).unwrap();
    }
    model
}

// Like `potts_chain`, but the couplings are sparse tables holding only the disagreements
pub fn sparse_potts_chain(rng: &mut StdRng, num_variables: usize, num_labels: usize) -> Model {
    let mut model = Model::new(LabelSpace::simple(num_variables, num_labels).unwrap());
    add_random_unaries(rng, &mut model);
    for variable in 1..num_variables {
        let beta = rng.gen_range(0.0..1.5);
        let mut sparse = SparseFunction::new(vec![num_labels, num_labels]);
        for a in 0..num_labels {
            for b in 0..num_labels {
                if a != b {
                    sparse.set(&[a, b], beta).unwrap();
                }
            }
        }
        let handle = model.add_energy_function(sparse);
        model.add_factor(vec![variable - 1, variable], handle).unwrap();
    }
    model
}

// Variables with 1 to `max_labels` labels, dense random tables over random scopes,
// plus a few forbidden combinations as array constraints
pub fn random_higher_order(
    rng: &mut StdRng,
    num_variables: usize,
    max_labels: usize,
    num_factors: usize,
    max_arity: usize,
) -> Model {
    let num_labels: Vec<usize> = (0..num_variables)
        .map(|_| rng.gen_range(1..=max_labels))
        .collect();
    let mut model = Model::new(LabelSpace::from_num_labels(num_labels).unwrap());
    for _ in 0..num_factors {
        let arity = rng.gen_range(1..=max_arity.min(num_variables));
        let scope = sample(rng, num_variables, arity).into_vec();
        let shape: Vec<usize> = scope.iter().map(|&v| model.num_labels(v)).collect();
        let size: usize = shape.iter().product();
        let values = (0..size).map(|_| rng.gen_range(-1.0..1.0)).collect();
        let function = DenseFunction::from_shape_vec(&shape, values).unwrap();
        let handle = model.add_energy_function(function);
        model.add_factor(scope, handle).unwrap();
    }
    if num_variables >= 2 {
        let scope = sample(rng, num_variables, 2).into_vec();
        let shape: Vec<usize> = scope.iter().map(|&v| model.num_labels(v)).collect();
        let forbidden = vec![vec![rng.gen_range(0..shape[0]), rng.gen_range(0..shape[1])]];
        let constraint = ArrayConstraint::forbidding(&shape, &forbidden).unwrap();
        let handle = model.add_constraint_function(constraint);
        model.add_constraint(scope, handle).unwrap();
    }
    model
}

// Random unaries and one label-cost function shared by every consecutive triple
pub fn label_cost_chain(rng: &mut StdRng, num_variables: usize, num_labels: usize) -> Model {
    let mut model = Model::new(LabelSpace::simple(num_variables, num_labels).unwrap());
    add_random_unaries(rng, &mut model);
    let costs = (0..num_labels).map(|_| rng.gen_range(0.0..1.0)).collect();
    let handle = model.add_energy_function(LabelCosts::new(3, costs));
    for variable in 2..num_variables {
        model
            .add_factor(vec![variable - 2, variable - 1, variable], handle)
            .unwrap();
    }
    model
}

// Random unaries, neighbours must take different labels
pub fn unique_label_chain(rng: &mut StdRng, num_variables: usize, num_labels: usize) -> Model {
    let mut model = Model::new(LabelSpace::simple(num_variables, num_labels).unwrap());
    add_random_unaries(rng, &mut model);
    let handle = model.add_constraint_function(UniqueLabels::new(2, num_labels).unwrap());
    for variable in 1..num_variables {
        model.add_constraint(vec![variable - 1, variable], handle).unwrap();
    }
    model
}

// Three binary variables that must all differ
pub fn infeasible() -> Model {
    let mut model = Model::new(LabelSpace::simple(3, 2).unwrap());
    let handle = model.add_constraint_function(UniqueLabels::new(3, 2).unwrap());
    model.add_constraint(vec![0, 1, 2], handle).unwrap();
    model
}

// Unary costs (0, 1) and Potts(1) on a chain of five binary variables
pub fn five_chain() -> Model {
    let mut model = Model::new(LabelSpace::simple(5, 2).unwrap());
    let unary = model.add_energy_function(DenseFunction::unary(vec![0., 1.]));
    let potts = model.add_energy_function(Potts::new(2, 1.));
    for variable in 0..5 {
        model.add_factor(vec![variable], unary).unwrap();
    }
    for variable in 1..5 {
        model.add_factor(vec![variable - 1, variable], potts).unwrap();
    }
    model
}

pub fn random_labeling(rng: &mut StdRng, model: &Model) -> Vec<usize> {
    (0..model.num_variables())
        .map(|variable| rng.gen_range(0..model.num_labels(variable)))
        .collect()
}
