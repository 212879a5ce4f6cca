pub mod data_structures {
    pub mod incidence;
}

pub mod spaces {
    pub mod label_space;
}

pub mod functions {
    pub mod array_constraint;
    pub mod constraint_function;
    pub mod dense;
    pub mod energy_function;
    pub mod function_trait;
    pub mod label_costs;
    pub mod label_count;
    pub mod nested_loops;
    pub mod potts;
    pub mod sparse;
    pub mod unique_labels;
}

pub mod gm {
    pub mod errors;
    pub mod model;
    pub mod solution;
    pub mod solution_value;
    pub mod term;
}

pub mod optimizers {
    pub mod belief_propagation;
    pub mod brute_force;
    pub mod icm;
    pub mod movemaker;
    pub mod optimizer;
    pub mod parameters;
}

pub mod io {
    pub mod uai;
}

pub use functions::{
    array_constraint::ArrayConstraint,
    constraint_function::ConstraintFunction,
    dense::DenseFunction,
    energy_function::EnergyFunction,
    function_trait::DiscreteFunction,
    label_costs::LabelCosts,
    label_count::LabelCount,
    potts::Potts,
    sparse::SparseFunction,
    unique_labels::UniqueLabels,
};
pub use gm::{
    errors::{ModelError, OptimizerError},
    model::Model,
    solution::Solution,
    solution_value::{SolutionValue, DEFAULT_FEASIBILITY_LIMIT},
    term::{Constraint, Factor, Term},
};
pub use optimizers::{
    belief_propagation::{BeliefPropagation, BeliefPropagationParameters, BeliefPropagationState},
    brute_force::{BruteForce, BruteForceParameters},
    icm::{Icm, IcmParameters},
    movemaker::{FilteredMoveMaker, HideTerms, MoveMaker, TermFilter, UseAll},
    optimizer::{OptimizationStatus, Optimizer, Progress, ReporterCallback},
    parameters::{OptimizerParameters, ParameterValue},
};
pub use spaces::label_space::{IndicatorVariableMapping, LabelSpace};
