use std::collections::HashMap;

use bitvec::slice::BitSlice;
use log::debug;
use petgraph::{algo::is_cyclic_undirected, graph::UnGraph};

use crate::{
    functions::{
        constraint_function::ConstraintFunction, energy_function::EnergyFunction,
        function_trait::DiscreteFunction,
    },
    spaces::label_space::{IndicatorVariableMapping, LabelSpace},
};

use super::{
    errors::ModelError,
    solution_value::{SolutionValue, DEFAULT_FEASIBILITY_LIMIT},
    term::{Constraint, Factor, Term},
};

// Node of the bipartite graph connecting variables to the factors and constraints touching them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactorGraphNode {
    Variable(usize),
    Factor(usize),
    Constraint(usize),
}

/// Discrete graphical model: a label space, the functions, and the factors and constraints
/// binding functions to tuples of variables.
///
/// Built incrementally: functions first, then the factors and constraints referencing them by
/// handle. Every insertion is validated, and a rejected insertion leaves the model unchanged.
#[derive(Debug, Clone)]
pub struct Model {
    space: LabelSpace,
    energy_functions: Vec<EnergyFunction>,
    constraint_functions: Vec<ConstraintFunction>,
    factors: Vec<Factor>,
    constraints: Vec<Constraint>,
    max_factor_arity: usize,
    max_factor_size: usize,
    max_constraint_arity: usize,
    max_constraint_size: usize,
    feasibility_limit: f64, // aggregated violation below this value counts as feasible
}

impl Model {
    pub fn new(space: LabelSpace) -> Self {
        Model {
            space,
            energy_functions: Vec::new(),
            constraint_functions: Vec::new(),
            factors: Vec::new(),
            constraints: Vec::new(),
            max_factor_arity: 0,
            max_factor_size: 0,
            max_constraint_arity: 0,
            max_constraint_size: 0,
            feasibility_limit: DEFAULT_FEASIBILITY_LIMIT,
        }
    }

    pub fn set_feasibility_limit(&mut self, value: f64) -> &mut Self {
        self.feasibility_limit = value;
        self
    }

    pub fn feasibility_limit(&self) -> f64 {
        self.feasibility_limit
    }

    pub fn space(&self) -> &LabelSpace {
        &self.space
    }

    pub fn num_variables(&self) -> usize {
        self.space.num_variables()
    }

    pub fn num_labels(&self, variable: usize) -> usize {
        self.space.num_labels(variable)
    }

    // Adds an energy function and returns its handle
    pub fn add_energy_function(&mut self, function: impl Into<EnergyFunction>) -> usize {
        self.energy_functions.push(function.into());
        self.energy_functions.len() - 1
    }

    // Adds a constraint function and returns its handle
    pub fn add_constraint_function(&mut self, function: impl Into<ConstraintFunction>) -> usize {
        self.constraint_functions.push(function.into());
        self.constraint_functions.len() - 1
    }

    // Checks that `variables` is a valid scope for `function`
    fn validate_term<F: DiscreteFunction>(
        &self,
        variables: &[usize],
        function: &F,
    ) -> Result<(), ModelError> {
        let num_variables = self.num_variables();
        for (position, &variable) in variables.iter().enumerate() {
            if variable >= num_variables {
                return Err(ModelError::InvalidVariable {
                    variable,
                    num_variables,
                });
            }
            if variables[..position].contains(&variable) {
                return Err(ModelError::DuplicateVariable(variable));
            }
        }

        if function.arity() != variables.len() {
            return Err(ModelError::ArityMismatch {
                arity: function.arity(),
                num_variables: variables.len(),
            });
        }

        for (axis, &variable) in variables.iter().enumerate() {
            if function.shape(axis) != self.num_labels(variable) {
                return Err(ModelError::ShapeMismatch {
                    axis,
                    variable,
                    num_labels: self.num_labels(variable),
                    shape: function.shape(axis),
                });
            }
        }
        Ok(())
    }

    // Binds an energy function to a tuple of variables, returns the index of the new factor
    pub fn add_factor(
        &mut self,
        variables: Vec<usize>,
        function: usize,
    ) -> Result<usize, ModelError> {
        let energy_function = self
            .energy_functions
            .get(function)
            .ok_or(ModelError::InvalidFunction {
                handle: function,
                num_functions: self.energy_functions.len(),
            })?;
        self.validate_term(&variables, energy_function)?;

        self.max_factor_arity = self.max_factor_arity.max(variables.len());
        self.max_factor_size = self.max_factor_size.max(energy_function.size());
        self.factors.push(Term::new(variables, function));
        Ok(self.factors.len() - 1)
    }

    // Binds a constraint function to a tuple of variables, returns the index of the new constraint
    pub fn add_constraint(
        &mut self,
        variables: Vec<usize>,
        function: usize,
    ) -> Result<usize, ModelError> {
        let constraint_function = self
            .constraint_functions
            .get(function)
            .ok_or(ModelError::InvalidFunction {
                handle: function,
                num_functions: self.constraint_functions.len(),
            })?;
        self.validate_term(&variables, constraint_function)?;

        self.max_constraint_arity = self.max_constraint_arity.max(variables.len());
        self.max_constraint_size = self.max_constraint_size.max(constraint_function.size());
        self.constraints.push(Term::new(variables, function));
        Ok(self.constraints.len() - 1)
    }

    pub fn factors(&self) -> &[Factor] {
        &self.factors
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn num_factors(&self) -> usize {
        self.factors.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    pub fn energy_functions(&self) -> &[EnergyFunction] {
        &self.energy_functions
    }

    pub fn constraint_functions(&self) -> &[ConstraintFunction] {
        &self.constraint_functions
    }

    // Function of the given factor
    pub fn factor_function(&self, factor: usize) -> &EnergyFunction {
        &self.energy_functions[self.factors[factor].function_index()]
    }

    // Function of the given constraint
    pub fn constraint_function(&self, constraint: usize) -> &ConstraintFunction {
        &self.constraint_functions[self.constraints[constraint].function_index()]
    }

    pub fn max_factor_arity(&self) -> usize {
        self.max_factor_arity
    }

    pub fn max_factor_size(&self) -> usize {
        self.max_factor_size
    }

    pub fn max_constraint_arity(&self) -> usize {
        self.max_constraint_arity
    }

    pub fn max_constraint_size(&self) -> usize {
        self.max_constraint_size
    }

    // Largest arity over factors and constraints
    pub fn max_arity(&self) -> usize {
        self.max_factor_arity.max(self.max_constraint_arity)
    }

    // Checks that a labeling has one label per variable, each in range
    pub fn check_labeling(&self, labeling: &[usize]) -> Result<(), ModelError> {
        if labeling.len() != self.num_variables() {
            return Err(ModelError::LabelingLength {
                expected: self.num_variables(),
                actual: labeling.len(),
            });
        }
        for (variable, &label) in labeling.iter().enumerate() {
            if label >= self.num_labels(variable) {
                return Err(ModelError::LabelOutOfRange {
                    variable,
                    label,
                    num_labels: self.num_labels(variable),
                });
            }
        }
        Ok(())
    }

    // Evaluates a full labeling.
    // With `early_stop_infeasible`, returns an infeasible sentinel (infinite energy) as soon as
    // the constraints alone make the labeling infeasible.
    // Assumption: `labeling` is valid, see `check_labeling`
    pub fn evaluate(&self, labeling: &[usize], early_stop_infeasible: bool) -> SolutionValue {
        self.evaluate_if(labeling, early_stop_infeasible, |_| true, |_| true)
    }

    // Same as `evaluate`, restricted to the factors and constraints accepted by the predicates
    pub fn evaluate_if<F, C>(
        &self,
        labeling: &[usize],
        early_stop_infeasible: bool,
        use_factor: F,
        use_constraint: C,
    ) -> SolutionValue
    where
        F: Fn(usize) -> bool,
        C: Fn(usize) -> bool,
    {
        let value =
            self.evaluate_unrounded_if(labeling, early_stop_infeasible, use_factor, use_constraint);
        self.apply_feasibility_limit(value)
    }

    // Raw energy and violation sums of a full labeling, the feasibility limit is not applied.
    // Partial sums like the constant returned by `bind` add up with these exactly.
    pub fn evaluate_unrounded(&self, labeling: &[usize]) -> SolutionValue {
        self.evaluate_unrounded_if(labeling, false, |_| true, |_| true)
    }

    fn evaluate_unrounded_if<F, C>(
        &self,
        labeling: &[usize],
        early_stop_infeasible: bool,
        use_factor: F,
        use_constraint: C,
    ) -> SolutionValue
    where
        F: Fn(usize) -> bool,
        C: Fn(usize) -> bool,
    {
        let mut local_labels = vec![0; self.max_arity()];

        let mut how_violated = 0.;
        for (index, constraint) in self.constraints.iter().enumerate() {
            if !use_constraint(index) {
                continue;
            }
            let local_labels = &mut local_labels[..constraint.arity()];
            constraint.map_from_model(labeling, local_labels);
            how_violated += self.constraint_functions[constraint.function_index()].value(local_labels);
            if early_stop_infeasible && how_violated >= self.feasibility_limit {
                return SolutionValue::infeasible_sentinel(how_violated);
            }
        }

        let mut energy = 0.;
        for (index, factor) in self.factors.iter().enumerate() {
            if !use_factor(index) {
                continue;
            }
            let local_labels = &mut local_labels[..factor.arity()];
            factor.map_from_model(labeling, local_labels);
            energy += self.energy_functions[factor.function_index()].value(local_labels);
        }

        SolutionValue::unrounded(energy, how_violated)
    }

    // Builds a value from raw sums, rounding near-feasible violation down to 0
    pub fn solution_value(&self, energy: f64, how_violated: f64) -> SolutionValue {
        if how_violated < self.feasibility_limit {
            SolutionValue::feasible(energy)
        } else {
            SolutionValue::with_limit(energy, how_violated, self.feasibility_limit)
        }
    }

    // Judges an aggregate of raw sums against the feasibility limit
    pub fn apply_feasibility_limit(&self, value: SolutionValue) -> SolutionValue {
        self.solution_value(value.energy(), value.how_violated())
    }

    // Reduces the model to the variables `v` with `mask[v] == include_mask`; every other variable
    // is fixed to its label in `labeling`.
    // Returns the reduced model, the map from old to new variable indices, and the raw sums
    // contributed by the factors and constraints whose variables are all fixed. The limit is not
    // applied to the constant: `apply_feasibility_limit(constant + reduced.evaluate_unrounded(x))`
    // equals `evaluate` of the full labeling.
    pub fn bind(
        &self,
        mask: &BitSlice,
        labeling: &[usize],
        include_mask: bool,
    ) -> Result<(Model, HashMap<usize, usize>, SolutionValue), ModelError> {
        debug!("In bind()");
        self.check_labeling(labeling)?;
        if mask.len() < self.num_variables() {
            return Err(ModelError::LabelingLength {
                expected: self.num_variables(),
                actual: mask.len(),
            });
        }

        let (space, old_to_new) = self.space.subspace(mask, include_mask);
        let mut reduced = Model::new(space);
        reduced.feasibility_limit = self.feasibility_limit;

        let mut constant_energy = 0.;
        let mut constant_violation = 0.;

        // Functions of terms without fixed variables are shared, like in the original model
        let mut kept_energy_functions: HashMap<usize, usize> = HashMap::new();
        for factor in &self.factors {
            let function = &self.energy_functions[factor.function_index()];
            match split_term(factor, &old_to_new, labeling) {
                BoundTerm::Free(variables) => {
                    let handle = *kept_energy_functions
                        .entry(factor.function_index())
                        .or_insert_with(|| reduced.add_energy_function(function.clone()));
                    reduced.add_factor(variables, handle)?;
                }
                BoundTerm::Fixed(labels) => constant_energy += function.value(&labels),
                BoundTerm::Partial {
                    variables,
                    fixed_axes,
                    fixed_labels,
                } => {
                    let handle =
                        reduced.add_energy_function(function.bind(&fixed_axes, &fixed_labels)?);
                    reduced.add_factor(variables, handle)?;
                }
            }
        }

        let mut kept_constraint_functions: HashMap<usize, usize> = HashMap::new();
        for constraint in &self.constraints {
            let function = &self.constraint_functions[constraint.function_index()];
            match split_term(constraint, &old_to_new, labeling) {
                BoundTerm::Free(variables) => {
                    let handle = *kept_constraint_functions
                        .entry(constraint.function_index())
                        .or_insert_with(|| reduced.add_constraint_function(function.clone()));
                    reduced.add_constraint(variables, handle)?;
                }
                BoundTerm::Fixed(labels) => constant_violation += function.value(&labels),
                BoundTerm::Partial {
                    variables,
                    fixed_axes,
                    fixed_labels,
                } => {
                    let handle = reduced
                        .add_constraint_function(function.bind(&fixed_axes, &fixed_labels)?);
                    reduced.add_constraint(variables, handle)?;
                }
            }
        }

        let constant = SolutionValue::unrounded(constant_energy, constant_violation);
        debug!(
            "Bound model has {} variables, {} factors, {} constraints, constant {}",
            reduced.num_variables(),
            reduced.num_factors(),
            reduced.num_constraints(),
            constant
        );
        Ok((reduced, old_to_new, constant))
    }

    // Bipartite graph between variables and the factors and constraints touching them.
    // Variable `v` is node `v`; factors follow, then constraints.
    pub fn factor_graph(&self) -> UnGraph<FactorGraphNode, ()> {
        let num_nodes = self.num_variables() + self.num_factors() + self.num_constraints();
        let num_edges = self
            .factors
            .iter()
            .chain(self.constraints.iter())
            .map(|term| term.arity())
            .sum();
        let mut graph = UnGraph::with_capacity(num_nodes, num_edges);

        let variable_nodes: Vec<_> = (0..self.num_variables())
            .map(|variable| graph.add_node(FactorGraphNode::Variable(variable)))
            .collect();
        for (index, factor) in self.factors.iter().enumerate() {
            let node = graph.add_node(FactorGraphNode::Factor(index));
            for &variable in factor.variables() {
                graph.add_edge(variable_nodes[variable], node, ());
            }
        }
        for (index, constraint) in self.constraints.iter().enumerate() {
            let node = graph.add_node(FactorGraphNode::Constraint(index));
            for &variable in constraint.variables() {
                graph.add_edge(variable_nodes[variable], node, ());
            }
        }
        graph
    }

    // True if the factor graph is a forest, in which case message passing is exact
    pub fn is_acyclic(&self) -> bool {
        !is_cyclic_undirected(&self.factor_graph())
    }

    pub fn indicator_variable_mapping(&self) -> IndicatorVariableMapping {
        IndicatorVariableMapping::new(&self.space)
    }
}

// How a term looks after fixing some variables
enum BoundTerm {
    Free(Vec<usize>), // reindexed variables, nothing fixed
    Fixed(Vec<usize>), // labels of all variables, everything fixed
    Partial {
        variables: Vec<usize>, // reindexed free variables
        fixed_axes: Vec<usize>,
        fixed_labels: Vec<usize>,
    },
}

fn split_term(term: &Term, old_to_new: &HashMap<usize, usize>, labeling: &[usize]) -> BoundTerm {
    let mut variables = Vec::with_capacity(term.arity());
    let mut fixed_axes = Vec::new();
    let mut fixed_labels = Vec::new();
    for (axis, &variable) in term.variables().iter().enumerate() {
        match old_to_new.get(&variable) {
            Some(&new_variable) => variables.push(new_variable),
            None => {
                fixed_axes.push(axis);
                fixed_labels.push(labeling[variable]);
            }
        }
    }

    if fixed_axes.is_empty() {
        BoundTerm::Free(variables)
    } else if variables.is_empty() {
        BoundTerm::Fixed(fixed_labels)
    } else {
        BoundTerm::Partial {
            variables,
            fixed_axes,
            fixed_labels,
        }
    }
}
