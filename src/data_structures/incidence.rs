use log::debug;

use crate::gm::model::Model;

/// For every variable, the factors and constraints touching it.
///
/// Variables play the role of nodes and factors/constraints the role of hyperedges.
/// Built once from a model, optionally hiding some factors or constraints; every query
/// (degrees, adjacency, neighbours) sees the same filtered view.
#[derive(Debug, Clone)]
pub struct Incidence {
    factors_of_variables: Vec<Vec<usize>>,
    constraints_of_variables: Vec<Vec<usize>>,
    neighbours: Vec<Vec<usize>>, // sorted, without the variable itself
}

impl Incidence {
    pub fn new(model: &Model) -> Self {
        Self::filtered(model, |_| true, |_| true)
    }

    // Keeps only the factors and constraints accepted by the predicates
    pub fn filtered<F, C>(model: &Model, use_factor: F, use_constraint: C) -> Self
    where
        F: Fn(usize) -> bool,
        C: Fn(usize) -> bool,
    {
        debug!("In Incidence::filtered()");
        let num_variables = model.num_variables();
        let mut factors_of_variables = vec![Vec::new(); num_variables];
        let mut constraints_of_variables = vec![Vec::new(); num_variables];
        let mut neighbours = vec![Vec::new(); num_variables];

        for (index, factor) in model.factors().iter().enumerate() {
            if !use_factor(index) {
                continue;
            }
            for &variable in factor.variables() {
                factors_of_variables[variable].push(index);
                neighbours[variable].extend(factor.variables().iter().copied());
            }
        }
        for (index, constraint) in model.constraints().iter().enumerate() {
            if !use_constraint(index) {
                continue;
            }
            for &variable in constraint.variables() {
                constraints_of_variables[variable].push(index);
                neighbours[variable].extend(constraint.variables().iter().copied());
            }
        }

        for (variable, adjacent) in neighbours.iter_mut().enumerate() {
            adjacent.sort_unstable();
            adjacent.dedup();
            adjacent.retain(|&other| other != variable);
        }

        Incidence {
            factors_of_variables,
            constraints_of_variables,
            neighbours,
        }
    }

    pub fn num_variables(&self) -> usize {
        self.factors_of_variables.len()
    }

    pub fn factors_of(&self, variable: usize) -> &[usize] {
        &self.factors_of_variables[variable]
    }

    pub fn constraints_of(&self, variable: usize) -> &[usize] {
        &self.constraints_of_variables[variable]
    }

    pub fn factors_of_variables(&self) -> &[Vec<usize>] {
        &self.factors_of_variables
    }

    pub fn constraints_of_variables(&self) -> &[Vec<usize>] {
        &self.constraints_of_variables
    }

    // Number of visible factors and constraints touching `variable`
    pub fn degree(&self, variable: usize) -> usize {
        self.factors_of_variables[variable].len() + self.constraints_of_variables[variable].len()
    }

    // Variables sharing a visible factor or constraint with `variable`
    pub fn neighbours(&self, variable: usize) -> &[usize] {
        &self.neighbours[variable]
    }
}
