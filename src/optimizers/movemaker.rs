use bitvec::{bitvec, vec::BitVec};
use log::debug;

use crate::{
    data_structures::incidence::Incidence,
    functions::function_trait::DiscreteFunction,
    gm::{
        errors::ModelError, model::Model, solution::Solution, solution_value::SolutionValue,
    },
};

/// Chooses which factors and constraints a move maker sees.
pub trait TermFilter {
    fn use_factor(&self, factor: usize) -> bool;
    fn use_constraint(&self, constraint: usize) -> bool;
}

// Sees every factor and constraint
#[derive(Debug, Clone, Copy, Default)]
pub struct UseAll;

impl TermFilter for UseAll {
    fn use_factor(&self, _factor: usize) -> bool {
        true
    }

    fn use_constraint(&self, _constraint: usize) -> bool {
        true
    }
}

// Hides the marked factors and constraints
#[derive(Debug, Clone)]
pub struct HideTerms {
    hidden_factors: BitVec,
    hidden_constraints: BitVec,
}

impl HideTerms {
    pub fn new(model: &Model) -> Self {
        HideTerms {
            hidden_factors: bitvec![0; model.num_factors()],
            hidden_constraints: bitvec![0; model.num_constraints()],
        }
    }

    pub fn hide_factor(mut self, factor: usize) -> Result<Self, ModelError> {
        if factor >= self.hidden_factors.len() {
            return Err(ModelError::InvalidTerm {
                kind: "factor",
                index: factor,
                count: self.hidden_factors.len(),
            });
        }
        self.hidden_factors.set(factor, true);
        Ok(self)
    }

    pub fn hide_constraint(mut self, constraint: usize) -> Result<Self, ModelError> {
        if constraint >= self.hidden_constraints.len() {
            return Err(ModelError::InvalidTerm {
                kind: "constraint",
                index: constraint,
                count: self.hidden_constraints.len(),
            });
        }
        self.hidden_constraints.set(constraint, true);
        Ok(self)
    }
}

impl TermFilter for HideTerms {
    fn use_factor(&self, factor: usize) -> bool {
        !self.hidden_factors[factor]
    }

    fn use_constraint(&self, constraint: usize) -> bool {
        !self.hidden_constraints[constraint]
    }
}

pub type MoveMaker<'a> = FilteredMoveMaker<'a, UseAll>;

/// Incremental local search over single-variable moves.
///
/// Keeps a current labeling and its value. A move only looks at the factors and constraints
/// touching the moved variable, and the cached value is updated by difference, so that it
/// always equals a fresh evaluation of the visible factors and constraints.
#[derive(Debug)]
pub struct FilteredMoveMaker<'a, P: TermFilter> {
    model: &'a Model,
    filter: P,
    incidence: Incidence,
    solution: Solution,
    energy: f64,       // raw sum over visible factors
    how_violated: f64, // raw sum over visible constraints, never rounded
    local_labels: Vec<usize>,
    label_energies: Vec<f64>,
    label_violations: Vec<f64>,
}

impl<'a> MoveMaker<'a> {
    pub fn new(model: &'a Model) -> Self {
        FilteredMoveMaker::with_filter(model, UseAll)
    }
}

impl<'a, P: TermFilter> FilteredMoveMaker<'a, P> {
    // Starts at the all-zero labeling
    pub fn with_filter(model: &'a Model, filter: P) -> Self {
        debug!("In FilteredMoveMaker::with_filter()");
        let incidence = Incidence::filtered(
            model,
            |factor| filter.use_factor(factor),
            |constraint| filter.use_constraint(constraint),
        );
        let max_num_labels = model.space().max_num_labels();
        let mut movemaker = FilteredMoveMaker {
            model,
            filter,
            incidence,
            solution: Solution::zeros(model.num_variables()),
            energy: 0.,
            how_violated: 0.,
            local_labels: vec![0; model.max_arity()],
            label_energies: vec![0.; max_num_labels],
            label_violations: vec![0.; max_num_labels],
        };
        movemaker.recompute_value();
        movemaker
    }

    pub fn model(&self) -> &'a Model {
        self.model
    }

    pub fn solution(&self) -> &Solution {
        &self.solution
    }

    pub fn solution_value(&self) -> SolutionValue {
        self.model.solution_value(self.energy, self.how_violated)
    }

    // Replaces the current labeling and evaluates it from scratch
    pub fn set_solution(&mut self, labeling: &[usize]) -> Result<(), ModelError> {
        self.model.check_labeling(labeling)?;
        self.solution.assign(labeling);
        self.recompute_value();
        Ok(())
    }

    pub fn factors_of_variables(&self) -> &[Vec<usize>] {
        self.incidence.factors_of_variables()
    }

    pub fn constraints_of_variables(&self) -> &[Vec<usize>] {
        self.incidence.constraints_of_variables()
    }

    // Variables sharing a visible factor or constraint with `variable`
    pub fn neighbours(&self, variable: usize) -> &[usize] {
        self.incidence.neighbours(variable)
    }

    // Value of the current labeling on the visible factors and constraints, from scratch
    pub fn evaluate_current(&self) -> SolutionValue {
        self.model.evaluate_if(
            self.solution.as_slice(),
            false,
            |factor| self.filter.use_factor(factor),
            |constraint| self.filter.use_constraint(constraint),
        )
    }

    // Checks the cached value against a fresh evaluation, relative to the magnitude of the values
    pub fn is_consistent(&self, tolerance: f64) -> bool {
        let cached = self.solution_value();
        let fresh = self.evaluate_current();
        let scale = 1f64.max(fresh.energy().abs()).max(fresh.how_violated().abs());
        cached.approx_eq(&fresh, tolerance * scale)
    }

    fn recompute_value(&mut self) {
        let labeling = self.solution.as_slice();
        let mut energy = 0.;
        let mut how_violated = 0.;
        for (index, factor) in self.model.factors().iter().enumerate() {
            if self.filter.use_factor(index) {
                let local_labels = &mut self.local_labels[..factor.arity()];
                factor.map_from_model(labeling, local_labels);
                energy += self.model.factor_function(index).value(local_labels);
            }
        }
        for (index, constraint) in self.model.constraints().iter().enumerate() {
            if self.filter.use_constraint(index) {
                let local_labels = &mut self.local_labels[..constraint.arity()];
                constraint.map_from_model(labeling, local_labels);
                how_violated += self.model.constraint_function(index).value(local_labels);
            }
        }
        self.energy = energy;
        self.how_violated = how_violated;
    }

    // Moves `variable` to the label minimizing the value of the visible model, the first such
    // label on ties. Returns true if the label changed.
    pub fn move_optimal(&mut self, variable: usize) -> bool {
        let num_labels = self.model.num_labels(variable);
        let current_label = self.solution[variable];
        let labeling = self.solution.as_slice();

        let label_energies = &mut self.label_energies[..num_labels];
        let label_violations = &mut self.label_violations[..num_labels];
        label_energies.fill(0.);
        label_violations.fill(0.);

        for &index in self.incidence.factors_of(variable) {
            let factor = &self.model.factors()[index];
            let function = self.model.factor_function(index);
            let local_labels = &mut self.local_labels[..factor.arity()];
            factor.map_from_model(labeling, local_labels);
            if let Some(position) = factor.variable_position(variable) {
                for (label, energy) in label_energies.iter_mut().enumerate() {
                    local_labels[position] = label;
                    *energy += function.value(local_labels);
                }
            }
        }
        for &index in self.incidence.constraints_of(variable) {
            let constraint = &self.model.constraints()[index];
            let function = self.model.constraint_function(index);
            let local_labels = &mut self.local_labels[..constraint.arity()];
            constraint.map_from_model(labeling, local_labels);
            if let Some(position) = constraint.variable_position(variable) {
                for (label, how_violated) in label_violations.iter_mut().enumerate() {
                    local_labels[position] = label;
                    *how_violated += function.value(local_labels);
                }
            }
        }

        // Candidates are ranked by the value of the whole labeling after the move
        let mut other_violation = self.how_violated - label_violations[current_label];
        if !other_violation.is_finite() {
            other_violation = 0.;
            for (index, constraint) in self.model.constraints().iter().enumerate() {
                if !self.filter.use_constraint(index)
                    || constraint.variable_position(variable).is_some()
                {
                    continue;
                }
                let local_labels = &mut self.local_labels[..constraint.arity()];
                constraint.map_from_model(labeling, local_labels);
                other_violation += self.model.constraint_function(index).value(local_labels);
            }
        }

        // The energy of the other factors shifts every candidate alike and is left out
        let model = self.model;
        let candidate = |label: usize| {
            model.solution_value(label_energies[label], other_violation + label_violations[label])
        };
        let mut best_label = 0;
        let mut best_value = candidate(0);
        for label in 1..num_labels {
            let value = candidate(label);
            if value < best_value {
                best_label = label;
                best_value = value;
            }
        }

        if best_label == current_label {
            return false;
        }

        let old_energy = label_energies[current_label];
        let new_energy = label_energies[best_label];
        let old_violation = label_violations[current_label];
        let new_violation = label_violations[best_label];
        self.solution[variable] = best_label;

        if old_energy.is_finite() && self.energy.is_finite() && old_violation.is_finite() {
            self.energy += new_energy - old_energy;
            self.how_violated += new_violation - old_violation;
        } else {
            // Differences of infinite values are undefined
            self.recompute_value();
        }
        debug_assert!(
            self.is_consistent(1e-6),
            "cached value {} drifted from {}",
            self.solution_value(),
            self.evaluate_current()
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        functions::{dense::DenseFunction, potts::Potts, unique_labels::UniqueLabels},
        spaces::label_space::LabelSpace,
    };

    use super::*;

    fn chain() -> Model {
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

    #[test]
    fn moves_update_the_cached_value() {
        let model = chain();
        let mut movemaker = MoveMaker::new(&model);
        movemaker.set_solution(&[1, 1, 1, 1, 1]).unwrap();
        assert_eq!(movemaker.solution_value().energy(), 5.);

        // flipping an end of the chain saves 1 on the unary and pays 1 on the Potts term
        assert!(movemaker.move_optimal(0));
        assert_eq!(movemaker.solution().as_slice(), &[0, 1, 1, 1, 1]);
        assert_eq!(movemaker.solution_value().energy(), 5.);

        assert!(movemaker.move_optimal(1));
        assert_eq!(movemaker.solution_value().energy(), 4.);
        assert!(movemaker.is_consistent(1e-9));
        assert!(!movemaker.move_optimal(0));
    }

    #[test]
    fn invalid_starting_labelings_are_rejected() {
        let model = chain();
        let mut movemaker = MoveMaker::new(&model);
        assert!(movemaker.set_solution(&[0, 0]).is_err());
        assert!(movemaker.set_solution(&[0, 0, 2, 0, 0]).is_err());
        assert_eq!(movemaker.solution().as_slice(), &[0, 0, 0, 0, 0]);
    }

    #[test]
    fn hidden_constraints_are_ignored_everywhere() {
        let mut model = chain();
        let unique = model.add_constraint_function(UniqueLabels::new(2, 2).unwrap());
        let constraint = model.add_constraint(vec![0, 4], unique).unwrap();

        let filter = HideTerms::new(&model).hide_constraint(constraint).unwrap();
        let mut movemaker = FilteredMoveMaker::with_filter(&model, filter);
        assert!(movemaker.solution_value().is_feasible());
        assert!(movemaker.constraints_of_variables().iter().all(|c| c.is_empty()));
        assert_eq!(movemaker.neighbours(0), &[1]);
        for variable in 0..5 {
            assert!(!movemaker.move_optimal(variable));
        }

        // the full move maker sees the violated constraint
        let full = MoveMaker::new(&model);
        assert!(!full.solution_value().is_feasible());
        assert_eq!(full.neighbours(0), &[1, 4]);
    }

    #[test]
    fn hiding_unknown_terms_is_an_error() {
        let model = chain();
        assert_eq!(
            HideTerms::new(&model).hide_factor(9).err(),
            Some(ModelError::InvalidTerm {
                kind: "factor",
                index: 9,
                count: 9
            })
        );
        assert!(HideTerms::new(&model).hide_constraint(0).is_err());
        assert!(HideTerms::new(&model).hide_factor(8).is_ok());
    }
}
