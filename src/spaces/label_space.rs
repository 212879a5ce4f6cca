use std::collections::HashMap;

use bitvec::slice::BitSlice;

use crate::{functions::nested_loops::exitable_for_each_labeling, gm::errors::ModelError};

/// Number of labels of every variable of a model.
///
/// A "simple" space stores one label count shared by all variables, a general space stores one
/// count per variable. Both answer `num_labels(variable)` the same way, and every count is at least 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSpace {
    num_labels: Vec<usize>, // a single entry when the space is simple
    num_variables: usize,
    is_simple: bool,
}

impl LabelSpace {
    // Creates a space where every variable has the same number of labels
    pub fn simple(num_variables: usize, num_labels: usize) -> Result<Self, ModelError> {
        if num_labels == 0 && num_variables > 0 {
            return Err(ModelError::EmptyLabelSet(0));
        }
        Ok(LabelSpace {
            num_labels: vec![num_labels],
            num_variables,
            is_simple: true,
        })
    }

    // Creates a space with an individual number of labels per variable
    pub fn from_num_labels(num_labels: Vec<usize>) -> Result<Self, ModelError> {
        if let Some(variable) = num_labels.iter().position(|&n| n == 0) {
            return Err(ModelError::EmptyLabelSet(variable));
        }
        Ok(LabelSpace {
            num_variables: num_labels.len(),
            num_labels,
            is_simple: false,
        })
    }

    pub fn num_variables(&self) -> usize {
        self.num_variables
    }

    pub fn num_labels(&self, variable: usize) -> usize {
        if self.is_simple {
            self.num_labels[0]
        } else {
            self.num_labels[variable]
        }
    }

    pub fn is_simple(&self) -> bool {
        self.is_simple
    }

    pub fn max_num_labels(&self) -> usize {
        if self.num_variables == 0 {
            return 0;
        }
        self.num_labels.iter().copied().max().unwrap_or(0)
    }

    // Returns the label count of every variable
    pub fn label_counts(&self) -> Vec<usize> {
        (0..self.num_variables)
            .map(|variable| self.num_labels(variable))
            .collect()
    }

    // Product of the label counts of the given variables
    pub fn shape_product(&self, variables: &[usize]) -> usize {
        variables
            .iter()
            .map(|&variable| self.num_labels(variable))
            .product()
    }

    // Keeps the variables whose mask bit equals `include_mask`,
    // returns the reduced space and a map from old to new variable indices
    pub fn subspace(
        &self,
        mask: &BitSlice,
        include_mask: bool,
    ) -> (LabelSpace, HashMap<usize, usize>) {
        let mut old_to_new = HashMap::new();
        let mut kept_num_labels = Vec::new();
        for variable in 0..self.num_variables {
            if mask[variable] == include_mask {
                old_to_new.insert(variable, kept_num_labels.len());
                kept_num_labels.push(self.num_labels(variable));
            }
        }

        let subspace = if self.is_simple {
            LabelSpace {
                num_labels: vec![self.num_labels[0]],
                num_variables: kept_num_labels.len(),
                is_simple: true,
            }
        } else {
            LabelSpace {
                num_variables: kept_num_labels.len(),
                num_labels: kept_num_labels,
                is_simple: false,
            }
        };
        (subspace, old_to_new)
    }

    // Enumerates every full labeling (last variable fastest) until `f` returns false.
    // Returns true if all labelings were visited.
    pub fn exitable_for_each_labeling<F>(&self, labeling: &mut [usize], f: F) -> bool
    where
        F: FnMut(&[usize]) -> bool,
    {
        let shape = self.label_counts();
        exitable_for_each_labeling(&shape, labeling, f)
    }

    // Number of full labelings, saturating at usize::MAX
    pub fn num_labelings(&self) -> usize {
        (0..self.num_variables).fold(1usize, |count, variable| {
            count.saturating_mul(self.num_labels(variable))
        })
    }
}

/// One indicator per (variable, label) pair, laid out variable by variable.
///
/// This is the variable layout expected by linear-program based optimizers.
#[derive(Debug, Clone)]
pub struct IndicatorVariableMapping {
    is_simple: bool,
    mapping: Vec<usize>, // the shared label count when simple, otherwise per-variable offsets
    num_indicator_variables: usize,
}

impl IndicatorVariableMapping {
    pub fn new(space: &LabelSpace) -> Self {
        if space.is_simple() {
            let num_labels = space.num_labels(0);
            IndicatorVariableMapping {
                is_simple: true,
                mapping: vec![num_labels],
                num_indicator_variables: space.num_variables() * num_labels,
            }
        } else {
            let mut mapping = Vec::with_capacity(space.num_variables());
            let mut offset = 0;
            for variable in 0..space.num_variables() {
                mapping.push(offset);
                offset += space.num_labels(variable);
            }
            IndicatorVariableMapping {
                is_simple: false,
                mapping,
                num_indicator_variables: offset,
            }
        }
    }

    // Index of the indicator of label 0 of `variable`
    pub fn first_indicator(&self, variable: usize) -> usize {
        if self.is_simple {
            variable * self.mapping[0]
        } else {
            self.mapping[variable]
        }
    }

    // Index of the indicator of (`variable`, `label`)
    pub fn indicator(&self, variable: usize, label: usize) -> usize {
        self.first_indicator(variable) + label
    }

    pub fn num_indicator_variables(&self) -> usize {
        self.num_indicator_variables
    }
}

#[cfg(test)]
mod tests {
    use bitvec::prelude::*;

    use super::*;

    #[test]
    fn simple_and_general_spaces_answer_alike() {
        let simple = LabelSpace::simple(3, 4).unwrap();
        let general = LabelSpace::from_num_labels(vec![4, 4, 4]).unwrap();
        for variable in 0..3 {
            assert_eq!(simple.num_labels(variable), general.num_labels(variable));
        }
        assert_eq!(simple.max_num_labels(), 4);
        assert_eq!(simple.num_labelings(), 64);
    }

    #[test]
    fn empty_label_sets_are_rejected() {
        assert_eq!(
            LabelSpace::from_num_labels(vec![2, 0, 3]),
            Err(ModelError::EmptyLabelSet(1))
        );
        assert!(LabelSpace::simple(2, 0).is_err());
    }

    #[test]
    fn subspace_keeps_selected_variables() {
        let space = LabelSpace::from_num_labels(vec![2, 3, 4, 5]).unwrap();
        let mask = bitvec![0, 1, 0, 1];
        let (sub, map) = space.subspace(&mask, true);
        assert_eq!(sub.num_variables(), 2);
        assert_eq!(sub.num_labels(0), 3);
        assert_eq!(sub.num_labels(1), 5);
        assert_eq!(map[&1], 0);
        assert_eq!(map[&3], 1);
        assert!(!map.contains_key(&0));

        let (complement, _) = space.subspace(&mask, false);
        assert_eq!(complement.label_counts(), vec![2, 4]);
    }

    #[test]
    fn indicator_mapping_offsets() {
        let simple = IndicatorVariableMapping::new(&LabelSpace::simple(3, 4).unwrap());
        assert_eq!(simple.indicator(2, 1), 9);
        assert_eq!(simple.num_indicator_variables(), 12);

        let general =
            IndicatorVariableMapping::new(&LabelSpace::from_num_labels(vec![2, 3, 4]).unwrap());
        assert_eq!(general.first_indicator(2), 5);
        assert_eq!(general.indicator(1, 2), 4);
        assert_eq!(general.num_indicator_variables(), 9);
    }

    #[test]
    fn enumerates_every_labeling() {
        let space = LabelSpace::from_num_labels(vec![2, 3]).unwrap();
        let mut labeling = vec![0; 2];
        let mut count = 0;
        assert!(space.exitable_for_each_labeling(&mut labeling, |_| {
            count += 1;
            true
        }));
        assert_eq!(count, 6);
    }
}
