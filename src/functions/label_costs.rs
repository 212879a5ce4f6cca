use std::sync::Mutex;

use bitvec::{bitvec, vec::BitVec};

use super::function_trait::DiscreteFunction;

/// Pays the cost of every label used at least once among its variables, each label only once.
///
/// Evaluation marks the used labels in a scratch bitmap owned by the function. The bitmap is the
/// only mutable state of any function in this crate and is guarded by a lock, so one instance
/// can be shared by many factors and evaluated from several threads.
#[derive(Debug)]
pub struct LabelCosts {
    arity: usize,
    costs: Vec<f64>, // indexed by labels
    used: Mutex<BitVec>,
}

impl LabelCosts {
    pub fn new(arity: usize, costs: Vec<f64>) -> Self {
        let num_labels = costs.len();
        LabelCosts {
            arity,
            costs,
            used: Mutex::new(bitvec![0; num_labels]),
        }
    }

    pub fn num_labels(&self) -> usize {
        self.costs.len()
    }

    pub fn costs(&self) -> &[f64] {
        &self.costs
    }
}

impl Clone for LabelCosts {
    // The clone gets its own scratch bitmap
    fn clone(&self) -> Self {
        LabelCosts::new(self.arity, self.costs.clone())
    }
}

impl PartialEq for LabelCosts {
    fn eq(&self, other: &Self) -> bool {
        self.arity == other.arity && self.costs == other.costs
    }
}

impl DiscreteFunction for LabelCosts {
    fn arity(&self) -> usize {
        self.arity
    }

    fn shape(&self, _axis: usize) -> usize {
        self.costs.len()
    }

    fn value(&self, labels: &[usize]) -> f64 {
        // The bitmap is cleared on every call, so a poisoned lock is still usable
        let mut used = self.used.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        used.fill(false);

        let mut cost = 0.;
        for &label in labels {
            if !used[label] {
                used.set(label, true);
                cost += self.costs[label];
            }
        }
        cost
    }

    fn clone_boxed(&self) -> Box<dyn DiscreteFunction> {
        Box::new(self.clone())
    }
}
