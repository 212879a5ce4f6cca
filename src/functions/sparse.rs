use std::collections::BTreeMap;

use crate::gm::errors::ModelError;

use super::{
    function_trait::DiscreteFunction,
    nested_loops::{flat_index, labels_from_flat_index},
};

/// Function that is zero everywhere except at explicitly set label combinations.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseFunction {
    shape: Vec<usize>,
    entries: BTreeMap<usize, f64>, // row-major flat index -> value
}

impl SparseFunction {
    pub fn new(shape: Vec<usize>) -> Self {
        SparseFunction {
            shape,
            entries: BTreeMap::new(),
        }
    }

    // Sets the value of one full label combination
    pub fn set(&mut self, labels: &[usize], value: f64) -> Result<(), ModelError> {
        if labels.len() != self.shape.len() {
            return Err(ModelError::LabelingLength {
                expected: self.shape.len(),
                actual: labels.len(),
            });
        }
        for (axis, (&label, &num_labels)) in labels.iter().zip(self.shape.iter()).enumerate() {
            if label >= num_labels {
                return Err(ModelError::LabelOutOfRange {
                    variable: axis,
                    label,
                    num_labels,
                });
            }
        }
        self.entries.insert(flat_index(&self.shape, labels), value);
        Ok(())
    }

    pub fn num_entries(&self) -> usize {
        self.entries.len()
    }

    // Iterates over the explicitly set entries as (labels, value), in row-major order
    pub fn entries(&self) -> impl Iterator<Item = (Vec<usize>, f64)> + '_ {
        self.entries.iter().map(|(&index, &value)| {
            let mut labels = vec![0; self.shape.len()];
            labels_from_flat_index(&self.shape, index, &mut labels);
            (labels, value)
        })
    }

    // Restriction to the given labels on the given axes, still sparse
    // Assumption: axes are distinct and in range, labels are in range
    pub fn bind(&self, fixed_axes: &[usize], fixed_labels: &[usize]) -> SparseFunction {
        let free_axes: Vec<usize> = (0..self.shape.len())
            .filter(|axis| !fixed_axes.contains(axis))
            .collect();
        let free_shape: Vec<usize> = free_axes.iter().map(|&axis| self.shape[axis]).collect();

        let mut bound = SparseFunction::new(free_shape);
        let mut free_labels = vec![0; free_axes.len()];
        for (labels, value) in self.entries() {
            let matches = fixed_axes
                .iter()
                .zip(fixed_labels.iter())
                .all(|(&axis, &label)| labels[axis] == label);
            if !matches {
                continue;
            }
            for (free_label, &axis) in free_labels.iter_mut().zip(free_axes.iter()) {
                *free_label = labels[axis];
            }
            bound
                .entries
                .insert(flat_index(&bound.shape, &free_labels), value);
        }
        bound
    }
}

impl DiscreteFunction for SparseFunction {
    fn arity(&self) -> usize {
        self.shape.len()
    }

    fn shape(&self, axis: usize) -> usize {
        self.shape[axis]
    }

    fn value(&self, labels: &[usize]) -> f64 {
        self.entries
            .get(&flat_index(&self.shape, labels))
            .copied()
            .unwrap_or(0.)
    }

    fn clone_boxed(&self) -> Box<dyn DiscreteFunction> {
        Box::new(self.clone())
    }

    fn copy_values(&self, buffer: &mut [f64]) {
        buffer[..self.size()].fill(0.);
        self.add_values(buffer);
    }

    fn add_values(&self, buffer: &mut [f64]) {
        for (&index, &value) in &self.entries {
            buffer[index] += value;
        }
    }
}
