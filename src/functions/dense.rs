use ndarray::{ArrayD, Axis, IxDyn};

use crate::gm::errors::ModelError;

use super::function_trait::DiscreteFunction;

/// Explicit table of costs, one entry per label combination.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseFunction {
    values: ArrayD<f64>,
}

impl DenseFunction {
    pub fn new(values: ArrayD<f64>) -> Self {
        DenseFunction { values }
    }

    // Creates a table from its shape and its values in row-major order
    pub fn from_shape_vec(shape: &[usize], values: Vec<f64>) -> Result<Self, ModelError> {
        Ok(DenseFunction {
            values: ArrayD::from_shape_vec(IxDyn(shape), values)?,
        })
    }

    // Creates a unary table, one cost per label
    pub fn unary(costs: Vec<f64>) -> Self {
        let num_labels = costs.len();
        DenseFunction {
            values: ArrayD::from_shape_vec(IxDyn(&[num_labels]), costs)
                .unwrap_or_else(|_| ArrayD::zeros(IxDyn(&[num_labels]))),
        }
    }

    pub fn values(&self) -> &ArrayD<f64> {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut ArrayD<f64> {
        &mut self.values
    }

    // Slices the table instead of enumerating it
    pub(crate) fn bind_table(
        table: &ArrayD<f64>,
        fixed_axes: &[usize],
        fixed_labels: &[usize],
    ) -> ArrayD<f64> {
        let mut fixed: Vec<(usize, usize)> = fixed_axes
            .iter()
            .copied()
            .zip(fixed_labels.iter().copied())
            .collect();
        // Removing the highest axis first keeps the lower axis numbers valid
        fixed.sort_unstable_by(|a, b| b.0.cmp(&a.0));

        let mut bound = table.clone();
        for (axis, label) in fixed {
            bound = bound.index_axis_move(Axis(axis), label);
        }
        bound
    }
}

impl DiscreteFunction for DenseFunction {
    fn arity(&self) -> usize {
        self.values.ndim()
    }

    fn shape(&self, axis: usize) -> usize {
        self.values.shape()[axis]
    }

    fn size(&self) -> usize {
        self.values.len()
    }

    fn value(&self, labels: &[usize]) -> f64 {
        self.values[labels]
    }

    fn clone_boxed(&self) -> Box<dyn DiscreteFunction> {
        Box::new(self.clone())
    }

    fn copy_values(&self, buffer: &mut [f64]) {
        for (out, &value) in buffer.iter_mut().zip(self.values.iter()) {
            *out = value;
        }
    }

    fn add_values(&self, buffer: &mut [f64]) {
        for (out, &value) in buffer.iter_mut().zip(self.values.iter()) {
            *out += value;
        }
    }

    fn bind_values(&self, fixed_axes: &[usize], fixed_labels: &[usize]) -> ArrayD<f64> {
        Self::bind_table(&self.values, fixed_axes, fixed_labels)
    }
}
