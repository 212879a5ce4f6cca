use ndarray::{ArrayD, IxDyn};

use crate::gm::errors::ModelError;

use super::{dense::DenseFunction, function_trait::DiscreteFunction};

/// Constraint given by an explicit table of "how violated" values, one per label combination.
///
/// Values are non-negative; zero means the combination is allowed.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayConstraint {
    violations: ArrayD<f64>,
}

impl ArrayConstraint {
    pub fn new(violations: ArrayD<f64>) -> Result<Self, ModelError> {
        if let Some(value) = violations.iter().find(|&&value| !(value >= 0.)) {
            return Err(ModelError::InvalidFunctionDefinition(format!(
                "constraint violations must be non-negative, found {value}"
            )));
        }
        Ok(ArrayConstraint { violations })
    }

    pub fn from_shape_vec(shape: &[usize], violations: Vec<f64>) -> Result<Self, ModelError> {
        Self::new(ArrayD::from_shape_vec(IxDyn(shape), violations)?)
    }

    // Violation 1 for every listed forbidden combination, 0 elsewhere
    pub fn forbidding(shape: &[usize], forbidden: &[Vec<usize>]) -> Result<Self, ModelError> {
        let mut violations = ArrayD::zeros(IxDyn(shape));
        for labels in forbidden {
            let entry = violations.get_mut(labels.as_slice()).ok_or_else(|| {
                ModelError::InvalidFunctionDefinition(format!(
                    "forbidden combination {labels:?} does not fit shape {shape:?}"
                ))
            })?;
            *entry = 1.;
        }
        Ok(ArrayConstraint { violations })
    }

    pub fn violations(&self) -> &ArrayD<f64> {
        &self.violations
    }
}

impl DiscreteFunction for ArrayConstraint {
    fn arity(&self) -> usize {
        self.violations.ndim()
    }

    fn shape(&self, axis: usize) -> usize {
        self.violations.shape()[axis]
    }

    fn size(&self) -> usize {
        self.violations.len()
    }

    fn value(&self, labels: &[usize]) -> f64 {
        self.violations[labels]
    }

    fn clone_boxed(&self) -> Box<dyn DiscreteFunction> {
        Box::new(self.clone())
    }

    fn copy_values(&self, buffer: &mut [f64]) {
        for (out, &value) in buffer.iter_mut().zip(self.violations.iter()) {
            *out = value;
        }
    }

    fn add_values(&self, buffer: &mut [f64]) {
        for (out, &value) in buffer.iter_mut().zip(self.violations.iter()) {
            *out += value;
        }
    }

    fn bind_values(&self, fixed_axes: &[usize], fixed_labels: &[usize]) -> ArrayD<f64> {
        DenseFunction::bind_table(&self.violations, fixed_axes, fixed_labels)
    }
}
