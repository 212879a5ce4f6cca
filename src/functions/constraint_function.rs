use ndarray::ArrayD;

use crate::gm::errors::ModelError;

use super::{
    array_constraint::ArrayConstraint, energy_function::validate_binding,
    function_trait::DiscreteFunction, label_count::LabelCount, unique_labels::UniqueLabels,
};

/// Constraint functions a model can hold. Values are "how violated", zero when satisfied.
#[derive(Debug)]
pub enum ConstraintFunction {
    Array(ArrayConstraint),
    UniqueLabels(UniqueLabels),
    LabelCount(LabelCount),
    Custom(Box<dyn DiscreteFunction>),
}

macro_rules! match_constraint_action {
    ($function:ident, $function_match:ident, $action:expr) => {
        match $function {
            ConstraintFunction::Array($function_match) => $action,
            ConstraintFunction::UniqueLabels($function_match) => $action,
            ConstraintFunction::LabelCount($function_match) => $action,
            ConstraintFunction::Custom($function_match) => $action,
        }
    };
}

impl ConstraintFunction {
    // Restriction to `fixed_labels` on `fixed_axes`, always an explicit table
    pub fn bind(
        &self,
        fixed_axes: &[usize],
        fixed_labels: &[usize],
    ) -> Result<ConstraintFunction, ModelError> {
        validate_binding(self, fixed_axes, fixed_labels)?;
        let violations = self.bind_values(fixed_axes, fixed_labels);
        Ok(ConstraintFunction::Array(ArrayConstraint::new(violations)?))
    }
}

impl Clone for ConstraintFunction {
    fn clone(&self) -> Self {
        match self {
            ConstraintFunction::Array(function) => ConstraintFunction::Array(function.clone()),
            ConstraintFunction::UniqueLabels(function) => {
                ConstraintFunction::UniqueLabels(function.clone())
            }
            ConstraintFunction::LabelCount(function) => {
                ConstraintFunction::LabelCount(function.clone())
            }
            ConstraintFunction::Custom(function) => {
                ConstraintFunction::Custom(function.clone_boxed())
            }
        }
    }
}

impl DiscreteFunction for ConstraintFunction {
    fn arity(&self) -> usize {
        match_constraint_action!(self, function, function.arity())
    }

    fn shape(&self, axis: usize) -> usize {
        match_constraint_action!(self, function, function.shape(axis))
    }

    fn size(&self) -> usize {
        match_constraint_action!(self, function, function.size())
    }

    fn value(&self, labels: &[usize]) -> f64 {
        match_constraint_action!(self, function, function.value(labels))
    }

    fn clone_boxed(&self) -> Box<dyn DiscreteFunction> {
        Box::new(self.clone())
    }

    fn copy_values(&self, buffer: &mut [f64]) {
        match_constraint_action!(self, function, function.copy_values(buffer))
    }

    fn add_values(&self, buffer: &mut [f64]) {
        match_constraint_action!(self, function, function.add_values(buffer))
    }

    fn bind_values(&self, fixed_axes: &[usize], fixed_labels: &[usize]) -> ArrayD<f64> {
        match_constraint_action!(self, function, function.bind_values(fixed_axes, fixed_labels))
    }

    fn compute_to_variable_messages(
        &self,
        in_messages: &[f64],
        out_messages: &mut [f64],
        scale: f64,
    ) {
        match_constraint_action!(
            self,
            function,
            function.compute_to_variable_messages(in_messages, out_messages, scale)
        )
    }
}

impl From<ArrayConstraint> for ConstraintFunction {
    fn from(function: ArrayConstraint) -> Self {
        ConstraintFunction::Array(function)
    }
}

impl From<UniqueLabels> for ConstraintFunction {
    fn from(function: UniqueLabels) -> Self {
        ConstraintFunction::UniqueLabels(function)
    }
}

impl From<LabelCount> for ConstraintFunction {
    fn from(function: LabelCount) -> Self {
        ConstraintFunction::LabelCount(function)
    }
}

impl From<Box<dyn DiscreteFunction>> for ConstraintFunction {
    fn from(function: Box<dyn DiscreteFunction>) -> Self {
        ConstraintFunction::Custom(function)
    }
}
