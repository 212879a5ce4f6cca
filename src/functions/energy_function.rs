use ndarray::ArrayD;

use crate::gm::errors::ModelError;

use super::{
    dense::DenseFunction, function_trait::DiscreteFunction, label_costs::LabelCosts,
    potts::Potts, sparse::SparseFunction,
};

/// Energy functions a model can hold.
///
/// `Custom` wraps any externally defined function; it gets every bulk operation
/// from the `DiscreteFunction` defaults.
#[derive(Debug)]
pub enum EnergyFunction {
    Dense(DenseFunction),
    Potts(Potts),
    LabelCosts(LabelCosts),
    Sparse(SparseFunction),
    Custom(Box<dyn DiscreteFunction>),
}

macro_rules! match_function_action {
    ($function:ident, $function_match:ident, $action:expr) => {
        match $function {
            EnergyFunction::Dense($function_match) => $action,
            EnergyFunction::Potts($function_match) => $action,
            EnergyFunction::LabelCosts($function_match) => $action,
            EnergyFunction::Sparse($function_match) => $action,
            EnergyFunction::Custom($function_match) => $action,
        }
    };
}

impl EnergyFunction {
    // Restriction of this function to `fixed_labels` on `fixed_axes`,
    // the remaining axes keep their relative order
    pub fn bind(
        &self,
        fixed_axes: &[usize],
        fixed_labels: &[usize],
    ) -> Result<EnergyFunction, ModelError> {
        validate_binding(self, fixed_axes, fixed_labels)?;
        Ok(match self {
            EnergyFunction::Sparse(sparse) => {
                EnergyFunction::Sparse(sparse.bind(fixed_axes, fixed_labels))
            }
            _ => EnergyFunction::Dense(DenseFunction::new(
                self.bind_values(fixed_axes, fixed_labels),
            )),
        })
    }

    // Dense table of all values
    pub fn to_array(&self) -> ArrayD<f64> {
        self.bind_values(&[], &[])
    }
}

// Checks that axes are distinct and in range and that labels fit their axes
pub(crate) fn validate_binding<F: DiscreteFunction + ?Sized>(
    function: &F,
    fixed_axes: &[usize],
    fixed_labels: &[usize],
) -> Result<(), ModelError> {
    if fixed_axes.len() != fixed_labels.len() {
        return Err(ModelError::LabelingLength {
            expected: fixed_axes.len(),
            actual: fixed_labels.len(),
        });
    }
    let arity = function.arity();
    for (i, (&axis, &label)) in fixed_axes.iter().zip(fixed_labels.iter()).enumerate() {
        if axis >= arity {
            return Err(ModelError::InvalidVariable {
                variable: axis,
                num_variables: arity,
            });
        }
        if fixed_axes[..i].contains(&axis) {
            return Err(ModelError::DuplicateVariable(axis));
        }
        if label >= function.shape(axis) {
            return Err(ModelError::LabelOutOfRange {
                variable: axis,
                label,
                num_labels: function.shape(axis),
            });
        }
    }
    Ok(())
}

impl Clone for EnergyFunction {
    fn clone(&self) -> Self {
        match self {
            EnergyFunction::Dense(function) => EnergyFunction::Dense(function.clone()),
            EnergyFunction::Potts(function) => EnergyFunction::Potts(function.clone()),
            EnergyFunction::LabelCosts(function) => EnergyFunction::LabelCosts(function.clone()),
            EnergyFunction::Sparse(function) => EnergyFunction::Sparse(function.clone()),
            EnergyFunction::Custom(function) => EnergyFunction::Custom(function.clone_boxed()),
        }
    }
}

impl DiscreteFunction for EnergyFunction {
    fn arity(&self) -> usize {
        match_function_action!(self, function, function.arity())
    }

    fn shape(&self, axis: usize) -> usize {
        match_function_action!(self, function, function.shape(axis))
    }

    fn size(&self) -> usize {
        match_function_action!(self, function, function.size())
    }

    fn value(&self, labels: &[usize]) -> f64 {
        match_function_action!(self, function, function.value(labels))
    }

    fn clone_boxed(&self) -> Box<dyn DiscreteFunction> {
        Box::new(self.clone())
    }

    fn copy_values(&self, buffer: &mut [f64]) {
        match_function_action!(self, function, function.copy_values(buffer))
    }

    fn add_values(&self, buffer: &mut [f64]) {
        match_function_action!(self, function, function.add_values(buffer))
    }

    fn bind_values(&self, fixed_axes: &[usize], fixed_labels: &[usize]) -> ArrayD<f64> {
        match_function_action!(self, function, function.bind_values(fixed_axes, fixed_labels))
    }

    fn compute_to_variable_messages(
        &self,
        in_messages: &[f64],
        out_messages: &mut [f64],
        scale: f64,
    ) {
        match_function_action!(
            self,
            function,
            function.compute_to_variable_messages(in_messages, out_messages, scale)
        )
    }
}

impl From<DenseFunction> for EnergyFunction {
    fn from(function: DenseFunction) -> Self {
        EnergyFunction::Dense(function)
    }
}

impl From<Potts> for EnergyFunction {
    fn from(function: Potts) -> Self {
        EnergyFunction::Potts(function)
    }
}

impl From<LabelCosts> for EnergyFunction {
    fn from(function: LabelCosts) -> Self {
        EnergyFunction::LabelCosts(function)
    }
}

impl From<SparseFunction> for EnergyFunction {
    fn from(function: SparseFunction) -> Self {
        EnergyFunction::Sparse(function)
    }
}

impl From<Box<dyn DiscreteFunction>> for EnergyFunction {
    fn from(function: Box<dyn DiscreteFunction>) -> Self {
        EnergyFunction::Custom(function)
    }
}
