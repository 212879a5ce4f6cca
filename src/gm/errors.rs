use thiserror::Error;

/// Errors raised while building a model or handing it a labeling.
///
/// All of these are detected synchronously by the call that receives the bad input,
/// and that call leaves the model untouched.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    #[error("variable index {variable} is out of range for a model with {num_variables} variables")]
    InvalidVariable {
        variable: usize,
        num_variables: usize,
    },

    #[error("variable {0} appears more than once in the same factor or constraint")]
    DuplicateVariable(usize),

    #[error("function arity {arity} does not match the number of variables {num_variables}")]
    ArityMismatch { arity: usize, num_variables: usize },

    #[error(
        "function shape does not match the number of labels on axis {axis}: \
         variable {variable} has {num_labels} labels, function expects {shape}"
    )]
    ShapeMismatch {
        axis: usize,
        variable: usize,
        num_labels: usize,
        shape: usize,
    },

    #[error("function handle {handle} is invalid, the model holds {num_functions} functions")]
    InvalidFunction { handle: usize, num_functions: usize },

    #[error("{kind} index {index} is out of range, the model holds {count} of them")]
    InvalidTerm {
        kind: &'static str,
        index: usize,
        count: usize,
    },

    #[error("variable {0} has an empty label set")]
    EmptyLabelSet(usize),

    #[error("invalid function: {0}")]
    InvalidFunctionDefinition(String),

    #[error("labeling has {actual} entries, expected {expected}")]
    LabelingLength { expected: usize, actual: usize },

    #[error("label {label} of variable {variable} is out of range ({num_labels} labels)")]
    LabelOutOfRange {
        variable: usize,
        label: usize,
        num_labels: usize,
    },

    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),
}

/// Errors raised while configuring an optimizer.
///
/// Runtime outcomes (time limits, convergence, ...) are never errors, see `OptimizationStatus`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum OptimizerError {
    #[error("{optimizer} does not understand the parameter(s): {names}")]
    UnknownParameter { optimizer: String, names: String },

    #[error("parameter `{name}` is invalid: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("{optimizer} cannot handle this model: {reason}")]
    UnsupportedModel { optimizer: String, reason: String },

    #[error("invalid starting point: {0}")]
    InvalidStartingPoint(#[source] ModelError),
}
