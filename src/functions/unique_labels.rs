use crate::gm::errors::ModelError;

use super::function_trait::DiscreteFunction;

/// Constraint that all its variables take pairwise different labels.
///
/// The violation is `scale` times the number of pairs sharing a label.
/// An optional ignored label may be shared freely.
#[derive(Debug, Clone, PartialEq)]
pub struct UniqueLabels {
    arity: usize,
    num_labels: usize,
    ignored_label: Option<usize>,
    scale: f64,
}

impl UniqueLabels {
    pub fn new(arity: usize, num_labels: usize) -> Result<Self, ModelError> {
        if arity < 2 {
            return Err(ModelError::InvalidFunctionDefinition(format!(
                "unique-labels constraint needs at least 2 variables, got {arity}"
            )));
        }
        Ok(UniqueLabels {
            arity,
            num_labels,
            ignored_label: None,
            scale: 1.,
        })
    }

    pub fn with_ignored_label(mut self, label: usize) -> Self {
        self.ignored_label = Some(label);
        self
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    pub fn ignored_label(&self) -> Option<usize> {
        self.ignored_label
    }
}

impl DiscreteFunction for UniqueLabels {
    fn arity(&self) -> usize {
        self.arity
    }

    fn shape(&self, _axis: usize) -> usize {
        self.num_labels
    }

    fn value(&self, labels: &[usize]) -> f64 {
        let mut duplicates = 0usize;
        for (i, &label) in labels.iter().enumerate() {
            if Some(label) == self.ignored_label {
                continue;
            }
            duplicates += labels[i + 1..].iter().filter(|&&other| other == label).count();
        }
        self.scale * duplicates as f64
    }

    fn clone_boxed(&self) -> Box<dyn DiscreteFunction> {
        Box::new(self.clone())
    }
}
