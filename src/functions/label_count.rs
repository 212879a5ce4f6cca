use std::sync::Mutex;

use crate::gm::errors::ModelError;

use super::function_trait::DiscreteFunction;

/// Constraint on how many of its variables take each label.
///
/// Label `l` should be used between `min_counts[l]` and `max_counts[l]` times. The violation is
/// `scale` times the total shortfall and excess over all labels.
#[derive(Debug)]
pub struct LabelCount {
    arity: usize,
    min_counts: Vec<usize>, // indexed by labels
    max_counts: Vec<usize>,
    scale: f64,
    counts: Mutex<Vec<usize>>,
}

impl LabelCount {
    pub fn new(
        arity: usize,
        min_counts: Vec<usize>,
        max_counts: Vec<usize>,
    ) -> Result<Self, ModelError> {
        if arity < 2 {
            return Err(ModelError::InvalidFunctionDefinition(format!(
                "label-count constraint needs at least 2 variables, got {arity}"
            )));
        }
        if min_counts.len() != max_counts.len() {
            return Err(ModelError::InvalidFunctionDefinition(format!(
                "label-count constraint has {} minimum and {} maximum counts",
                min_counts.len(),
                max_counts.len()
            )));
        }
        let num_labels = min_counts.len();
        Ok(LabelCount {
            arity,
            min_counts,
            max_counts,
            scale: 1.,
            counts: Mutex::new(vec![0; num_labels]),
        })
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    pub fn num_labels(&self) -> usize {
        self.min_counts.len()
    }

    pub fn min_count(&self, label: usize) -> usize {
        self.min_counts[label]
    }

    pub fn max_count(&self, label: usize) -> usize {
        self.max_counts[label]
    }
}

impl Clone for LabelCount {
    // The clone gets its own scratch counters
    fn clone(&self) -> Self {
        LabelCount {
            arity: self.arity,
            min_counts: self.min_counts.clone(),
            max_counts: self.max_counts.clone(),
            scale: self.scale,
            counts: Mutex::new(vec![0; self.num_labels()]),
        }
    }
}

impl PartialEq for LabelCount {
    fn eq(&self, other: &Self) -> bool {
        self.arity == other.arity
            && self.min_counts == other.min_counts
            && self.max_counts == other.max_counts
            && self.scale == other.scale
    }
}

impl DiscreteFunction for LabelCount {
    fn arity(&self) -> usize {
        self.arity
    }

    fn shape(&self, _axis: usize) -> usize {
        self.min_counts.len()
    }

    fn value(&self, labels: &[usize]) -> f64 {
        // Counters are reset on every call, so a poisoned lock is still usable
        let mut counts = self.counts.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        counts.fill(0);
        for &label in labels {
            counts[label] += 1;
        }

        let mut how_violated = 0;
        for (label, &count) in counts.iter().enumerate() {
            how_violated += self.min_counts[label].saturating_sub(count);
            how_violated += count.saturating_sub(self.max_counts[label]);
        }
        self.scale * how_violated as f64
    }

    fn clone_boxed(&self) -> Box<dyn DiscreteFunction> {
        Box::new(self.clone())
    }
}
