use super::function_trait::DiscreteFunction;

/// Pairwise term paying `beta` whenever its two variables take different labels.
#[derive(Debug, Clone, PartialEq)]
pub struct Potts {
    num_labels: [usize; 2],
    beta: f64,
}

impl Potts {
    pub fn new(num_labels: usize, beta: f64) -> Self {
        Potts {
            num_labels: [num_labels, num_labels],
            beta,
        }
    }

    // Potts term between variables with different label counts
    pub fn with_shape(num_labels_0: usize, num_labels_1: usize, beta: f64) -> Self {
        Potts {
            num_labels: [num_labels_0, num_labels_1],
            beta,
        }
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }
}

// Smallest value, its position, and the second smallest value
fn min_and_second_min(values: &[f64]) -> (f64, usize, f64) {
    let mut min = f64::INFINITY;
    let mut argmin = 0;
    let mut second_min = f64::INFINITY;
    for (label, &value) in values.iter().enumerate() {
        if value < min {
            second_min = min;
            min = value;
            argmin = label;
        } else if value < second_min {
            second_min = value;
        }
    }
    (min, argmin, second_min)
}

// out[label] = min(in[label], beta + min over other labels of in)
fn potts_message(incoming: &[f64], outgoing: &mut [f64], beta: f64) {
    let (min, argmin, second_min) = min_and_second_min(incoming);
    for (label, out) in outgoing.iter_mut().enumerate() {
        let best_other = if label == argmin { second_min } else { min };
        let switched = beta + best_other;
        *out = match incoming.get(label) {
            Some(&same) if same < switched => same,
            _ => switched,
        };
    }
}

impl DiscreteFunction for Potts {
    fn arity(&self) -> usize {
        2
    }

    fn shape(&self, axis: usize) -> usize {
        self.num_labels[axis]
    }

    fn value(&self, labels: &[usize]) -> f64 {
        if labels[0] == labels[1] {
            0.
        } else {
            self.beta
        }
    }

    fn clone_boxed(&self) -> Box<dyn DiscreteFunction> {
        Box::new(self.clone())
    }

    // Closed form in O(labels) instead of the O(labels^2) sweep
    fn compute_to_variable_messages(
        &self,
        in_messages: &[f64],
        out_messages: &mut [f64],
        scale: f64,
    ) {
        let [n0, n1] = self.num_labels;
        let beta = scale * self.beta;
        let (in_0, in_1) = in_messages[..n0 + n1].split_at(n0);
        let (out_0, out_1) = out_messages[..n0 + n1].split_at_mut(n0);
        potts_message(in_1, out_0, beta);
        potts_message(in_0, out_1, beta);
    }
}
