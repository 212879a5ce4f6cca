use std::fmt::Debug;

use ndarray::{ArrayD, IxDyn};

use super::nested_loops::{for_each_labeling, labels_from_flat_index};

/// Capability set shared by every cost function and constraint function.
///
/// A new function only has to provide `arity`, `shape`, `value` and `clone_boxed`;
/// bulk enumeration, binding and message computation fall back to generic implementations
/// that enumerate label combinations in row-major order (last axis fastest).
///
/// Functions must be callable concurrently: implementations either hold no mutable state
/// or guard it with a lock for the duration of the call.
pub trait DiscreteFunction: Debug + Send + Sync {
    fn arity(&self) -> usize;

    // Number of labels on the given axis
    fn shape(&self, axis: usize) -> usize;

    fn value(&self, labels: &[usize]) -> f64;

    fn clone_boxed(&self) -> Box<dyn DiscreteFunction>;

    fn shape_vec(&self) -> Vec<usize> {
        (0..self.arity()).map(|axis| self.shape(axis)).collect()
    }

    // Number of label combinations
    fn size(&self) -> usize {
        (0..self.arity()).map(|axis| self.shape(axis)).product()
    }

    // Writes all `size()` values in row-major order into the beginning of `buffer`
    fn copy_values(&self, buffer: &mut [f64]) {
        let shape = self.shape_vec();
        let mut labels = vec![0; shape.len()];
        let mut index = 0;
        for_each_labeling(&shape, &mut labels, |labels| {
            buffer[index] = self.value(labels);
            index += 1;
        });
    }

    // Adds all `size()` values in row-major order onto the beginning of `buffer`
    fn add_values(&self, buffer: &mut [f64]) {
        let shape = self.shape_vec();
        let mut labels = vec![0; shape.len()];
        let mut index = 0;
        for_each_labeling(&shape, &mut labels, |labels| {
            buffer[index] += self.value(labels);
            index += 1;
        });
    }

    // Table of the restriction of this function to `fixed_labels` on `fixed_axes`.
    // The remaining axes keep their relative order.
    // Assumption: axes are distinct and in range, labels are in range.
    fn bind_values(&self, fixed_axes: &[usize], fixed_labels: &[usize]) -> ArrayD<f64> {
        let arity = self.arity();
        let mut full_labels = vec![0; arity];
        let mut is_fixed = vec![false; arity];
        for (&axis, &label) in fixed_axes.iter().zip(fixed_labels.iter()) {
            full_labels[axis] = label;
            is_fixed[axis] = true;
        }
        let free_axes: Vec<usize> = (0..arity).filter(|&axis| !is_fixed[axis]).collect();
        let free_shape: Vec<usize> = free_axes.iter().map(|&axis| self.shape(axis)).collect();

        let mut values = Vec::with_capacity(free_shape.iter().product());
        let mut free_labels = vec![0; free_axes.len()];
        for_each_labeling(&free_shape, &mut free_labels, |free_labels| {
            for (&axis, &label) in free_axes.iter().zip(free_labels.iter()) {
                full_labels[axis] = label;
            }
            values.push(self.value(&full_labels));
        });

        ArrayD::from_shape_vec(IxDyn(&free_shape), values)
            .unwrap_or_else(|_| ArrayD::zeros(IxDyn(&free_shape)))
    }

    // Min-sum messages from this function to each of its variables.
    // `in_messages` and `out_messages` are the concatenation of one segment per axis,
    // segment `axis` holding `shape(axis)` entries. Every output entry is overwritten.
    fn compute_to_variable_messages(
        &self,
        in_messages: &[f64],
        out_messages: &mut [f64],
        scale: f64,
    ) {
        let shape = self.shape_vec();
        if shape.len() == 1 {
            for label in 0..shape[0] {
                out_messages[label] = scale * self.value(&[label]);
            }
            return;
        }
        generic_min_sum_messages(&shape, in_messages, out_messages, |labels| {
            scale * self.value(labels)
        });
    }
}

// Start offset of each axis' segment in a concatenated message array
pub fn message_offsets(shape: &[usize]) -> Vec<usize> {
    let mut offsets = Vec::with_capacity(shape.len());
    let mut offset = 0;
    for &num_labels in shape {
        offsets.push(offset);
        offset += num_labels;
    }
    offsets
}

// Generic O(size * arity) min-sum sweep over all label combinations
pub fn generic_min_sum_messages<F>(
    shape: &[usize],
    in_messages: &[f64],
    out_messages: &mut [f64],
    mut cost: F,
) where
    F: FnMut(&[usize]) -> f64,
{
    let offsets = message_offsets(shape);
    let total: usize = shape.iter().sum();
    out_messages[..total].fill(f64::INFINITY);

    let mut labels = vec![0; shape.len()];
    for_each_labeling(shape, &mut labels, |labels| {
        let c = cost(labels);
        let s: f64 = labels
            .iter()
            .zip(offsets.iter())
            .map(|(&label, &offset)| in_messages[offset + label])
            .sum();
        for (axis, (&label, &offset)) in labels.iter().zip(offsets.iter()).enumerate() {
            let incoming = in_messages[offset + label];
            let candidate = if incoming.is_finite() {
                c + s - incoming
            } else {
                // inf - inf is undefined, sum the other axes instead
                c + labels
                    .iter()
                    .zip(offsets.iter())
                    .enumerate()
                    .filter(|&(other, _)| other != axis)
                    .map(|(_, (&l, &o))| in_messages[o + l])
                    .sum::<f64>()
            };
            let out = &mut out_messages[offset + label];
            if candidate < *out {
                *out = candidate;
            }
        }
    });
}

// Label combination stored at a row-major flat index
pub fn labels_of_index(shape: &[usize], index: usize) -> Vec<usize> {
    let mut labels = vec![0; shape.len()];
    labels_from_flat_index(shape, index, &mut labels);
    labels
}

#[cfg(test)]
mod tests {
    use super::*;

    // Minimal function that relies on every default
    #[derive(Debug, Clone)]
    struct Sum {
        shape: Vec<usize>,
    }

    impl DiscreteFunction for Sum {
        fn arity(&self) -> usize {
            self.shape.len()
        }

        fn shape(&self, axis: usize) -> usize {
            self.shape[axis]
        }

        fn value(&self, labels: &[usize]) -> f64 {
            labels
                .iter()
                .enumerate()
                .map(|(axis, &label)| (axis + 1) as f64 * label as f64)
                .sum()
        }

        fn clone_boxed(&self) -> Box<dyn DiscreteFunction> {
            Box::new(self.clone())
        }
    }

    #[test]
    fn default_copy_values_is_row_major() {
        let f = Sum { shape: vec![2, 3] };
        let mut buffer = vec![0.; f.size()];
        f.copy_values(&mut buffer);
        assert_eq!(buffer, vec![0., 2., 4., 1., 3., 5.]);

        f.add_values(&mut buffer);
        assert_eq!(buffer, vec![0., 4., 8., 2., 6., 10.]);
    }

    #[test]
    fn default_bind_restricts_axes() {
        let f = Sum {
            shape: vec![2, 3, 2],
        };
        let bound = f.bind_values(&[1], &[2]);
        assert_eq!(bound.shape(), &[2, 2]);
        for a in 0..2 {
            for c in 0..2 {
                assert_eq!(bound[[a, c]], f.value(&[a, 2, c]));
            }
        }
    }

    #[test]
    fn generic_messages_minimize_over_other_axes() {
        let f = Sum { shape: vec![2, 2] };
        let in_messages = [0., 10., 3., 0.];
        let mut out_messages = [0.; 4];
        f.compute_to_variable_messages(&in_messages, &mut out_messages, 1.);
        // out[0][a] = min_b (a + 2b + in1[b])
        assert_eq!(&out_messages[..2], &[2., 3.]);
        // out[1][b] = min_a (a + 2b + in0[a])
        assert_eq!(&out_messages[2..], &[0., 2.]);
    }

    #[test]
    fn unary_messages_are_scaled_values() {
        let f = Sum { shape: vec![3] };
        let mut out_messages = [0.; 3];
        f.compute_to_variable_messages(&[5., 5., 5.], &mut out_messages, 2.);
        assert_eq!(out_messages, [0., 2., 4.]);
    }

    #[test]
    fn infinite_incoming_messages_do_not_produce_nan() {
        let f = Sum { shape: vec![2, 2] };
        let in_messages = [f64::INFINITY, 0., 0., 0.];
        let mut out_messages = [0.; 4];
        f.compute_to_variable_messages(&in_messages, &mut out_messages, 1.);
        assert!(out_messages.iter().all(|m| !m.is_nan()));
        assert_eq!(out_messages[0], 0.);
    }
}
