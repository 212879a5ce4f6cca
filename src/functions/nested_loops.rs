// Arity-agnostic enumeration of label combinations.
// Every bulk operation on functions (dense copies, binding, message computation) and the
// exhaustive search over a label space go through these loops, so they all agree on one
// order: row-major, i.e. the last axis changes fastest.

// Calls `f` once for every label combination of the given shape, in row-major order.
// `labels` must hold exactly `shape.len()` entries; it is reset to zeros first.
// Returns false if `f` asked to stop (by returning false), true if the enumeration completed.
pub fn exitable_for_each_labeling<F>(shape: &[usize], labels: &mut [usize], mut f: F) -> bool
where
    F: FnMut(&[usize]) -> bool,
{
    debug_assert_eq!(shape.len(), labels.len());
    labels.iter_mut().for_each(|label| *label = 0);
    if shape.iter().any(|&num_labels| num_labels == 0) {
        return true;
    }

    loop {
        if !f(labels) {
            return false;
        }

        let mut axis = labels.len();
        loop {
            if axis == 0 {
                return true;
            }
            axis -= 1;
            // "Advance" to next label
            labels[axis] += 1;
            if labels[axis] < shape[axis] {
                break;
            }
            // "Carry over" to initial label
            labels[axis] = 0;
        }
    }
}

// Calls `f` once for every label combination of the given shape, in row-major order
pub fn for_each_labeling<F>(shape: &[usize], labels: &mut [usize], mut f: F)
where
    F: FnMut(&[usize]),
{
    exitable_for_each_labeling(shape, labels, |labels| {
        f(labels);
        true
    });
}

// Row-major flat index of a label combination
pub fn flat_index(shape: &[usize], labels: &[usize]) -> usize {
    shape
        .iter()
        .zip(labels.iter())
        .fold(0, |index, (&num_labels, &label)| index * num_labels + label)
}

// Inverse of `flat_index`
pub fn labels_from_flat_index(shape: &[usize], mut index: usize, labels: &mut [usize]) {
    for (label, &num_labels) in labels.iter_mut().zip(shape.iter()).rev() {
        *label = index % num_labels;
        index /= num_labels;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enumerates_in_row_major_order() {
        let shape = [2, 3];
        let mut labels = vec![0; 2];
        let mut seen = Vec::new();
        for_each_labeling(&shape, &mut labels, |labels| seen.push(labels.to_vec()));
        assert_eq!(
            seen,
            vec![
                vec![0, 0],
                vec![0, 1],
                vec![0, 2],
                vec![1, 0],
                vec![1, 1],
                vec![1, 2]
            ]
        );
        for (index, labels) in seen.iter().enumerate() {
            assert_eq!(flat_index(&shape, labels), index);
        }
    }

    #[test]
    fn zero_arity_has_exactly_one_combination() {
        let mut count = 0;
        for_each_labeling(&[], &mut [], |_| count += 1);
        assert_eq!(count, 1);
    }

    #[test]
    fn stops_when_asked() {
        let mut count = 0;
        let completed = exitable_for_each_labeling(&[3, 3], &mut [0, 0], |_| {
            count += 1;
            count < 4
        });
        assert!(!completed);
        assert_eq!(count, 4);
    }

    #[test]
    fn flat_index_round_trip() {
        let shape = [3, 2, 4];
        let mut labels = [0; 3];
        labels_from_flat_index(&shape, 17, &mut labels);
        assert_eq!(labels, [2, 0, 1]);
        assert_eq!(flat_index(&shape, &labels), 17);
    }
}
