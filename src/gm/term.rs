// A factor or a constraint: an ordered tuple of distinct variables bound to one function.
// The function is referenced by its index in the model's owning collection
// (energy functions for factors, constraint functions for constraints).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    variables: Vec<usize>,
    function_index: usize,
}

pub type Factor = Term;
pub type Constraint = Term;

impl Term {
    // Only the model creates terms, after validating them
    pub(crate) fn new(variables: Vec<usize>, function_index: usize) -> Self {
        Term {
            variables,
            function_index,
        }
    }

    pub fn variables(&self) -> &[usize] {
        &self.variables
    }

    pub fn variable(&self, position: usize) -> usize {
        self.variables[position]
    }

    pub fn arity(&self) -> usize {
        self.variables.len()
    }

    pub fn function_index(&self) -> usize {
        self.function_index
    }

    // Returns the local index of `variable` in this term, if it belongs to it
    pub fn variable_position(&self, variable: usize) -> Option<usize> {
        self.variables.iter().position(|&v| v == variable)
    }

    // Writes the labels of this term's variables, taken from a global labeling, into `local_labels`
    // Assumption: `local_labels` holds at least `arity()` entries
    pub fn map_from_model(&self, labeling: &[usize], local_labels: &mut [usize]) {
        for (local, &variable) in local_labels.iter_mut().zip(self.variables.iter()) {
            *local = labeling[variable];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_and_projection() {
        let term = Term::new(vec![4, 1, 7], 0);
        assert_eq!(term.variable_position(1), Some(1));
        assert_eq!(term.variable_position(3), None);

        let labeling = [0, 10, 0, 0, 40, 0, 0, 70];
        let mut local = vec![0; 3];
        term.map_from_model(&labeling, &mut local);
        assert_eq!(local, vec![40, 10, 70]);
    }
}
