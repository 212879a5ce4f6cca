use std::{
    fmt::Display,
    ops::{Index, IndexMut},
};

// A full labeling of a model: one label per variable
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Solution {
    labels: Vec<usize>, // indexed by variables
}

impl Solution {
    // Creates a solution with every variable set to label 0
    pub fn zeros(num_variables: usize) -> Self {
        Solution {
            labels: vec![0; num_variables],
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.labels
    }

    pub fn iter(&self) -> std::slice::Iter<'_, usize> {
        self.labels.iter()
    }

    // Overwrites all labels with the given ones
    // Assumption: `labels` has the same length as this solution
    pub fn assign(&mut self, labels: &[usize]) {
        self.labels.copy_from_slice(labels);
    }

    pub fn into_vec(self) -> Vec<usize> {
        self.labels
    }
}

impl From<Vec<usize>> for Solution {
    fn from(labels: Vec<usize>) -> Self {
        Solution { labels }
    }
}

impl AsRef<[usize]> for Solution {
    fn as_ref(&self) -> &[usize] {
        &self.labels
    }
}

impl Index<usize> for Solution {
    type Output = usize;

    fn index(&self, index: usize) -> &Self::Output {
        &self.labels[index]
    }
}

impl IndexMut<usize> for Solution {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.labels[index]
    }
}

impl std::fmt::Debug for Solution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.labels)
    }
}

impl Display for Solution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            self.labels
                .iter()
                .map(|label| label.to_string())
                .collect::<Vec<_>>()
                .join(" ")
        )
    }
}
