use std::{
    cmp::Ordering,
    fmt::Display,
    ops::{Add, AddAssign},
};

/// Aggregated constraint violation below this value counts as feasible (unless the model says otherwise)
pub const DEFAULT_FEASIBILITY_LIMIT: f64 = 1e-5;

/// Value of a labeling: its energy and how badly it violates the constraints.
///
/// The ordering is the single comparison used by every optimizer:
/// a feasible value is always better than an infeasible one; among feasible values the lower
/// energy wins; among infeasible values the lower violation wins, then the lower energy.
#[derive(Debug, Clone, Copy)]
pub struct SolutionValue {
    energy: f64,
    how_violated: f64,
    is_feasible: bool,
}

impl SolutionValue {
    // Creates a value whose feasibility is judged with the default feasibility limit
    pub fn new(energy: f64, how_violated: f64) -> Self {
        Self::with_limit(energy, how_violated, DEFAULT_FEASIBILITY_LIMIT)
    }

    // Creates a value whose feasibility is judged with the given feasibility limit
    pub fn with_limit(energy: f64, how_violated: f64, feasibility_limit: f64) -> Self {
        SolutionValue {
            energy,
            how_violated,
            is_feasible: how_violated < feasibility_limit,
        }
    }

    // Raw sums of a partial evaluation, feasible only without any violation.
    // Use `Model::apply_feasibility_limit` on the final aggregate.
    pub fn unrounded(energy: f64, how_violated: f64) -> Self {
        SolutionValue {
            energy,
            how_violated,
            is_feasible: how_violated <= 0.,
        }
    }

    // Value of a feasible labeling with a given energy
    pub fn feasible(energy: f64) -> Self {
        SolutionValue {
            energy,
            how_violated: 0.,
            is_feasible: true,
        }
    }

    // Worst possible value, used as "nothing found yet"
    pub fn infeasible_sentinel(how_violated: f64) -> Self {
        SolutionValue {
            energy: f64::INFINITY,
            how_violated,
            is_feasible: false,
        }
    }

    pub fn energy(&self) -> f64 {
        self.energy
    }

    pub fn how_violated(&self) -> f64 {
        self.how_violated
    }

    pub fn is_feasible(&self) -> bool {
        self.is_feasible
    }

    // Checks that two values agree up to `tolerance` in both energy and violation
    pub fn approx_eq(&self, other: &SolutionValue, tolerance: f64) -> bool {
        self.is_feasible == other.is_feasible
            && close(self.energy, other.energy, tolerance)
            && close(self.how_violated, other.how_violated, tolerance)
    }
}

fn close(a: f64, b: f64, tolerance: f64) -> bool {
    a == b || (a - b).abs() <= tolerance
}

impl Default for SolutionValue {
    fn default() -> Self {
        SolutionValue::feasible(0.)
    }
}

impl Ord for SolutionValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.is_feasible, other.is_feasible) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (true, true) => self.energy.total_cmp(&other.energy),
            (false, false) => self
                .how_violated
                .total_cmp(&other.how_violated)
                .then_with(|| self.energy.total_cmp(&other.energy)),
        }
    }
}

impl PartialOrd for SolutionValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for SolutionValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SolutionValue {}

// Feasibility of a sum is the conjunction, the limit is not re-applied
impl Add for SolutionValue {
    type Output = SolutionValue;

    fn add(self, rhs: Self) -> Self::Output {
        SolutionValue {
            energy: self.energy + rhs.energy,
            how_violated: self.how_violated + rhs.how_violated,
            is_feasible: self.is_feasible && rhs.is_feasible,
        }
    }
}

impl AddAssign for SolutionValue {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Display for SolutionValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "(energy {}, feasible {}, violated {})",
            self.energy, self.is_feasible, self.how_violated
        )
    }
}
