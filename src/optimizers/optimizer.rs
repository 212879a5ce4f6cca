use std::{
    fmt::Display,
    time::{Duration, Instant},
};

use crate::gm::{errors::OptimizerError, solution::Solution, solution_value::SolutionValue};

/// Outcome of a call to `Optimizer::optimize`. None of these is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizationStatus {
    Optimal,
    LocalOptimal,
    Converged,
    TimeLimitReached,
    IterationLimitReached,
    CallbackExited,
    Infeasible,
}

impl Display for OptimizationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OptimizationStatus::Optimal => "OPTIMAL",
            OptimizationStatus::LocalOptimal => "LOCAL_OPTIMAL",
            OptimizationStatus::Converged => "CONVERGED",
            OptimizationStatus::TimeLimitReached => "TIME_LIMIT_REACHED",
            OptimizationStatus::IterationLimitReached => "ITERATION_LIMIT_REACHED",
            OptimizationStatus::CallbackExited => "CALLBACK_EXITED",
            OptimizationStatus::Infeasible => "INFEASIBLE",
        };
        write!(f, "{name}")
    }
}

// Snapshot handed to a reporter callback
#[derive(Debug, Clone, Copy)]
pub struct Progress {
    pub iteration: usize,
    pub best_value: SolutionValue,
    pub current_value: SolutionValue,
    pub elapsed: Duration,
}

/// Observer of a running optimizer.
///
/// `report` is called at the optimizer's iteration boundaries; returning false stops the
/// optimizer, which then returns `CallbackExited` with its best solution intact.
pub trait ReporterCallback {
    fn begin(&mut self, _progress: &Progress) {}

    fn report(&mut self, progress: &Progress) -> bool;

    fn end(&mut self, _progress: &Progress) {}
}

impl<F> ReporterCallback for F
where
    F: FnMut(&Progress) -> bool,
{
    fn report(&mut self, progress: &Progress) -> bool {
        self(progress)
    }
}

/// Common interface of all optimizers over a borrowed model.
pub trait Optimizer {
    fn name(&self) -> &'static str;

    // Runs the optimizer. The error arm is only used for a malformed starting point;
    // every runtime outcome is a status.
    fn optimize(
        &mut self,
        callback: Option<&mut dyn ReporterCallback>,
        starting_point: Option<&[usize]>,
    ) -> Result<OptimizationStatus, OptimizerError>;

    fn best_solution(&self) -> &Solution;
    fn best_solution_value(&self) -> SolutionValue;
    fn current_solution(&self) -> &Solution;
    fn current_solution_value(&self) -> SolutionValue;
}

// Wall-clock budget of one optimize() call
#[derive(Debug, Clone, Copy)]
pub(crate) struct TimeBudget {
    start: Instant,
    limit: Option<Duration>,
}

impl TimeBudget {
    pub(crate) fn start(limit: Option<Duration>) -> Self {
        TimeBudget {
            start: Instant::now(),
            limit,
        }
    }

    pub(crate) fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub(crate) fn is_exceeded(&self) -> bool {
        self.limit.is_some_and(|limit| self.start.elapsed() >= limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_are_callbacks() {
        let mut calls = 0;
        let mut callback = |progress: &Progress| {
            calls += 1;
            progress.iteration < 2
        };
        let mut progress = Progress {
            iteration: 0,
            best_value: SolutionValue::feasible(0.),
            current_value: SolutionValue::feasible(0.),
            elapsed: Duration::ZERO,
        };
        let reporter: &mut dyn ReporterCallback = &mut callback;
        reporter.begin(&progress);
        assert!(reporter.report(&progress));
        progress.iteration = 2;
        assert!(!reporter.report(&progress));
        reporter.end(&progress);
        assert_eq!(calls, 2);
    }

    #[test]
    fn zero_budget_is_exceeded_immediately() {
        assert!(TimeBudget::start(Some(Duration::ZERO)).is_exceeded());
        assert!(!TimeBudget::start(None).is_exceeded());
    }

    #[test]
    fn status_names() {
        assert_eq!(OptimizationStatus::LocalOptimal.to_string(), "LOCAL_OPTIMAL");
        assert_eq!(
            OptimizationStatus::IterationLimitReached.to_string(),
            "ITERATION_LIMIT_REACHED"
        );
    }
}
