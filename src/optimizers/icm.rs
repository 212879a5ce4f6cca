use std::{collections::VecDeque, time::Duration};

use bitvec::{bitvec, vec::BitVec};
use log::{debug, info};

use crate::gm::{
    errors::OptimizerError, model::Model, solution::Solution, solution_value::SolutionValue,
};

use super::{
    movemaker::{FilteredMoveMaker, TermFilter, UseAll},
    optimizer::{OptimizationStatus, Optimizer, Progress, ReporterCallback, TimeBudget},
    parameters::OptimizerParameters,
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IcmParameters {
    time_limit: Option<Duration>, // None means "no limit"
}

impl IcmParameters {
    // Takes the options ICM understands and rejects the rest
    pub fn from_parameters(mut parameters: OptimizerParameters) -> Result<Self, OptimizerError> {
        let mut result = IcmParameters::default();
        if let Some(time_limit) = parameters.take_time_limit()? {
            result.set_time_limit(time_limit);
        }
        parameters.ensure_all_handled(Icm::<UseAll>::NAME)?;
        Ok(result)
    }

    pub fn set_time_limit(&mut self, value: Duration) -> &mut Self {
        self.time_limit = Some(value);
        self
    }

    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit
    }
}

/// Iterated conditional modes: repeatedly moves single variables to their best label.
///
/// Variables wait in a FIFO queue, each at most once. Whenever a move changes a label,
/// the neighbours of the moved variable are queued again. Stops in a local optimum
/// when the queue runs empty.
pub struct Icm<'a, P: TermFilter = UseAll> {
    parameters: IcmParameters,
    movemaker: FilteredMoveMaker<'a, P>,
}

impl<'a> Icm<'a, UseAll> {
    pub fn new(model: &'a Model, parameters: IcmParameters) -> Self {
        Icm::with_filter(model, UseAll, parameters)
    }

    pub fn from_parameters(
        model: &'a Model,
        parameters: OptimizerParameters,
    ) -> Result<Self, OptimizerError> {
        Ok(Icm::new(model, IcmParameters::from_parameters(parameters)?))
    }
}

impl<'a, P: TermFilter> Icm<'a, P> {
    pub const NAME: &'static str = "Icm";

    // ICM restricted to the factors and constraints accepted by `filter`
    pub fn with_filter(model: &'a Model, filter: P, parameters: IcmParameters) -> Self {
        Icm {
            parameters,
            movemaker: FilteredMoveMaker::with_filter(model, filter),
        }
    }

    pub fn movemaker(&self) -> &FilteredMoveMaker<'a, P> {
        &self.movemaker
    }

    fn progress(&self, iteration: usize, budget: &TimeBudget) -> Progress {
        let value = self.movemaker.solution_value();
        Progress {
            iteration,
            best_value: value,
            current_value: value,
            elapsed: budget.elapsed(),
        }
    }
}

impl<'a, P: TermFilter> Optimizer for Icm<'a, P> {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn optimize(
        &mut self,
        mut callback: Option<&mut dyn ReporterCallback>,
        starting_point: Option<&[usize]>,
    ) -> Result<OptimizationStatus, OptimizerError> {
        debug!("In Icm::optimize()");
        if let Some(starting_point) = starting_point {
            self.movemaker
                .set_solution(starting_point)
                .map_err(OptimizerError::InvalidStartingPoint)?;
        }

        let budget = TimeBudget::start(self.parameters.time_limit);
        let num_variables = self.movemaker.model().num_variables();

        let mut queue: VecDeque<usize> = (0..num_variables).collect();
        let mut in_queue: BitVec = bitvec![1; num_variables];

        if let Some(callback) = callback.as_deref_mut() {
            callback.begin(&self.progress(0, &budget));
        }

        let mut num_moves = 0;
        let mut status = OptimizationStatus::LocalOptimal;
        while let Some(variable) = queue.pop_front() {
            in_queue.set(variable, false);

            if self.movemaker.move_optimal(variable) {
                num_moves += 1;
                for &neighbour in self.movemaker.neighbours(variable) {
                    if !in_queue[neighbour] {
                        in_queue.set(neighbour, true);
                        queue.push_back(neighbour);
                    }
                }
                if let Some(callback) = callback.as_deref_mut() {
                    if !callback.report(&self.progress(num_moves, &budget)) {
                        status = OptimizationStatus::CallbackExited;
                        break;
                    }
                }
            }

            if budget.is_exceeded() {
                info!("Time limit reached. Interrupting.");
                status = OptimizationStatus::TimeLimitReached;
                break;
            }
        }

        if let Some(callback) = callback.as_deref_mut() {
            callback.end(&self.progress(num_moves, &budget));
        }
        info!(
            "ICM finished with status {}. Elapsed time {:?}. Moves {}. Value {}.",
            status,
            budget.elapsed(),
            num_moves,
            self.movemaker.solution_value()
        );
        Ok(status)
    }

    fn best_solution(&self) -> &Solution {
        self.movemaker.solution()
    }

    fn best_solution_value(&self) -> SolutionValue {
        self.movemaker.solution_value()
    }

    fn current_solution(&self) -> &Solution {
        self.movemaker.solution()
    }

    fn current_solution_value(&self) -> SolutionValue {
        self.movemaker.solution_value()
    }
}
