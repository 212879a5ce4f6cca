use std::time::Duration;

use log::{debug, info};

use crate::gm::{
    errors::OptimizerError, model::Model, solution::Solution, solution_value::SolutionValue,
};

use super::{
    optimizer::{OptimizationStatus, Optimizer, Progress, ReporterCallback, TimeBudget},
    parameters::OptimizerParameters,
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BruteForceParameters {
    time_limit: Option<Duration>, // None means "no limit"
}

impl BruteForceParameters {
    pub fn from_parameters(mut parameters: OptimizerParameters) -> Result<Self, OptimizerError> {
        let mut result = BruteForceParameters::default();
        if let Some(time_limit) = parameters.take_time_limit()? {
            result.set_time_limit(time_limit);
        }
        parameters.ensure_all_handled(BruteForce::NAME)?;
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

/// Exhaustive search over all labelings, for small models and as a reference for tests.
pub struct BruteForce<'a> {
    model: &'a Model,
    parameters: BruteForceParameters,
    best_solution: Solution,
    best_value: SolutionValue,
    current_solution: Solution,
    current_value: SolutionValue,
}

impl<'a> BruteForce<'a> {
    pub const NAME: &'static str = "BruteForce";

    // Fails if the number of labelings does not fit into a machine word
    pub fn new(
        model: &'a Model,
        parameters: BruteForceParameters,
    ) -> Result<Self, OptimizerError> {
        if model.space().num_labelings() == usize::MAX {
            return Err(OptimizerError::UnsupportedModel {
                optimizer: Self::NAME.to_string(),
                reason: "too many labelings to enumerate".to_string(),
            });
        }
        let best_solution = Solution::zeros(model.num_variables());
        let best_value = model.evaluate(best_solution.as_slice(), false);
        Ok(BruteForce {
            model,
            parameters,
            current_solution: best_solution.clone(),
            current_value: best_value,
            best_solution,
            best_value,
        })
    }

    pub fn from_parameters(
        model: &'a Model,
        parameters: OptimizerParameters,
    ) -> Result<Self, OptimizerError> {
        BruteForce::new(model, BruteForceParameters::from_parameters(parameters)?)
    }
}

impl<'a> Optimizer for BruteForce<'a> {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn optimize(
        &mut self,
        mut callback: Option<&mut dyn ReporterCallback>,
        starting_point: Option<&[usize]>,
    ) -> Result<OptimizationStatus, OptimizerError> {
        debug!("In BruteForce::optimize()");
        if let Some(starting_point) = starting_point {
            self.model
                .check_labeling(starting_point)
                .map_err(OptimizerError::InvalidStartingPoint)?;
            self.best_solution.assign(starting_point);
            self.best_value = self.model.evaluate(starting_point, false);
        }

        let budget = TimeBudget::start(self.parameters.time_limit);
        let model = self.model;
        let best_solution = &mut self.best_solution;
        let best_value = &mut self.best_value;
        let current_solution = &mut self.current_solution;
        let current_value = &mut self.current_value;

        if let Some(callback) = callback.as_deref_mut() {
            callback.begin(&Progress {
                iteration: 0,
                best_value: *best_value,
                current_value: *current_value,
                elapsed: budget.elapsed(),
            });
        }

        let mut status = None;
        let mut iteration = 0;
        let mut labeling = vec![0; model.num_variables()];
        model.space().exitable_for_each_labeling(&mut labeling, |labeling| {
            iteration += 1;
            // Once a feasible labeling is known, infeasible ones may stop early
            let value = model.evaluate(labeling, best_value.is_feasible());
            current_solution.assign(labeling);
            *current_value = value;
            if value < *best_value {
                best_solution.assign(labeling);
                *best_value = value;
            }

            if let Some(callback) = callback.as_deref_mut() {
                let progress = Progress {
                    iteration,
                    best_value: *best_value,
                    current_value: value,
                    elapsed: budget.elapsed(),
                };
                if !callback.report(&progress) {
                    status = Some(OptimizationStatus::CallbackExited);
                    return false;
                }
            }
            if budget.is_exceeded() {
                info!("Time limit reached. Interrupting.");
                status = Some(OptimizationStatus::TimeLimitReached);
                return false;
            }
            true
        });

        let status = status.unwrap_or(if self.best_value.is_feasible() {
            OptimizationStatus::Optimal
        } else {
            OptimizationStatus::Infeasible
        });

        if let Some(callback) = callback.as_deref_mut() {
            callback.end(&Progress {
                iteration,
                best_value: self.best_value,
                current_value: self.current_value,
                elapsed: budget.elapsed(),
            });
        }
        info!(
            "BruteForce finished with status {}. Elapsed time {:?}. Labelings {}. Best value {}.",
            status,
            budget.elapsed(),
            iteration,
            self.best_value
        );
        Ok(status)
    }

    fn best_solution(&self) -> &Solution {
        &self.best_solution
    }

    fn best_solution_value(&self) -> SolutionValue {
        self.best_value
    }

    fn current_solution(&self) -> &Solution {
        &self.current_solution
    }

    fn current_solution_value(&self) -> SolutionValue {
        self.current_value
    }
}
