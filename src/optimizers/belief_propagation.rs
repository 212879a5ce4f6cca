use std::time::Duration;

use log::{debug, info};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    functions::function_trait::DiscreteFunction,
    gm::{
        errors::OptimizerError, model::Model, solution::Solution, solution_value::SolutionValue,
        term::Term,
    },
};

use super::{
    optimizer::{OptimizationStatus, Optimizer, Progress, ReporterCallback, TimeBudget},
    parameters::OptimizerParameters,
};

// Magnitude of the seeded perturbation of the initial beliefs
const SEED_NOISE: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq)]
pub struct BeliefPropagationParameters {
    max_iterations: usize,
    convergence_tolerance: f64, // stop when the messages moved less than this (Euclidean norm)
    damping: f64,               // weight of the previous messages, in [0, 1)
    normalize_messages: bool,   // subtract the minimum of every outgoing message
    constraint_scaling: f64,    // factor applied to constraint violations in messages
    seed: Option<u64>,          // None means "start from zero beliefs"
    time_limit: Option<Duration>,
}

impl Default for BeliefPropagationParameters {
    fn default() -> Self {
        BeliefPropagationParameters {
            max_iterations: 1000,
            convergence_tolerance: 1e-5,
            damping: 0.,
            normalize_messages: true,
            constraint_scaling: 1000.,
            seed: None,
            time_limit: None,
        }
    }
}

impl BeliefPropagationParameters {
    // Takes the options belief propagation understands and rejects the rest
    pub fn from_parameters(mut parameters: OptimizerParameters) -> Result<Self, OptimizerError> {
        let mut result = BeliefPropagationParameters::default();
        if let Some(value) = parameters.take_usize("max_iterations")? {
            result.set_max_iterations(value);
        }
        if let Some(value) = parameters.take_f64("convergence_tolerance")? {
            result.set_convergence_tolerance(value);
        }
        if let Some(value) = parameters.take_f64("damping")? {
            result.set_damping(value);
        }
        if let Some(value) = parameters.take_bool("normalize_messages")? {
            result.set_normalize_messages(value);
        }
        if let Some(value) = parameters.take_f64("constraint_scaling")? {
            result.set_constraint_scaling(value);
        }
        if let Some(value) = parameters.take_u64("seed")? {
            result.set_seed(value);
        }
        if let Some(value) = parameters.take_time_limit()? {
            result.set_time_limit(value);
        }
        parameters.ensure_all_handled(BeliefPropagation::NAME)?;
        result.validate()?;
        Ok(result)
    }

    pub fn validate(&self) -> Result<(), OptimizerError> {
        if !(0. ..1.).contains(&self.damping) {
            return Err(OptimizerError::InvalidParameter {
                name: "damping".to_string(),
                reason: format!("must be in [0, 1), got {}", self.damping),
            });
        }
        if !(self.convergence_tolerance >= 0.) {
            return Err(OptimizerError::InvalidParameter {
                name: "convergence_tolerance".to_string(),
                reason: format!("must be non-negative, got {}", self.convergence_tolerance),
            });
        }
        if !(self.constraint_scaling >= 0.) {
            return Err(OptimizerError::InvalidParameter {
                name: "constraint_scaling".to_string(),
                reason: format!("must be non-negative, got {}", self.constraint_scaling),
            });
        }
        Ok(())
    }

    pub fn set_max_iterations(&mut self, value: usize) -> &mut Self {
        self.max_iterations = value;
        self
    }

    pub fn set_convergence_tolerance(&mut self, value: f64) -> &mut Self {
        self.convergence_tolerance = value;
        self
    }

    pub fn set_damping(&mut self, value: f64) -> &mut Self {
        self.damping = value;
        self
    }

    pub fn set_normalize_messages(&mut self, value: bool) -> &mut Self {
        self.normalize_messages = value;
        self
    }

    pub fn set_constraint_scaling(&mut self, value: f64) -> &mut Self {
        self.constraint_scaling = value;
        self
    }

    pub fn set_seed(&mut self, value: u64) -> &mut Self {
        self.seed = Some(value);
        self
    }

    pub fn set_time_limit(&mut self, value: Duration) -> &mut Self {
        self.time_limit = Some(value);
        self
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn convergence_tolerance(&self) -> f64 {
        self.convergence_tolerance
    }

    pub fn damping(&self) -> f64 {
        self.damping
    }

    pub fn normalize_messages(&self) -> bool {
        self.normalize_messages
    }

    pub fn constraint_scaling(&self) -> f64 {
        self.constraint_scaling
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeliefPropagationState {
    Initialized,
    Iterating,
    Converged,
    IterationLimitReached,
    TimeLimitReached,
    CallbackExited,
}

/// Min-sum loopy belief propagation with parallel updates.
///
/// All messages live in one flat arena. For every term (factors first, then constraints) the
/// arena holds a variable-to-function block followed by a function-to-variable block, each the
/// concatenation of one segment per variable of the term. The offsets of the blocks are computed
/// once, so an iteration is a linear sweep over the arena.
pub struct BeliefPropagation<'a> {
    model: &'a Model,
    parameters: BeliefPropagationParameters,
    state: BeliefPropagationState,
    iteration: usize,

    messages: Vec<f64>,          // current generation
    previous_messages: Vec<f64>, // generation of the previous iteration
    variable_to_function_offsets: Vec<usize>, // indexed by terms
    function_to_variable_offsets: Vec<usize>, // indexed by terms
    beliefs: Vec<f64>,
    belief_offsets: Vec<usize>, // indexed by variables
    incoming_segments: Vec<Vec<usize>>, // per variable, starts of its function-to-variable segments

    best_solution: Solution,
    best_value: SolutionValue,
    current_solution: Solution,
    current_value: SolutionValue,
}

impl<'a> BeliefPropagation<'a> {
    pub const NAME: &'static str = "BeliefPropagation";

    pub fn new(
        model: &'a Model,
        parameters: BeliefPropagationParameters,
    ) -> Result<Self, OptimizerError> {
        debug!("In BeliefPropagation::new()");
        parameters.validate()?;
        if model.is_acyclic() {
            info!("The factor graph is acyclic, belief propagation is exact.");
        }

        // Beliefs
        let mut belief_offsets = Vec::with_capacity(model.num_variables());
        let mut num_beliefs = 0;
        for variable in 0..model.num_variables() {
            belief_offsets.push(num_beliefs);
            num_beliefs += model.num_labels(variable);
        }
        let mut beliefs = vec![0.; num_beliefs];
        if let Some(seed) = parameters.seed {
            let mut rng = StdRng::seed_from_u64(seed);
            for belief in beliefs.iter_mut() {
                *belief = SEED_NOISE * rng.gen::<f64>();
            }
        }

        // Messages
        let num_terms = model.num_factors() + model.num_constraints();
        let mut variable_to_function_offsets = Vec::with_capacity(num_terms);
        let mut function_to_variable_offsets = Vec::with_capacity(num_terms);
        let mut incoming_segments = vec![Vec::new(); model.num_variables()];
        let mut num_messages = 0;
        for term in model.factors().iter().chain(model.constraints().iter()) {
            let block_len: usize = term
                .variables()
                .iter()
                .map(|&variable| model.num_labels(variable))
                .sum();
            variable_to_function_offsets.push(num_messages);
            function_to_variable_offsets.push(num_messages + block_len);

            let mut segment = num_messages + block_len;
            for &variable in term.variables() {
                incoming_segments[variable].push(segment);
                segment += model.num_labels(variable);
            }
            num_messages += 2 * block_len;
        }

        let solution = Solution::zeros(model.num_variables());
        let value = model.evaluate(solution.as_slice(), false);
        Ok(BeliefPropagation {
            model,
            parameters,
            state: BeliefPropagationState::Initialized,
            iteration: 0,
            messages: vec![0.; num_messages],
            previous_messages: vec![0.; num_messages],
            variable_to_function_offsets,
            function_to_variable_offsets,
            beliefs,
            belief_offsets,
            incoming_segments,
            best_solution: solution.clone(),
            best_value: value,
            current_solution: solution,
            current_value: value,
        })
    }

    pub fn from_parameters(
        model: &'a Model,
        parameters: OptimizerParameters,
    ) -> Result<Self, OptimizerError> {
        BeliefPropagation::new(
            model,
            BeliefPropagationParameters::from_parameters(parameters)?,
        )
    }

    pub fn state(&self) -> BeliefPropagationState {
        self.state
    }

    // Number of iterations performed so far
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    pub fn parameters(&self) -> &BeliefPropagationParameters {
        &self.parameters
    }

    pub fn beliefs(&self, variable: usize) -> &[f64] {
        let offset = self.belief_offsets[variable];
        &self.beliefs[offset..offset + self.model.num_labels(variable)]
    }

    // Term, function and message scale of a factor (index < num_factors) or constraint
    fn term(&self, index: usize) -> (&'a Term, &'a dyn DiscreteFunction, f64) {
        let model = self.model;
        let num_factors = model.num_factors();
        if index < num_factors {
            let function: &'a dyn DiscreteFunction = model.factor_function(index);
            (&model.factors()[index], function, 1.)
        } else {
            let constraint = index - num_factors;
            let function: &'a dyn DiscreteFunction = model.constraint_function(constraint);
            (
                &model.constraints()[constraint],
                function,
                self.parameters.constraint_scaling,
            )
        }
    }

    fn num_terms(&self) -> usize {
        self.variable_to_function_offsets.len()
    }

    // Sum of the messages to `variable` at `label`, except the one in segment `excluded`
    fn incoming_except(&self, variable: usize, label: usize, excluded: usize) -> f64 {
        self.incoming_segments[variable]
            .iter()
            .filter(|&&segment| segment != excluded)
            .map(|&segment| self.messages[segment + label])
            .sum()
    }

    fn compute_variable_to_function_messages(&mut self) {
        let model = self.model;
        for index in 0..self.num_terms() {
            let (term, _, _) = self.term(index);
            // Messages of unary terms do not change after the first iteration
            if self.iteration > 0 && term.arity() == 1 {
                continue;
            }

            let mut to_function = self.variable_to_function_offsets[index];
            let mut to_variable = self.function_to_variable_offsets[index];
            for &variable in term.variables() {
                let num_labels = model.num_labels(variable);
                let belief_offset = self.belief_offsets[variable];
                for label in 0..num_labels {
                    let incoming = self.messages[to_variable + label];
                    let message = if incoming.is_finite() {
                        self.beliefs[belief_offset + label] - incoming
                    } else {
                        self.incoming_except(variable, label, to_variable)
                    };
                    self.messages[to_function + label] = message;
                }
                to_function += num_labels;
                to_variable += num_labels;
            }
        }
    }

    fn compute_function_to_variable_messages(&mut self) {
        let model = self.model;
        for index in 0..self.num_terms() {
            let (term, function, scale) = self.term(index);
            if self.iteration > 0 && term.arity() == 1 {
                continue;
            }

            let start = self.variable_to_function_offsets[index];
            let middle = self.function_to_variable_offsets[index];
            let block_len = middle - start;
            let (to_function, to_variable) =
                self.messages[start..middle + block_len].split_at_mut(block_len);
            function.compute_to_variable_messages(to_function, to_variable, scale);

            if self.parameters.normalize_messages {
                let mut offset = 0;
                for &variable in term.variables() {
                    let segment = &mut to_variable[offset..offset + model.num_labels(variable)];
                    let min = segment.iter().copied().fold(f64::INFINITY, f64::min);
                    if min.is_finite() {
                        segment.iter_mut().for_each(|message| *message -= min);
                    }
                    offset += segment.len();
                }
            }
        }
    }

    fn damp_messages(&mut self) {
        let damping = self.parameters.damping;
        if self.iteration == 0 || damping < f64::EPSILON {
            return;
        }
        for (message, &previous) in self.messages.iter_mut().zip(self.previous_messages.iter()) {
            *message = (1. - damping) * *message + damping * previous;
        }
    }

    fn compute_beliefs(&mut self) {
        let model = self.model;
        self.beliefs.fill(0.);
        for index in 0..self.num_terms() {
            let (term, _, _) = self.term(index);
            let mut to_variable = self.function_to_variable_offsets[index];
            for &variable in term.variables() {
                let num_labels = model.num_labels(variable);
                let belief_offset = self.belief_offsets[variable];
                for label in 0..num_labels {
                    self.beliefs[belief_offset + label] += self.messages[to_variable + label];
                }
                to_variable += num_labels;
            }
        }
    }

    // Takes the label of minimal belief for every variable and keeps the labeling if it is
    // strictly better than the best one so far
    fn compute_solution(&mut self) {
        for variable in 0..self.model.num_variables() {
            let beliefs = self.beliefs(variable);
            let mut best_label = 0;
            for (label, &belief) in beliefs.iter().enumerate() {
                if belief < beliefs[best_label] {
                    best_label = label;
                }
            }
            self.current_solution[variable] = best_label;
        }

        self.current_value = self.model.evaluate(self.current_solution.as_slice(), false);
        if self.current_value < self.best_value {
            self.best_value = self.current_value;
            self.best_solution.assign(self.current_solution.as_slice());
        }
    }

    // Euclidean distance between the two message generations
    fn compute_convergence_delta(&self) -> f64 {
        if self.iteration == 0 {
            return f64::INFINITY;
        }
        self.messages
            .iter()
            .zip(self.previous_messages.iter())
            .filter(|(current, previous)| current != previous)
            .map(|(current, previous)| (current - previous).powi(2))
            .sum::<f64>()
            .sqrt()
    }

    fn progress(&self, budget: &TimeBudget) -> Progress {
        Progress {
            iteration: self.iteration,
            best_value: self.best_value,
            current_value: self.current_value,
            elapsed: budget.elapsed(),
        }
    }
}

impl<'a> Optimizer for BeliefPropagation<'a> {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn optimize(
        &mut self,
        mut callback: Option<&mut dyn ReporterCallback>,
        starting_point: Option<&[usize]>,
    ) -> Result<OptimizationStatus, OptimizerError> {
        debug!("In BeliefPropagation::optimize()");
        if let Some(starting_point) = starting_point {
            self.model
                .check_labeling(starting_point)
                .map_err(OptimizerError::InvalidStartingPoint)?;
            self.best_solution.assign(starting_point);
            self.best_value = self.model.evaluate(starting_point, false);
            self.current_solution.assign(starting_point);
            self.current_value = self.best_value;
        }

        let budget = TimeBudget::start(self.parameters.time_limit);
        if let Some(callback) = callback.as_deref_mut() {
            callback.begin(&self.progress(&budget));
        }

        self.state = BeliefPropagationState::IterationLimitReached;
        for _ in 0..self.parameters.max_iterations {
            self.state = BeliefPropagationState::Iterating;
            self.compute_variable_to_function_messages();
            self.compute_function_to_variable_messages();
            self.damp_messages();
            self.compute_beliefs();
            self.compute_solution();

            let delta = self.compute_convergence_delta();
            info!(
                "Iteration {}. Elapsed time {:?}. Delta {}. Current value {}.",
                self.iteration,
                budget.elapsed(),
                delta,
                self.current_value
            );
            self.previous_messages.copy_from_slice(&self.messages);
            self.iteration += 1;

            if delta < self.parameters.convergence_tolerance {
                info!("Messages changed less than by tolerance. Interrupting.");
                self.state = BeliefPropagationState::Converged;
                break;
            }
            if let Some(callback) = callback.as_deref_mut() {
                if !callback.report(&self.progress(&budget)) {
                    self.state = BeliefPropagationState::CallbackExited;
                    break;
                }
            }
            if budget.is_exceeded() {
                info!("Time limit reached. Interrupting.");
                self.state = BeliefPropagationState::TimeLimitReached;
                break;
            }
            self.state = BeliefPropagationState::IterationLimitReached;
        }
        if self.state == BeliefPropagationState::IterationLimitReached {
            info!("Maximum number of iterations reached. Interrupting.");
        }

        if let Some(callback) = callback.as_deref_mut() {
            callback.end(&self.progress(&budget));
        }

        let status = match self.state {
            BeliefPropagationState::Converged => OptimizationStatus::Converged,
            BeliefPropagationState::TimeLimitReached => OptimizationStatus::TimeLimitReached,
            BeliefPropagationState::CallbackExited => OptimizationStatus::CallbackExited,
            _ => OptimizationStatus::IterationLimitReached,
        };
        info!(
            "BeliefPropagation finished with status {}. Elapsed time {:?}. Iterations {}. Best value {}.",
            status,
            budget.elapsed(),
            self.iteration,
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
