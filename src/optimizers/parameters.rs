use std::{collections::BTreeMap, time::Duration};

use crate::gm::errors::OptimizerError;

#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<bool> for ParameterValue {
    fn from(value: bool) -> Self {
        ParameterValue::Bool(value)
    }
}

impl From<i64> for ParameterValue {
    fn from(value: i64) -> Self {
        ParameterValue::Int(value)
    }
}

impl From<i32> for ParameterValue {
    fn from(value: i32) -> Self {
        ParameterValue::Int(value.into())
    }
}

impl From<usize> for ParameterValue {
    fn from(value: usize) -> Self {
        ParameterValue::Int(value as i64)
    }
}

impl From<f64> for ParameterValue {
    fn from(value: f64) -> Self {
        ParameterValue::Float(value)
    }
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        ParameterValue::Text(value.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(value: String) -> Self {
        ParameterValue::Text(value)
    }
}

/// Flat, string-keyed optimizer options.
///
/// Each optimizer takes the names it understands out of the bag and rejects whatever is left,
/// so a misspelled option is an error instead of being silently ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptimizerParameters {
    values: BTreeMap<String, ParameterValue>,
}

impl OptimizerParameters {
    pub fn new() -> Self {
        OptimizerParameters::default()
    }

    pub fn set(&mut self, name: &str, value: impl Into<ParameterValue>) -> &mut Self {
        self.values.insert(name.to_string(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&ParameterValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    // Removes a real-valued option; integers are accepted as well
    pub fn take_f64(&mut self, name: &str) -> Result<Option<f64>, OptimizerError> {
        match self.values.remove(name) {
            None => Ok(None),
            Some(ParameterValue::Float(value)) => Ok(Some(value)),
            Some(ParameterValue::Int(value)) => Ok(Some(value as f64)),
            Some(other) => Err(wrong_kind(name, "a number", &other)),
        }
    }

    // Removes a non-negative integer option
    pub fn take_usize(&mut self, name: &str) -> Result<Option<usize>, OptimizerError> {
        match self.values.remove(name) {
            None => Ok(None),
            Some(ParameterValue::Int(value)) => usize::try_from(value)
                .map(Some)
                .map_err(|_| wrong_kind(name, "a non-negative integer", &ParameterValue::Int(value))),
            Some(other) => Err(wrong_kind(name, "a non-negative integer", &other)),
        }
    }

    pub fn take_u64(&mut self, name: &str) -> Result<Option<u64>, OptimizerError> {
        Ok(self.take_usize(name)?.map(|value| value as u64))
    }

    // Removes a boolean option; 0 and 1 are accepted as well
    pub fn take_bool(&mut self, name: &str) -> Result<Option<bool>, OptimizerError> {
        match self.values.remove(name) {
            None => Ok(None),
            Some(ParameterValue::Bool(value)) => Ok(Some(value)),
            Some(ParameterValue::Int(0)) => Ok(Some(false)),
            Some(ParameterValue::Int(1)) => Ok(Some(true)),
            Some(other) => Err(wrong_kind(name, "a boolean", &other)),
        }
    }

    // Removes the common `time_limit_ms` option
    pub fn take_time_limit(&mut self) -> Result<Option<Duration>, OptimizerError> {
        Ok(self
            .take_u64("time_limit_ms")?
            .map(Duration::from_millis))
    }

    // Fails if any option was not taken by the optimizer
    pub fn ensure_all_handled(&self, optimizer: &str) -> Result<(), OptimizerError> {
        if self.values.is_empty() {
            return Ok(());
        }
        Err(OptimizerError::UnknownParameter {
            optimizer: optimizer.to_string(),
            names: self
                .values
                .keys()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", "),
        })
    }
}

fn wrong_kind(name: &str, expected: &str, value: &ParameterValue) -> OptimizerError {
    OptimizerError::InvalidParameter {
        name: name.to_string(),
        reason: format!("expected {expected}, got {value:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_access_removes_options() {
        let mut parameters = OptimizerParameters::new();
        parameters
            .set("damping", 0.5)
            .set("max_iterations", 10)
            .set("normalize_messages", false);

        assert_eq!(parameters.take_f64("damping").unwrap(), Some(0.5));
        assert_eq!(parameters.take_usize("max_iterations").unwrap(), Some(10));
        assert_eq!(parameters.take_bool("normalize_messages").unwrap(), Some(false));
        assert_eq!(parameters.take_f64("damping").unwrap(), None);
        assert!(parameters.ensure_all_handled("Test").is_ok());
    }

    #[test]
    fn leftovers_are_rejected() {
        let mut parameters = OptimizerParameters::new();
        parameters.set("dampnig", 0.5).set("colour", "blue");
        let error = parameters.ensure_all_handled("BeliefPropagation").unwrap_err();
        assert_eq!(
            error,
            OptimizerError::UnknownParameter {
                optimizer: "BeliefPropagation".to_string(),
                names: "colour, dampnig".to_string()
            }
        );
    }

    #[test]
    fn wrong_kinds_are_rejected() {
        let mut parameters = OptimizerParameters::new();
        parameters.set("max_iterations", -3).set("damping", "high");
        assert!(parameters.take_usize("max_iterations").is_err());
        assert!(parameters.take_f64("damping").is_err());
    }

    #[test]
    fn integers_are_accepted_as_numbers() {
        let mut parameters = OptimizerParameters::new();
        parameters.set("constraint_scaling", 10).set("time_limit_ms", 250);
        assert_eq!(parameters.take_f64("constraint_scaling").unwrap(), Some(10.));
        assert_eq!(
            parameters.take_time_limit().unwrap(),
            Some(Duration::from_millis(250))
        );
    }
}
