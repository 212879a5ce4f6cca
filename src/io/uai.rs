use std::{
    io::{self, BufRead, Write},
    mem,
    str::FromStr,
    time::Instant,
};

use log::{debug, warn};
use thiserror::Error;

use crate::{
    functions::{dense::DenseFunction, function_trait::DiscreteFunction},
    gm::{errors::ModelError, model::Model},
    spaces::label_space::LabelSpace,
};

/// Errors raised while reading or writing models in UAI format.
#[derive(Debug, Error)]
pub enum UaiError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("{0}")]
    Unsupported(String),
}

// States for reading UAI files
enum UaiState {
    ModelType,
    NumberOfVariables,
    DomainSizes,
    NumberOfFunctions,
    FunctionScopes(usize),      // function index
    NumberOfTableValues(usize), // function index
    TableValues(usize, usize),  // function index, function table size
    EndOfFile,
}

fn parse_error(line: usize, message: impl Into<String>) -> UaiError {
    UaiError::Parse {
        line,
        message: message.into(),
    }
}

fn parse_numbers<T: FromStr>(line_number: usize, line: &str) -> Result<Vec<T>, UaiError> {
    line.split_whitespace()
        .map(|token| {
            token
                .parse::<T>()
                .map_err(|_| parse_error(line_number, format!("cannot parse `{token}`")))
        })
        .collect()
}

fn parse_single<T: FromStr>(line_number: usize, line: &str) -> Result<T, UaiError> {
    let mut numbers = parse_numbers::<T>(line_number, line)?;
    if numbers.len() != 1 {
        return Err(parse_error(line_number, "expected a single number"));
    }
    Ok(numbers.remove(0))
}

// Energy of a table entry: negative logarithm of a potential, or the negated value in LG format
fn entry_to_energy(line_number: usize, value: f64, lg: bool) -> Result<f64, UaiError> {
    if lg {
        return Ok(-value);
    }
    if !(value >= 0.) {
        return Err(parse_error(
            line_number,
            format!("potential {value} is negative"),
        ));
    }
    Ok(-value.ln())
}

fn energy_to_entry(energy: f64, lg: bool) -> f64 {
    if lg {
        -energy
    } else {
        (-energy).exp()
    }
}

/// Reads a MARKOV network in UAI format.
///
/// Every function becomes a dense energy function with its own factor. Potentials are turned
/// into energies by `-ln p`; if `lg` is set the file holds logarithms and energies are `-v`.
/// The format is described [here](https://uaicompetition.github.io/uci-2022/file-formats/model-format/).
pub fn read_uai<R: BufRead>(reader: R, lg: bool) -> Result<Model, UaiError> {
    debug!("In read_uai() with lg option {}", lg);
    let time_start = Instant::now();

    let mut state = UaiState::ModelType;
    let mut model = None;
    let mut num_variables = 0;
    let mut function_scopes: Vec<Vec<usize>> = Vec::new();
    let mut num_functions = 0;
    let mut function_entries = Vec::new();
    let mut line_number = 0;

    for line in reader.lines() {
        let line = line?;
        line_number += 1;
        let trimmed_line = line.trim();
        if trimmed_line.is_empty() {
            continue;
        }

        match state {
            UaiState::ModelType => {
                debug!("Reading model type");
                if trimmed_line != "MARKOV" {
                    return Err(parse_error(
                        line_number,
                        format!("only MARKOV networks are supported, got `{trimmed_line}`"),
                    ));
                }
                state = UaiState::NumberOfVariables;
            }
            UaiState::NumberOfVariables => {
                debug!("Reading number of variables");
                num_variables = parse_single::<usize>(line_number, trimmed_line)?;
                state = UaiState::DomainSizes;
            }
            UaiState::DomainSizes => {
                debug!("Reading domain sizes");
                let domain_sizes = parse_numbers::<usize>(line_number, trimmed_line)?;
                if domain_sizes.len() != num_variables {
                    return Err(parse_error(
                        line_number,
                        format!(
                            "expected {} domain sizes, got {}",
                            num_variables,
                            domain_sizes.len()
                        ),
                    ));
                }
                model = Some(Model::new(LabelSpace::from_num_labels(domain_sizes)?));
                state = UaiState::NumberOfFunctions;
            }
            UaiState::NumberOfFunctions => {
                debug!("Reading number of functions");
                num_functions = parse_single::<usize>(line_number, trimmed_line)?;
                function_scopes = Vec::with_capacity(num_functions);
                state = if num_functions > 0 {
                    UaiState::FunctionScopes(0)
                } else {
                    UaiState::EndOfFile
                };
            }
            UaiState::FunctionScopes(function_index) => {
                debug!("Reading scope of function {}", function_index);
                let function_desc = parse_numbers::<usize>(line_number, trimmed_line)?;
                let (scope_len, function_scope) = function_desc.split_at(1);
                if scope_len[0] != function_scope.len() {
                    return Err(parse_error(
                        line_number,
                        format!(
                            "scope announces {} variables, lists {}",
                            scope_len[0],
                            function_scope.len()
                        ),
                    ));
                }
                function_scopes.push(function_scope.to_vec());
                state = if function_index + 1 < num_functions {
                    UaiState::FunctionScopes(function_index + 1)
                } else {
                    UaiState::NumberOfTableValues(0)
                };
            }
            UaiState::NumberOfTableValues(function_index) => {
                debug!("Reading function table size of function {}", function_index);
                let num_entries = parse_single::<usize>(line_number, trimmed_line)?;
                function_entries = Vec::with_capacity(num_entries);
                state = UaiState::TableValues(function_index, num_entries);
            }
            UaiState::TableValues(function_index, num_entries) => {
                for value in parse_numbers::<f64>(line_number, trimmed_line)? {
                    function_entries.push(entry_to_energy(line_number, value, lg)?);
                }
                if function_entries.len() > num_entries {
                    return Err(parse_error(
                        line_number,
                        format!("function {function_index} has more than {num_entries} entries"),
                    ));
                }
                if function_entries.len() < num_entries {
                    continue;
                }
                debug!(
                    "Reading function {}. Collected all {} entries.",
                    function_index, num_entries
                );

                let model = model
                    .as_mut()
                    .ok_or_else(|| parse_error(line_number, "table before domain sizes"))?;
                let scope = mem::take(&mut function_scopes[function_index]);
                if let Some(&variable) = scope.iter().find(|&&v| v >= model.num_variables()) {
                    return Err(ModelError::InvalidVariable {
                        variable,
                        num_variables: model.num_variables(),
                    }
                    .into());
                }
                let shape: Vec<usize> = scope.iter().map(|&v| model.num_labels(v)).collect();
                let table = mem::take(&mut function_entries);
                let function = DenseFunction::from_shape_vec(&shape, table)?;
                let handle = model.add_energy_function(function);
                model.add_factor(scope, handle)?;

                state = if function_index + 1 < num_functions {
                    UaiState::NumberOfTableValues(function_index + 1)
                } else {
                    UaiState::EndOfFile
                };
            }
            UaiState::EndOfFile => {
                warn!("Ignored trailing line at the end of file: {}", line);
            }
        }
    }

    if !matches!(state, UaiState::EndOfFile) {
        return Err(parse_error(line_number + 1, "unexpected end of file"));
    }
    let model = model.ok_or_else(|| parse_error(line_number, "missing domain sizes"))?;
    debug!(
        "UAI import complete. Elapsed time {:?}.",
        time_start.elapsed()
    );
    Ok(model)
}

fn vec_to_string<T: ToString>(values: &[T]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Writes the factors of `model` as a MARKOV network in UAI format, one function per factor.
///
/// Constraints have no counterpart in the format, so models with constraints are rejected.
pub fn write_uai<W: Write>(model: &Model, mut writer: W, lg: bool) -> Result<(), UaiError> {
    debug!("In write_uai() with lg option {}", lg);
    if model.num_constraints() > 0 {
        return Err(UaiError::Unsupported(
            "constraints cannot be written in UAI format".to_string(),
        ));
    }
    let time_start = Instant::now();

    debug!("Writing preamble: graph type, variables, and domain sizes");
    writeln!(writer, "MARKOV")?;
    writeln!(writer, "{}", model.num_variables())?;
    writeln!(writer, "{}", vec_to_string(&model.space().label_counts()))?;

    debug!("Writing number of functions");
    writeln!(writer, "{}", model.num_factors())?;

    debug!("Writing function scopes");
    for factor in model.factors() {
        writeln!(
            writer,
            "{} {}",
            factor.arity(),
            vec_to_string(factor.variables())
        )?;
    }

    debug!("Writing function tables");
    let mut table = Vec::new();
    for index in 0..model.num_factors() {
        let function = model.factor_function(index);
        table.resize(function.size(), 0.);
        function.copy_values(&mut table);
        let entries: Vec<f64> = table
            .iter()
            .map(|&energy| energy_to_entry(energy, lg))
            .collect();
        writeln!(writer)?;
        writeln!(writer, "{}", entries.len())?;
        writeln!(writer, "{}", vec_to_string(&entries))?;
    }

    writer.flush()?;
    debug!(
        "UAI export complete. Elapsed time {:?}.",
        time_start.elapsed()
    );
    Ok(())
}
