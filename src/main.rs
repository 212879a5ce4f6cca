use std::{fs::File, io::BufReader, path::PathBuf, time::Instant};

use discrete_gm::{
    io::uai::{read_uai, UaiError},
    BeliefPropagation, BeliefPropagationParameters, DenseFunction, Icm, IcmParameters, LabelSpace,
    Model, ModelError, Optimizer, Potts,
};
use log::{error, info};

// Five binary variables on a chain, unary costs (0, 1) and Potts(1) couplings
fn chain_model() -> Result<Model, ModelError> {
    let mut model = Model::new(LabelSpace::simple(5, 2)?);
    let unary = model.add_energy_function(DenseFunction::unary(vec![0., 1.]));
    let potts = model.add_energy_function(Potts::new(2, 1.));
    for variable in 0..5 {
        model.add_factor(vec![variable], unary)?;
    }
    for variable in 1..5 {
        model.add_factor(vec![variable - 1, variable], potts)?;
    }
    Ok(model)
}

fn read_model(path: &PathBuf) -> Result<Model, UaiError> {
    let file = File::open(path)?;
    read_uai(BufReader::new(file), false)
}

fn solve(model: &Model) {
    info!(
        "Model with {} variables, {} factors, {} constraints.",
        model.num_variables(),
        model.num_factors(),
        model.num_constraints()
    );

    let mut icm = Icm::new(model, IcmParameters::default());
    match icm.optimize(None, None) {
        Ok(status) => info!(
            "ICM: status {}, value {}, labeling {}.",
            status,
            icm.best_solution_value(),
            icm.best_solution()
        ),
        Err(err) => error!("ICM failed: {}", err),
    }

    let bp = BeliefPropagation::new(model, BeliefPropagationParameters::default());
    match bp {
        Ok(mut bp) => match bp.optimize(None, None) {
            Ok(status) => info!(
                "BeliefPropagation: status {}, value {}, labeling {}.",
                status,
                bp.best_solution_value(),
                bp.best_solution()
            ),
            Err(err) => error!("BeliefPropagation failed: {}", err),
        },
        Err(err) => error!("BeliefPropagation failed: {}", err),
    }
}

fn main() {
    // Default to info-level logging, RUST_LOG takes precedence
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let paths: Vec<PathBuf> = std::env::args().skip(1).map(PathBuf::from).collect();
    if paths.is_empty() {
        info!("No input files given, solving the five-variable chain.");
        match chain_model() {
            Ok(model) => solve(&model),
            Err(err) => error!("Cannot build the chain model: {}", err),
        }
        return;
    }

    for path in paths {
        info!("Processing instance {:?}.", path);
        let time_start = Instant::now();
        let model = match read_model(&path) {
            Ok(model) => model,
            Err(err) => {
                error!("Cannot read {:?}: {}", path, err);
                continue;
            }
        };
        info!(
            "UAI import complete. Elapsed time {:?}.",
            time_start.elapsed()
        );
        solve(&model);
        info!("Finished processing instance {:?}.", path);
    }
}
