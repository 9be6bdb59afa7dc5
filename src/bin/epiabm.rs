use std::process::ExitCode;

use epiabm::prelude::*;

fn main() -> ExitCode {
    let result = run_with_args(|_args| Ok(Simulation::new(default_parameters(), WellMixedSir)));
    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
