use std::fs;
use std::path::Path;

use clap::{ArgAction, Args, Command, FromArgMatches as _};
use log::{info, warn};
use serde_derive::Serialize;

use crate::batch::{multi_run, BatchOptions};
use crate::error::EpiError;
use crate::log::{apply_log_spec, parse_log_spec, set_log_level_from_verbosity};
use crate::model::{Model, SummaryStats};
use crate::parameters::{ParamValue, ParameterAccess, ParameterStore};
use crate::replicate::SimSource;
use crate::report::write_batch_results;
use crate::simulation::Simulation;

/// Default cli arguments for the epiabm runner
#[derive(Args, Debug)]
pub struct BaseArgs {
    /// Random seed; replicate `i` runs with `seed + i`. Defaults to the configured seed
    #[arg(short, long)]
    pub random_seed: Option<u64>,

    /// Optional path for a JSON parameter file
    #[arg(short, long, default_value = "")]
    pub config: String,

    /// Number of replicates
    #[arg(short = 'n', long, default_value_t = 4)]
    pub replicates: usize,

    /// Standard deviation of the multiplicative noise applied to the noise parameter
    #[arg(long, default_value_t = 0.0)]
    pub noise: f64,

    /// Parameter the noise is applied to; guessed when omitted
    #[arg(long)]
    pub noise_parameter: Option<String>,

    /// Size of the worker pool; defaults to one thread per core
    #[arg(short, long)]
    pub threads: Option<usize>,

    /// Merge the replicates into a single simulation (experimental)
    #[arg(long)]
    pub combine: bool,

    /// Set a parameter before running, e.g. `--set beta=0.1`. May be repeated
    #[arg(short = 's', long = "set", value_name = "KEY=VALUE", value_parser = parse_override)]
    pub overrides: Vec<(String, ParamValue)>,

    /// Optional path for report output
    #[arg(short, long, default_value = "")]
    pub output_dir: String,

    /// Optional path to a JSON array of observed daily diagnoses to compute likelihoods against
    #[arg(long, default_value = "")]
    pub observed: String,

    /// Log level specification, e.g. `info` or `warn,epiabm::batch=debug`
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Increase verbosity; may be repeated
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

/// One line of run output.
#[derive(Debug, PartialEq, Serialize)]
pub struct ReplicateReport {
    pub replicate: usize,
    pub seed: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<SummaryStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub likelihood: Option<f64>,
}

/// Parses a `key=value` override. The value is read as JSON when possible and as text otherwise.
fn parse_override(raw: &str) -> Result<(String, ParamValue), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), ParamValue::parse(value.trim())))
        }
        _ => Err(format!("expected KEY=VALUE, got {raw:?}")),
    }
}

fn create_epiabm_cli() -> Command {
    let cli = Command::new("epiabm");
    BaseArgs::augment_args(cli)
}

// Hooks the model does not provide are left out of the output.
fn optional<T>(result: Result<T, EpiError>) -> Result<Option<T>, EpiError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(EpiError::NotImplemented(hook)) => {
            warn!("{hook} is not implemented for this model; leaving it out of the output");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Summary statistics and, when observations are given, the likelihood of every simulation.
///
/// # Errors
///
/// Any error other than [`EpiError::NotImplemented`] reported by the model's hooks.
pub fn replicate_reports<M: Model>(
    sims: &[Simulation<M>],
    observed: Option<&[f64]>,
) -> Result<Vec<ReplicateReport>, EpiError> {
    sims.iter()
        .enumerate()
        .map(|(replicate, sim)| {
            let likelihood = match observed {
                Some(observed) => optional(sim.likelihood(observed))?,
                None => None,
            };
            Ok(ReplicateReport {
                replicate,
                seed: sim.pars().seed,
                summary: optional(sim.summary_stats())?,
                likelihood,
            })
        })
        .collect()
}

/// Runs a batch of simulations configured from the command line.
///
/// `setup_fn` builds the template simulation with the model's default parameters. The config
/// file, `--set` overrides and `--random-seed` are applied on top of it, then the replicates run
/// and a JSON array of [`ReplicateReport`]s is printed on stdout.
///
/// # Errors
/// Returns an error if argument parsing, the setup function or any replicate fails
pub fn run_with_args<M, F>(setup_fn: F) -> Result<Vec<Simulation<M>>, Box<dyn std::error::Error>>
where
    M: Model + Clone + Send + Sync,
    F: FnOnce(&BaseArgs) -> Result<Simulation<M>, EpiError>,
{
    let cli = create_epiabm_cli();
    let matches = cli.get_matches();

    let base_args_matches = BaseArgs::from_arg_matches(&matches)?;
    run_with_args_internal(base_args_matches, setup_fn)
}

fn run_with_args_internal<M, F>(
    args: BaseArgs,
    setup_fn: F,
) -> Result<Vec<Simulation<M>>, Box<dyn std::error::Error>>
where
    M: Model + Clone + Send + Sync,
    F: FnOnce(&BaseArgs) -> Result<Simulation<M>, EpiError>,
{
    match &args.log_level {
        Some(spec) => apply_log_spec(&parse_log_spec(spec)?),
        // Warnings are always shown
        None => set_log_level_from_verbosity(args.verbose),
    }

    let mut sim = setup_fn(&args)?;

    // Optionally set parameters from a file
    if !args.config.is_empty() {
        info!("Loading parameters from: {}", args.config);
        let config = ParameterStore::from_json_file(Path::new(&args.config))?;
        sim.update_parameters(config.iter().map(|(key, value)| (key, value.clone())))?;
    }
    sim.update_parameters(args.overrides.iter().cloned())?;
    if let Some(seed) = args.random_seed {
        sim.set_seed(Some(seed), false)?;
    }
    if args.verbose > 0 {
        sim.pars_mut().verbose = args.verbose;
    }

    let options = BatchOptions {
        replicates: args.replicates,
        noise: args.noise,
        noise_parameter: args.noise_parameter.clone(),
        verbose: (args.verbose > 0).then_some(args.verbose),
        combine: args.combine,
        threads: args.threads,
        ..BatchOptions::default()
    };
    let sims = multi_run(SimSource::Template(&sim), &options)?.into_sims();

    // Optionally write reports
    if !args.output_dir.is_empty() {
        let paths = write_batch_results(Path::new(&args.output_dir), "results", &sims)?;
        info!("Wrote {} report files to {}", paths.len(), args.output_dir);
    }

    let observed: Option<Vec<f64>> = if args.observed.is_empty() {
        None
    } else {
        Some(serde_json::from_str(&fs::read_to_string(&args.observed)?)?)
    };
    let reports = replicate_reports(&sims, observed.as_deref())?;
    println!("{}", serde_json::to_string_pretty(&reports)?);

    Ok(sims)
}
