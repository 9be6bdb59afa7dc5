//! Running many replicates in parallel.
//!
//! Each replicate is fully independent given its seed and parameter overrides, so replicates are
//! fanned out over a rayon pool with no synchronization beyond the shared, read-only template.
//! The first failing replicate aborts the batch.

use indexmap::IndexMap;
use log::{info, warn};
use rayon::prelude::*;

use crate::error::EpiError;
use crate::model::Model;
use crate::parameters::{ParamValue, ParameterAccess};
use crate::replicate::{single_run, ReplicateOptions, SimSource};
use crate::simulation::Simulation;

#[derive(Clone, Debug)]
pub struct BatchOptions {
    /// Number of replicates. Ignored when `iter_parameters` is non-empty.
    pub replicates: usize,
    pub noise: f64,
    pub noise_parameter: Option<String>,
    /// Per-replicate parameter values: replicate `i` gets the `i`th value of every entry.
    pub iter_parameters: IndexMap<String, Vec<ParamValue>>,
    pub verbose: Option<u8>,
    /// Merge the replicates into a single simulation (experimental).
    pub combine: bool,
    /// Parameter values applied to every replicate.
    pub overrides: Vec<(String, ParamValue)>,
    /// Size of a dedicated worker pool. Uses the global rayon pool when `None`.
    pub threads: Option<usize>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        BatchOptions {
            replicates: 4,
            noise: 0.0,
            noise_parameter: None,
            iter_parameters: IndexMap::new(),
            verbose: None,
            combine: false,
            overrides: Vec::new(),
            threads: None,
        }
    }
}

/// The outcome of [`multi_run`].
#[derive(Debug)]
pub enum BatchOutput<M> {
    /// Every replicate, ordered by replicate index.
    Replicates(Vec<Simulation<M>>),
    /// All replicates merged into one simulation.
    Combined(Simulation<M>),
}

impl<M> BatchOutput<M> {
    /// Flattens the output into a list of simulations.
    pub fn into_sims(self) -> Vec<Simulation<M>> {
        match self {
            BatchOutput::Replicates(sims) => sims,
            BatchOutput::Combined(sim) => vec![sim],
        }
    }
}

/// Number of replicates a batch will run.
///
/// # Errors
///
/// [`EpiError::LengthMismatch`] if the `iter_parameters` sequences differ in length.
pub fn replicate_count(options: &BatchOptions) -> Result<usize, EpiError> {
    let mut count: Option<usize> = None;
    for (key, values) in &options.iter_parameters {
        match count {
            Some(expected) if expected != values.len() => {
                return Err(EpiError::LengthMismatch {
                    key: key.clone(),
                    expected,
                    found: values.len(),
                });
            }
            _ => count = Some(values.len()),
        }
    }
    Ok(count.unwrap_or(options.replicates))
}

/// Options for replicate `index`: the shared overrides followed by that replicate's
/// `iter_parameters` values.
fn replicate_options(options: &BatchOptions, index: usize) -> ReplicateOptions {
    let mut overrides = options.overrides.clone();
    overrides.extend(
        options
            .iter_parameters
            .iter()
            .map(|(key, values)| (key.clone(), values[index].clone())),
    );
    ReplicateOptions {
        index,
        noise: options.noise,
        noise_parameter: options.noise_parameter.clone(),
        verbose: options.verbose,
        overrides,
    }
}

/// Runs a batch of replicates in parallel.
///
/// Replicate `i` is a copy of the source simulation with seed `seed + i`; see
/// [`single_run`]. All argument checks happen before any replicate starts.
///
/// # Errors
///
/// * [`EpiError::LengthMismatch`] if the `iter_parameters` sequences differ in length.
/// * [`EpiError::UnknownOverride`] if an override or iterated parameter is unknown.
/// * The first error reported by a replicate.
/// * [`EpiError::EmptyBatch`] when combining zero replicates.
pub fn multi_run<M>(
    source: SimSource<'_, M>,
    options: &BatchOptions,
) -> Result<BatchOutput<M>, EpiError>
where
    M: Model + Clone + Send + Sync,
{
    let n = replicate_count(options)?;

    let built;
    let template = match source {
        SimSource::Template(template) => template,
        SimSource::Build(pars, model) => {
            built = Simulation::new(pars, model);
            &built
        }
    };

    let names = options
        .overrides
        .iter()
        .map(|(key, _)| key)
        .chain(options.iter_parameters.keys());
    for key in names {
        if !template.has_parameter(key) {
            return Err(EpiError::UnknownOverride(key.clone()));
        }
    }

    info!("Running {n} replicates");
    let run = || -> Result<Vec<Simulation<M>>, EpiError> {
        (0..n)
            .into_par_iter()
            .map(|index| {
                single_run(
                    SimSource::Template(template),
                    &replicate_options(options, index),
                )
            })
            .collect()
    };
    let sims = match options.threads {
        Some(threads) => rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| EpiError::Other(format!("Could not build worker pool: {e}")))?
            .install(run)?,
        None => run()?,
    };

    if options.combine {
        Ok(BatchOutput::Combined(combine(sims)?))
    } else {
        Ok(BatchOutput::Replicates(sims))
    }
}

/// Merges replicates into the first one.
///
/// Records the replicate count in `parallelized`, multiplies `pop_size` by it, appends every
/// other replicate's agents under fresh identifiers and sums every result series. This is an
/// approximation rather than a rigorous merge: summary statistics that depend on population
/// structure are not meaningful on the result.
///
/// # Errors
///
/// [`EpiError::EmptyBatch`] if `sims` is empty and [`EpiError::SeriesMismatch`] if result series
/// differ in length.
pub fn combine<M: Model>(sims: Vec<Simulation<M>>) -> Result<Simulation<M>, EpiError> {
    warn!("Combining replicates is experimental and not a rigorous merge");
    let n = sims.len();
    let mut sims = sims.into_iter();
    let mut output = sims.next().ok_or(EpiError::EmptyBatch)?;

    output.pars_mut().parallelized = n;
    output.pars_mut().pop_size *= n;
    for sim in sims {
        let state = sim.into_state();
        output.state_mut().results_mut().accumulate(state.results())?;
        output.state_mut().absorb_people(state);
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::{ParameterStore, SimParameters};
    use crate::simulation::SimState;

    /// Adds one agent and counts one "infection" per day.
    #[derive(Clone, Debug, Default)]
    struct Counter;

    impl Model for Counter {
        fn init_results(&mut self, sim: &mut SimState) -> Result<(), EpiError> {
            let npts = sim.npts();
            sim.results_mut().add_series("cases", npts);
            Ok(())
        }

        fn init_people(&mut self, sim: &mut SimState) -> Result<(), EpiError> {
            let seed = i64::try_from(sim.pars().seed).unwrap_or_default();
            sim.add_person(ParameterStore::from_pairs([("seed", seed)]));
            Ok(())
        }

        fn run(&mut self, sim: &mut SimState) -> Result<(), EpiError> {
            for value in sim.results_mut().series_mut("cases")? {
                *value = 1.0;
            }
            Ok(())
        }
    }

    fn template() -> Simulation<Counter> {
        let mut pars = SimParameters::default();
        pars.seed = 20;
        pars.n_days = 2;
        pars.pop_size = 1;
        let pars = pars.with_extra(ParameterStore::from_pairs([
            ("beta", ParamValue::Float(0.1)),
            ("contacts", ParamValue::Int(5)),
        ]));
        Simulation::new(pars, Counter)
    }

    #[test]
    fn replicates_get_consecutive_seeds() {
        let template = template();
        let options = BatchOptions {
            replicates: 3,
            ..BatchOptions::default()
        };
        let sims = match multi_run(SimSource::Template(&template), &options).unwrap() {
            BatchOutput::Replicates(sims) => sims,
            BatchOutput::Combined(_) => panic!("expected replicates"),
        };
        let seeds: Vec<u64> = sims.iter().map(|sim| sim.pars().seed).collect();
        assert_eq!(seeds, vec![20, 21, 22]);
        assert_eq!(template.pars().seed, 20);
    }

    #[test]
    fn default_replicate_count() {
        let options = BatchOptions::default();
        assert_eq!(replicate_count(&options).unwrap(), 4);
    }

    #[test]
    fn iter_parameters_set_count_and_values() {
        let template = template();
        let mut iter_parameters = IndexMap::new();
        iter_parameters.insert(
            "contacts".to_string(),
            vec![ParamValue::Int(1), ParamValue::Int(2)],
        );
        let options = BatchOptions {
            replicates: 10,
            iter_parameters,
            ..BatchOptions::default()
        };
        let sims = multi_run(SimSource::Template(&template), &options)
            .unwrap()
            .into_sims();
        assert_eq!(sims.len(), 2);
        assert_eq!(
            sims[0].get_parameter("contacts").unwrap(),
            ParamValue::Int(1)
        );
        assert_eq!(
            sims[1].get_parameter("contacts").unwrap(),
            ParamValue::Int(2)
        );
    }

    #[test]
    fn mismatched_iter_parameters() {
        let template = template();
        let mut iter_parameters = IndexMap::new();
        iter_parameters.insert("a".to_string(), vec![ParamValue::Int(1), ParamValue::Int(2)]);
        iter_parameters.insert(
            "b".to_string(),
            vec![ParamValue::Int(1), ParamValue::Int(2), ParamValue::Int(3)],
        );
        let options = BatchOptions {
            iter_parameters,
            ..BatchOptions::default()
        };
        let err = multi_run(SimSource::Template(&template), &options).unwrap_err();
        assert!(matches!(
            err,
            EpiError::LengthMismatch {
                expected: 2,
                found: 3,
                ..
            }
        ));
    }

    #[test]
    fn unknown_override_rejected_before_dispatch() {
        let template = template();
        let options = BatchOptions {
            overrides: vec![("gamma".to_string(), ParamValue::Float(1.0))],
            ..BatchOptions::default()
        };
        let err = multi_run(SimSource::Template(&template), &options).unwrap_err();
        assert!(matches!(err, EpiError::UnknownOverride(ref key) if key == "gamma"));
    }

    #[test]
    fn dedicated_pool_matches_global_pool() {
        let template = template();
        let options = BatchOptions {
            replicates: 3,
            noise: 0.2,
            ..BatchOptions::default()
        };
        let global = multi_run(SimSource::Template(&template), &options)
            .unwrap()
            .into_sims();
        let pooled = multi_run(
            SimSource::Template(&template),
            &BatchOptions {
                threads: Some(2),
                ..options
            },
        )
        .unwrap()
        .into_sims();
        for (a, b) in global.iter().zip(&pooled) {
            assert_eq!(a.pars(), b.pars());
        }
    }

    #[test]
    fn combine_merges_replicates() {
        let options = BatchOptions {
            replicates: 3,
            combine: true,
            ..BatchOptions::default()
        };
        let sim = match multi_run(SimSource::Build(template().pars().clone(), Counter), &options)
            .unwrap()
        {
            BatchOutput::Combined(sim) => sim,
            BatchOutput::Replicates(_) => panic!("expected a combined simulation"),
        };
        assert_eq!(sim.pars().parallelized, 3);
        assert_eq!(sim.pars().pop_size, 3);
        assert_eq!(sim.n(), 3);
        assert_eq!(sim.results().get("cases"), Some(&[3.0, 3.0, 3.0][..]));
        // Agents keep their attributes but are re-keyed
        let seeds: Vec<ParamValue> = (0..3)
            .map(|i| sim.get_person(i).unwrap().get_parameter("seed").unwrap())
            .collect();
        assert_eq!(
            seeds,
            vec![ParamValue::Int(20), ParamValue::Int(21), ParamValue::Int(22)]
        );
    }

    #[test]
    fn combine_empty_batch() {
        let sims: Vec<Simulation<Counter>> = Vec::new();
        assert!(matches!(combine(sims), Err(EpiError::EmptyBatch)));
    }
}
