//! Running one replicate of a simulation.
//!
//! A replicate is an independent copy of a simulation with its own seed (the template's seed
//! offset by the replicate index) and, optionally, one parameter perturbed by multiplicative
//! noise. The template is never modified.

use log::{debug, info};
use rand_distr::StandardNormal;

use crate::error::EpiError;
use crate::model::Model;
use crate::parameters::{ParamValue, ParameterAccess, SimParameters};
use crate::simulation::Simulation;

/// Parameters tried, in order, when the noise parameter is not named explicitly.
pub const NOISE_PARAMETER_CANDIDATES: [&str; 3] = ["r_contact", "r0", "beta"];

/// Where a replicate comes from.
pub enum SimSource<'a, M> {
    /// Deep-copy an existing simulation.
    Template(&'a Simulation<M>),
    /// Construct a new simulation.
    Build(SimParameters, M),
}

#[derive(Clone, Debug, Default)]
pub struct ReplicateOptions {
    /// Replicate index; added to the seed.
    pub index: usize,
    /// Standard deviation of the noise applied to the noise parameter. Zero means no noise.
    pub noise: f64,
    /// Parameter to perturb. Guessed from [`NOISE_PARAMETER_CANDIDATES`] when `None`.
    pub noise_parameter: Option<String>,
    /// Overrides the simulation's `verbose` parameter.
    pub verbose: Option<u8>,
    /// Parameter values applied after the noise, by name.
    pub overrides: Vec<(String, ParamValue)>,
}

/// Picks the parameter to perturb.
///
/// # Errors
///
/// [`EpiError::NoiseParameter`] when no name is given and not exactly one of
/// [`NOISE_PARAMETER_CANDIDATES`] is a parameter.
pub fn resolve_noise_parameter<P: ParameterAccess>(
    pars: &P,
    explicit: Option<&str>,
) -> Result<String, EpiError> {
    if let Some(name) = explicit {
        return Ok(name.to_string());
    }
    let found: Vec<String> = NOISE_PARAMETER_CANDIDATES
        .iter()
        .filter(|candidate| pars.has_parameter(candidate))
        .map(ToString::to_string)
        .collect();
    match found.as_slice() {
        [name] => Ok(name.clone()),
        _ => Err(EpiError::NoiseParameter {
            candidates: NOISE_PARAMETER_CANDIDATES
                .iter()
                .map(ToString::to_string)
                .collect(),
            found,
        }),
    }
}

/// Turns a normally distributed fractional error into a strictly positive multiplier:
/// `1 + draw` for positive draws and `1 / (1 - draw)` otherwise.
pub fn noise_factor(draw: f64) -> f64 {
    if draw > 0.0 {
        1.0 + draw
    } else {
        1.0 / (1.0 - draw)
    }
}

/// Runs a single replicate and returns it. The replicate is always initialized afresh after
/// seeding, noise and overrides.
///
/// # Errors
///
/// * [`EpiError::NoiseParameter`] if the noise parameter cannot be determined.
/// * [`EpiError::UnknownParameter`] or [`EpiError::ParameterType`] if the noise parameter does
///   not exist or is not numeric.
/// * [`EpiError::UnknownOverride`] if an override names an unknown parameter.
/// * Anything the model reports while running.
pub fn single_run<M: Model + Clone>(
    source: SimSource<'_, M>,
    options: &ReplicateOptions,
) -> Result<Simulation<M>, EpiError> {
    let mut sim = match source {
        SimSource::Template(template) => template.clone(),
        SimSource::Build(pars, model) => Simulation::new(pars, model),
    };

    let verbose = options.verbose.unwrap_or(sim.pars().verbose);
    sim.pars_mut().verbose = verbose;

    // Distinct, reproducible streams per replicate
    let seed = sim.pars().seed.wrapping_add(options.index as u64);
    sim.set_seed(Some(seed), false)?;

    let noise_parameter = resolve_noise_parameter(&sim, options.noise_parameter.as_deref())?;
    let z: f64 = sim.state_mut().random().sample_distr(StandardNormal);
    let factor = noise_factor(options.noise * z);
    sim.scale_parameter(&noise_parameter, factor)?;

    if verbose >= 1 {
        info!("Running a simulation using {seed} seed and {factor} noise");
    }

    for (key, value) in &options.overrides {
        if !sim.has_parameter(key) {
            return Err(EpiError::UnknownOverride(key.clone()));
        }
        if verbose >= 1 {
            debug!(
                "Setting key {key} from {} to {value}",
                sim.get_parameter(key)?
            );
        }
        sim.set_parameter(key, value.clone())?;
    }

    // People and results always come from this replicate's own stream, even when the template
    // has already been initialized or run.
    sim.reset();
    sim.run()?;
    Ok(sim)
}
