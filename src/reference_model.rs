//! A small, well-mixed SIR model used by the `epiabm` binary and the integration tests.
//!
//! Each day every infectious agent makes `contacts` contacts with agents drawn uniformly from the
//! whole population, and each contact with a susceptible agent transmits with probability
//! `beta`. Agents recover `dur_inf` days after infection. Every day each undiagnosed infectious
//! agent is diagnosed with probability `diag_prob`.
//!
//! Agent state lives in the agent attribute store: `age`, `status`, `t_infected` and `diagnosed`.

use std::str::FromStr;

use log::{debug, trace};
use rand::seq::index;
use statrs::function::gamma::ln_gamma;
use strum::{AsRefStr, EnumIter, EnumString, IntoEnumIterator};

use crate::agent::Agent;
use crate::error::EpiError;
use crate::model::{Model, SummaryStats};
use crate::parameters::{ParamValue, ParameterAccess, ParameterStore, SimParameters};
use crate::simulation::SimState;

pub const SERIES: [&str; 6] = [
    "n_susceptible",
    "n_infectious",
    "n_recovered",
    "new_infections",
    "new_diagnoses",
    "cum_diagnoses",
];

// Agents are never older than this.
const MAX_AGE: i64 = 90;

// Lower bound on the expected count in the Poisson likelihood, so days the model predicts no
// diagnoses still give a finite value.
const MIN_EXPECTED: f64 = 1e-3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumString, AsRefStr, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Status {
    Susceptible,
    Infectious,
    Recovered,
}

/// The model-specific parameters, read from the extension store once per hook.
#[derive(Clone, Copy, Debug, PartialEq)]
struct SirParameters {
    beta: f64,
    contacts: usize,
    dur_inf: i64,
    n_infected: usize,
    diag_prob: f64,
}

fn number(pars: &SimParameters, key: &str) -> Result<f64, EpiError> {
    let value = pars.get_parameter(key)?;
    value.as_f64().ok_or(EpiError::ParameterType {
        key: key.to_string(),
        expected: "a number",
        found: value.kind(),
    })
}

fn count(pars: &SimParameters, key: &str) -> Result<u64, EpiError> {
    let value = pars.get_parameter(key)?;
    value.as_u64().ok_or(EpiError::ParameterType {
        key: key.to_string(),
        expected: "a non-negative integer",
        found: value.kind(),
    })
}

impl SirParameters {
    fn read(pars: &SimParameters) -> Result<Self, EpiError> {
        let dur_inf = count(pars, "dur_inf")?;
        Ok(SirParameters {
            beta: number(pars, "beta")?,
            contacts: usize::try_from(count(pars, "contacts")?).unwrap_or(usize::MAX),
            dur_inf: i64::try_from(dur_inf).unwrap_or(i64::MAX),
            n_infected: usize::try_from(count(pars, "n_infected")?).unwrap_or(usize::MAX),
            diag_prob: number(pars, "diag_prob")?,
        })
    }
}

/// Parameters for a run of [`WellMixedSir`]: the core defaults plus the model's extras.
pub fn default_parameters() -> SimParameters {
    SimParameters::default().with_extra(ParameterStore::from_pairs([
        ("beta", ParamValue::Float(0.05)),
        ("contacts", ParamValue::Int(10)),
        ("dur_inf", ParamValue::Int(7)),
        ("n_infected", ParamValue::Int(10)),
        ("diag_prob", ParamValue::Float(0.2)),
    ]))
}

pub fn status(agent: &Agent) -> Result<Status, EpiError> {
    let value = agent.get_parameter("status")?;
    let raw = value.as_str().ok_or(EpiError::ParameterType {
        key: "status".to_string(),
        expected: "text",
        found: value.kind(),
    })?;
    Status::from_str(raw).map_err(|_| EpiError::Other(format!("Unknown agent status {raw:?}")))
}

fn set_status(agent: &mut Agent, status: Status) -> Result<(), EpiError> {
    agent.set_parameter("status", status.as_ref())
}

fn infect(agent: &mut Agent, day: i64) -> Result<(), EpiError> {
    set_status(agent, Status::Infectious)?;
    agent.set_parameter("t_infected", day)
}

fn is_diagnosed(agent: &Agent) -> bool {
    agent
        .get_parameter("diagnosed")
        .ok()
        .and_then(|value| value.as_bool())
        .unwrap_or(false)
}

#[allow(clippy::cast_precision_loss)]
fn as_count(value: usize) -> f64 {
    value as f64
}

fn series<'a>(sim: &'a SimState, key: &str) -> Result<&'a [f64], EpiError> {
    sim.results().get(key).ok_or_else(|| {
        EpiError::Other(format!(
            "No result series {key}; run the simulation first"
        ))
    })
}

#[derive(Clone, Copy, Debug, Default)]
pub struct WellMixedSir;

impl WellMixedSir {
    fn record(
        sim: &mut SimState,
        t: usize,
        new_infections: usize,
        new_diagnoses: usize,
    ) -> Result<(), EpiError> {
        let statuses = sim.people().map(status).collect::<Result<Vec<_>, _>>()?;
        for state in Status::iter() {
            let n = statuses.iter().filter(|s| **s == state).count();
            let key = format!("n_{}", state.as_ref());
            sim.results_mut().series_mut(&key)?[t] = as_count(n);
        }
        sim.results_mut().series_mut("new_infections")?[t] = as_count(new_infections);
        sim.results_mut().series_mut("new_diagnoses")?[t] = as_count(new_diagnoses);

        let cum_diagnoses = sim.results_mut().series_mut("cum_diagnoses")?;
        let previous = if t == 0 { 0.0 } else { cum_diagnoses[t - 1] };
        cum_diagnoses[t] = previous + as_count(new_diagnoses);
        Ok(())
    }

    /// Contacts and transmission for one day. Returns the number of new infections.
    fn transmit(sim: &mut SimState, pars: &SirParameters, day: i64) -> Result<usize, EpiError> {
        let statuses = sim.people().map(status).collect::<Result<Vec<_>, _>>()?;
        let n = statuses.len();
        if n == 0 {
            return Ok(0);
        }

        let mut newly_infected = vec![false; n];
        let infectious = statuses.iter().filter(|s| **s == Status::Infectious).count();
        for _ in 0..infectious {
            for _ in 0..pars.contacts {
                let target = sim.random().sample_range(0..n);
                if statuses[target] == Status::Susceptible
                    && !newly_infected[target]
                    && sim.random().sample_bool(pars.beta)
                {
                    newly_infected[target] = true;
                }
            }
        }

        let mut infections = 0;
        for (index, _) in newly_infected.iter().enumerate().filter(|(_, hit)| **hit) {
            infect(sim.get_person_mut(index)?, day)?;
            infections += 1;
        }
        Ok(infections)
    }

    fn recover(sim: &mut SimState, pars: &SirParameters, day: i64) -> Result<(), EpiError> {
        for agent in sim.people_mut() {
            if status(agent)? != Status::Infectious {
                continue;
            }
            let t_infected = agent.get_parameter("t_infected")?.as_i64().unwrap_or(day);
            if day - t_infected >= pars.dur_inf {
                set_status(agent, Status::Recovered)?;
            }
        }
        Ok(())
    }

    /// Returns the number of new diagnoses.
    fn diagnose(sim: &mut SimState, pars: &SirParameters) -> Result<usize, EpiError> {
        let candidates: Vec<usize> = sim
            .people()
            .enumerate()
            .filter(|(_, agent)| !is_diagnosed(agent))
            .filter(|(_, agent)| matches!(status(agent), Ok(Status::Infectious)))
            .map(|(index, _)| index)
            .collect();

        let mut diagnoses = 0;
        for index in candidates {
            if sim.random().sample_bool(pars.diag_prob) {
                sim.get_person_mut(index)?.set_parameter("diagnosed", true)?;
                diagnoses += 1;
            }
        }
        Ok(diagnoses)
    }
}

impl Model for WellMixedSir {
    fn init_results(&mut self, sim: &mut SimState) -> Result<(), EpiError> {
        let npts = sim.npts();
        for key in SERIES {
            sim.results_mut().add_series(key, npts);
        }
        Ok(())
    }

    fn init_people(&mut self, sim: &mut SimState) -> Result<(), EpiError> {
        let pars = SirParameters::read(sim.pars())?;
        let pop_size = sim.pars().pop_size;
        sim.clear_people();
        for _ in 0..pop_size {
            let age = sim.random().sample_range(0..=MAX_AGE);
            sim.add_person(ParameterStore::from_pairs([
                ("age", ParamValue::Int(age)),
                ("status", ParamValue::from(Status::Susceptible.as_ref())),
                ("t_infected", ParamValue::Int(-1)),
                ("diagnosed", ParamValue::Bool(false)),
            ]));
        }

        let seeded = pars.n_infected.min(pop_size);
        let chosen = sim
            .random()
            .sample(|rng| index::sample(rng, pop_size, seeded).into_vec());
        for index in chosen {
            infect(sim.get_person_mut(index)?, 0)?;
        }
        debug!("created {pop_size} people, {seeded} of them infectious");
        Ok(())
    }

    fn run(&mut self, sim: &mut SimState) -> Result<(), EpiError> {
        let pars = SirParameters::read(sim.pars())?;
        let seeded = sim
            .people()
            .map(status)
            .filter(|s| matches!(s, Ok(Status::Infectious)))
            .count();
        Self::record(sim, 0, seeded, 0)?;

        for t in 1..sim.npts() {
            let day = i64::try_from(t).unwrap_or(i64::MAX);
            let new_infections = Self::transmit(sim, &pars, day)?;
            Self::recover(sim, &pars, day)?;
            let new_diagnoses = Self::diagnose(sim, &pars)?;
            Self::record(sim, t, new_infections, new_diagnoses)?;
            trace!("day {t}: {new_infections} infections, {new_diagnoses} diagnoses");
        }
        Ok(())
    }

    fn summary_stats(&self, sim: &SimState) -> Result<SummaryStats, EpiError> {
        let new_infections = series(sim, "new_infections")?;
        let n_infectious = series(sim, "n_infectious")?;
        let cum_diagnoses = series(sim, "cum_diagnoses")?;

        let cum_infections: f64 = new_infections.iter().sum();
        let (peak_day, peak) = n_infectious
            .iter()
            .copied()
            .enumerate()
            .fold((0, 0.0), |best, (t, v)| if v > best.1 { (t, v) } else { best });
        let population = as_count(sim.n());

        let mut stats = SummaryStats::new();
        stats.insert("cum_infections".to_string(), cum_infections);
        stats.insert(
            "attack_rate".to_string(),
            if population > 0.0 {
                cum_infections / population
            } else {
                0.0
            },
        );
        stats.insert("peak_infectious".to_string(), peak);
        stats.insert("peak_day".to_string(), as_count(peak_day));
        stats.insert(
            "cum_diagnoses".to_string(),
            cum_diagnoses.last().copied().unwrap_or(0.0),
        );
        Ok(stats)
    }

    /// Poisson log-likelihood of `observed_diagnoses` given the simulated daily diagnoses.
    /// Observed counts are rounded to whole numbers.
    fn likelihood(&self, sim: &SimState, observed_diagnoses: &[f64]) -> Result<f64, EpiError> {
        let expected = series(sim, "new_diagnoses")?;
        if observed_diagnoses.len() != expected.len() {
            return Err(EpiError::SeriesMismatch {
                key: "new_diagnoses".to_string(),
                expected: expected.len(),
                found: observed_diagnoses.len(),
            });
        }
        Ok(expected
            .iter()
            .zip(observed_diagnoses)
            .map(|(lambda, observed)| poisson_log_pmf(observed.max(0.0).round(), *lambda))
            .sum())
    }
}

/// `ln P(K = k)` for `K ~ Poisson(lambda)`.
fn poisson_log_pmf(k: f64, lambda: f64) -> f64 {
    let lambda = lambda.max(MIN_EXPECTED);
    k * lambda.ln() - lambda - ln_gamma(k + 1.0)
}
