//! The simulation driver.
//!
//! [`SimState`] is the data every simulation carries: parameters, agents (ordered by insertion so
//! that positional lookup is well defined), result series and an owned random stream.
//! [`Simulation`] pairs a state with a [`Model`] and drives the model's lifecycle hooks.

use std::path::Path;

use indexmap::IndexMap;
use log::{debug, info};

use crate::agent::{Agent, AgentId};
use crate::error::EpiError;
use crate::model::{Model, SummaryStats};
use crate::parameters::{ParamValue, ParameterAccess, ParameterStore, SimParameters};
use crate::random::SimRandom;
use crate::results::Results;

#[derive(Clone, Debug)]
pub struct SimState {
    pars: SimParameters,
    people: IndexMap<AgentId, Agent>,
    next_uid: usize,
    results: Results,
    random: SimRandom,
}

impl SimState {
    pub fn new(pars: SimParameters) -> Self {
        let random = SimRandom::seeded(pars.seed);
        SimState {
            pars,
            people: IndexMap::new(),
            next_uid: 0,
            results: Results::default(),
            random,
        }
    }

    pub fn pars(&self) -> &SimParameters {
        &self.pars
    }

    pub fn pars_mut(&mut self) -> &mut SimParameters {
        &mut self.pars
    }

    /// Resets the random stream.
    ///
    /// * `set_seed(Some(324), false)` stores 324 as the seed and restarts the stream from it.
    /// * `set_seed(None, false)` restarts the stream from the stored seed.
    /// * `set_seed(None, true)` restarts the stream from OS entropy; the stored seed is kept.
    ///
    /// # Errors
    ///
    /// [`EpiError::ConflictingSeed`] if both a seed and `randomize` are given.
    pub fn set_seed(&mut self, seed: Option<u64>, randomize: bool) -> Result<(), EpiError> {
        let seed = match (seed, randomize) {
            (Some(_), true) => return Err(EpiError::ConflictingSeed),
            (None, true) => None,
            (Some(seed), false) => {
                self.pars.seed = seed;
                Some(seed)
            }
            (None, false) => Some(self.pars.seed),
        };
        self.random.reseed(seed);
        Ok(())
    }

    pub fn random(&mut self) -> &mut SimRandom {
        &mut self.random
    }

    /// Number of agents.
    pub fn n(&self) -> usize {
        self.people.len()
    }

    /// Number of time points, `n_days + 1`.
    pub fn npts(&self) -> usize {
        self.pars.npts()
    }

    /// The days of the run, `0..=n_days`.
    pub fn tvec(&self) -> Vec<u32> {
        (0..=self.pars.n_days).collect()
    }

    /// Adds an agent with the given attributes and returns its identifier.
    pub fn add_person(&mut self, attributes: ParameterStore) -> AgentId {
        let uid = AgentId::new(self.next_uid);
        self.next_uid += 1;
        self.people.insert(uid, Agent::new(uid, attributes));
        uid
    }

    pub fn person(&self, uid: AgentId) -> Option<&Agent> {
        self.people.get(&uid)
    }

    pub fn person_mut(&mut self, uid: AgentId) -> Option<&mut Agent> {
        self.people.get_mut(&uid)
    }

    /// Returns the agent at position `index` in the identifier table.
    ///
    /// # Errors
    ///
    /// [`EpiError::PersonIndex`] if `index` is out of range.
    pub fn get_person(&self, index: usize) -> Result<&Agent, EpiError> {
        let population = self.n();
        self.people
            .get_index(index)
            .map(|(_, agent)| agent)
            .ok_or(EpiError::PersonIndex { index, population })
    }

    /// # Errors
    ///
    /// [`EpiError::PersonIndex`] if `index` is out of range.
    pub fn get_person_mut(&mut self, index: usize) -> Result<&mut Agent, EpiError> {
        let population = self.n();
        self.people
            .get_index_mut(index)
            .map(|(_, agent)| agent)
            .ok_or(EpiError::PersonIndex { index, population })
    }

    pub fn uids(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.people.keys().copied()
    }

    pub fn people(&self) -> impl Iterator<Item = &Agent> {
        self.people.values()
    }

    pub fn people_mut(&mut self) -> impl Iterator<Item = &mut Agent> {
        self.people.values_mut()
    }

    pub fn clear_people(&mut self) {
        self.people.clear();
        self.next_uid = 0;
    }

    /// Moves every agent of `other` into this state under fresh identifiers.
    pub(crate) fn absorb_people(&mut self, other: SimState) {
        for (_, mut agent) in other.people {
            let uid = AgentId::new(self.next_uid);
            self.next_uid += 1;
            agent.set_uid(uid);
            self.people.insert(uid, agent);
        }
    }

    pub fn results(&self) -> &Results {
        &self.results
    }

    pub fn results_mut(&mut self) -> &mut Results {
        &mut self.results
    }
}

/// A simulation: a [`SimState`] driven by a [`Model`].
#[derive(Clone, Debug)]
pub struct Simulation<M> {
    state: SimState,
    model: M,
    initialized: bool,
}

impl<M> Simulation<M> {
    pub fn new(pars: SimParameters, model: M) -> Self {
        Simulation {
            state: SimState::new(pars),
            model,
            initialized: false,
        }
    }

    /// Builds a simulation from a JSON object of parameters.
    ///
    /// # Errors
    ///
    /// See [`SimParameters::from_json`].
    pub fn from_json(value: serde_json::Value, model: M) -> Result<Self, EpiError> {
        Ok(Self::new(SimParameters::from_json(value)?, model))
    }

    /// # Errors
    ///
    /// See [`SimParameters::from_json_file`].
    pub fn from_json_file(path: &Path, model: M) -> Result<Self, EpiError> {
        Ok(Self::new(SimParameters::from_json_file(path)?, model))
    }

    pub fn state(&self) -> &SimState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut SimState {
        &mut self.state
    }

    pub(crate) fn into_state(self) -> SimState {
        self.state
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    pub fn pars(&self) -> &SimParameters {
        self.state.pars()
    }

    pub fn pars_mut(&mut self) -> &mut SimParameters {
        self.state.pars_mut()
    }

    /// See [`SimState::set_seed`].
    ///
    /// # Errors
    ///
    /// [`EpiError::ConflictingSeed`] if both a seed and `randomize` are given.
    pub fn set_seed(&mut self, seed: Option<u64>, randomize: bool) -> Result<(), EpiError> {
        self.state.set_seed(seed, randomize)
    }

    pub fn n(&self) -> usize {
        self.state.n()
    }

    pub fn npts(&self) -> usize {
        self.state.npts()
    }

    pub fn tvec(&self) -> Vec<u32> {
        self.state.tvec()
    }

    /// # Errors
    ///
    /// [`EpiError::PersonIndex`] if `index` is out of range.
    pub fn get_person(&self, index: usize) -> Result<&Agent, EpiError> {
        self.state.get_person(index)
    }

    pub fn results(&self) -> &Results {
        self.state.results()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Drops the people and results so the next `run` initializes from scratch.
    pub(crate) fn reset(&mut self) {
        self.state.clear_people();
        self.state.results = Results::default();
        self.initialized = false;
    }
}

impl<M: Model> Simulation<M> {
    /// # Errors
    ///
    /// Whatever the model's `init_results` hook reports.
    pub fn init_results(&mut self) -> Result<(), EpiError> {
        self.model.init_results(&mut self.state)
    }

    /// # Errors
    ///
    /// Whatever the model's `init_people` hook reports.
    pub fn init_people(&mut self) -> Result<(), EpiError> {
        self.model.init_people(&mut self.state)
    }

    /// Creates the result series and the population.
    ///
    /// # Errors
    ///
    /// Whatever the model's `init_results` or `init_people` hooks report.
    pub fn initialize(&mut self) -> Result<(), EpiError> {
        debug!("initializing results and people");
        self.init_results()?;
        self.init_people()?;
        self.initialized = true;
        Ok(())
    }

    /// Runs the simulation, initializing it first if that has not happened yet.
    ///
    /// # Errors
    ///
    /// Whatever the model's hooks report.
    pub fn run(&mut self) -> Result<(), EpiError> {
        if !self.initialized {
            self.initialize()?;
        }
        let pars = self.state.pars();
        if pars.verbose >= 1 {
            info!(
                "Running simulation: seed={}, n_days={}, pop_size={}",
                pars.seed, pars.n_days, pars.pop_size
            );
        }
        self.model.run(&mut self.state)
    }

    /// # Errors
    ///
    /// Whatever the model's `summary_stats` hook reports.
    pub fn summary_stats(&self) -> Result<SummaryStats, EpiError> {
        self.model.summary_stats(&self.state)
    }

    /// # Errors
    ///
    /// Whatever the model's `likelihood` hook reports.
    pub fn likelihood(&self, observed_diagnoses: &[f64]) -> Result<f64, EpiError> {
        self.model.likelihood(&self.state, observed_diagnoses)
    }

    /// # Errors
    ///
    /// Whatever the model's `plot` hook reports.
    pub fn plot(&self) -> Result<(), EpiError> {
        self.model.plot(&self.state)
    }

    /// # Errors
    ///
    /// Whatever the model's `plot_people` hook reports.
    pub fn plot_people(&self) -> Result<(), EpiError> {
        self.model.plot_people(&self.state)
    }
}

impl<M> ParameterAccess for Simulation<M> {
    fn parameter_names(&self) -> Vec<String> {
        self.state.pars.parameter_names()
    }

    fn lookup(&self, key: &str) -> Option<ParamValue> {
        self.state.pars.lookup(key)
    }

    fn assign(&mut self, key: &str, value: ParamValue) -> Result<(), EpiError> {
        self.state.pars.assign(key, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BaseModel;

    fn sim() -> Simulation<BaseModel> {
        let mut pars = SimParameters::default();
        pars.seed = 11;
        pars.n_days = 4;
        Simulation::new(pars, BaseModel)
    }

    #[test]
    fn set_seed_conflict() {
        let mut sim = sim();
        for seed in [0, 1, 42, u64::MAX] {
            assert!(matches!(
                sim.set_seed(Some(seed), true),
                Err(EpiError::ConflictingSeed)
            ));
        }
        assert_eq!(sim.pars().seed, 11);
    }

    #[test]
    fn set_seed_stores_and_reuses() {
        let mut sim = sim();
        sim.set_seed(Some(7), false).unwrap();
        assert_eq!(sim.pars().seed, 7);
        let first: u32 = sim.state_mut().random().sample_range(0..1_000_000);

        sim.set_seed(None, false).unwrap();
        assert_eq!(sim.pars().seed, 7);
        let again: u32 = sim.state_mut().random().sample_range(0..1_000_000);
        assert_eq!(first, again);
    }

    #[test]
    fn randomize_keeps_stored_seed() {
        let mut sim = sim();
        sim.set_seed(None, true).unwrap();
        assert_eq!(sim.pars().seed, 11);
        assert_eq!(sim.state.random.seed(), None);
    }

    #[test]
    fn time_vector() {
        let sim = sim();
        assert_eq!(sim.npts(), 5);
        assert_eq!(sim.tvec(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn people_lookup_by_position() {
        let mut sim = sim();
        let state = sim.state_mut();
        for age in [30, 40, 50] {
            state.add_person(ParameterStore::from_pairs([("age", age)]));
        }
        assert_eq!(sim.n(), 3);
        let agent = sim.get_person(1).unwrap();
        assert_eq!(agent.uid(), AgentId::new(1));
        assert_eq!(agent.get_parameter("age").unwrap(), ParamValue::Int(40));
        assert!(matches!(
            sim.get_person(3),
            Err(EpiError::PersonIndex {
                index: 3,
                population: 3
            })
        ));
    }

    #[test]
    fn absorb_rekeys_people() {
        let mut a = SimState::new(SimParameters::default());
        let mut b = SimState::new(SimParameters::default());
        a.add_person(ParameterStore::from_pairs([("age", 1)]));
        b.add_person(ParameterStore::from_pairs([("age", 2)]));
        b.add_person(ParameterStore::from_pairs([("age", 3)]));
        a.absorb_people(b);
        let uids: Vec<usize> = a.uids().map(AgentId::index).collect();
        assert_eq!(uids, vec![0, 1, 2]);
        assert_eq!(
            a.get_person(2).unwrap().get_parameter("age").unwrap(),
            ParamValue::Int(3)
        );
        assert_eq!(a.get_person(2).unwrap().uid(), AgentId::new(2));
    }

    #[test]
    fn parameters_by_name() {
        let mut sim = sim();
        sim.set_parameter("n_days", 9).unwrap();
        assert_eq!(sim.npts(), 10);
        assert!(sim.set_parameter("ndays", 9).is_err());
    }

    #[test]
    fn base_model_run_is_not_implemented() {
        let mut sim = sim();
        assert!(matches!(
            sim.run(),
            Err(EpiError::NotImplemented("init_results"))
        ));
        assert!(!sim.is_initialized());
        assert!(matches!(
            sim.summary_stats(),
            Err(EpiError::NotImplemented("summary_stats"))
        ));
    }
}
