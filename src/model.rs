//! The lifecycle hooks a concrete simulation supplies.
//!
//! A [`Simulation`](crate::simulation::Simulation) is generic over a [`Model`]. The simulation
//! owns the parameters, the agents, the result series and the random stream (collectively the
//! [`SimState`]); the model owns whatever else it needs and implements the hooks in terms of the
//! state it is handed. Every hook defaults to [`EpiError::NotImplemented`], so a model only
//! overrides what it supports.

use indexmap::IndexMap;

use crate::error::EpiError;
use crate::simulation::SimState;

/// Summary statistics reported at the end of a run, by name.
pub type SummaryStats = IndexMap<String, f64>;

pub trait Model {
    /// Creates the result series for a run of `sim.npts()` time points.
    fn init_results(&mut self, _sim: &mut SimState) -> Result<(), EpiError> {
        Err(EpiError::NotImplemented("init_results"))
    }

    /// Creates the agents.
    fn init_people(&mut self, _sim: &mut SimState) -> Result<(), EpiError> {
        Err(EpiError::NotImplemented("init_people"))
    }

    /// Steps the simulation through every time point. Results and people have already been
    /// initialized. Must be deterministic given the state's random stream.
    fn run(&mut self, _sim: &mut SimState) -> Result<(), EpiError> {
        Err(EpiError::NotImplemented("run"))
    }

    fn summary_stats(&self, _sim: &SimState) -> Result<SummaryStats, EpiError> {
        Err(EpiError::NotImplemented("summary_stats"))
    }

    /// Log-likelihood of the run given observed new diagnoses per day.
    fn likelihood(&self, _sim: &SimState, _observed_diagnoses: &[f64]) -> Result<f64, EpiError> {
        Err(EpiError::NotImplemented("likelihood"))
    }

    fn plot(&self, _sim: &SimState) -> Result<(), EpiError> {
        Err(EpiError::NotImplemented("plot"))
    }

    /// Shows every agent as a row with one column per time step.
    fn plot_people(&self, _sim: &SimState) -> Result<(), EpiError> {
        Err(EpiError::NotImplemented("plot_people"))
    }
}

/// A model with no behavior; every hook reports [`EpiError::NotImplemented`].
#[derive(Clone, Copy, Debug, Default)]
pub struct BaseModel;

impl Model for BaseModel {}
