//! A framework for running agent-based epidemic simulations
//!
//! epiabm provides the plumbing around an agent-based model rather than the
//! model itself. A concrete model implements the [`Model`] lifecycle hooks
//! (creating result series and people, stepping through the days, computing
//! summary statistics and a likelihood) and the framework supplies
//! everything else:
//! * A typed parameter set, [`SimParameters`], with a fixed set of
//!   model-specific extras that can be read and written by name
//! * Agents whose attributes are stored the same way
//! * Per-simulation random streams that reproduce exactly from a seed
//! * Replicate runs: copy a template simulation, offset its seed, perturb
//!   one parameter with multiplicative noise and apply overrides
//! * Parallel batches of replicates, optionally merged into one simulation
//! * CSV reports and a command-line runner
//!
//! A model that uses the framework usually looks like this:
//! ```
//! use epiabm::prelude::*;
//!
//! let mut pars = default_parameters();
//! pars.pop_size = 200;
//! pars.n_days = 20;
//! let output = multi_run(
//!     SimSource::Build(pars, WellMixedSir),
//!     &BatchOptions {
//!         replicates: 2,
//!         ..BatchOptions::default()
//!     },
//! )
//! .unwrap();
//! let sims = output.into_sims();
//! assert_eq!(sims[1].pars().seed, sims[0].pars().seed + 1);
//! ```
pub mod agent;
pub mod batch;
pub mod error;
pub mod log;
pub mod model;
pub mod parameters;
pub mod random;
pub mod reference_model;
pub mod replicate;
pub mod report;
pub mod results;
pub mod runner;
pub mod simulation;
pub mod suggest;

pub mod prelude;

pub use crate::agent::{Agent, AgentId};
pub use crate::batch::{combine, multi_run, BatchOptions, BatchOutput};
pub use crate::error::EpiError;
pub use crate::log::{debug, error, info, trace, warn};
pub use crate::model::{BaseModel, Model, SummaryStats};
pub use crate::parameters::{ParamValue, ParameterAccess, ParameterStore, SimParameters};
pub use crate::random::SimRandom;
pub use crate::replicate::{single_run, ReplicateOptions, SimSource};
pub use crate::results::Results;
pub use crate::simulation::{SimState, Simulation};

