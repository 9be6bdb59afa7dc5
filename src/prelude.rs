pub use crate::agent::{Agent, AgentId};
pub use crate::batch::{multi_run, BatchOptions, BatchOutput};
pub use crate::error::EpiError;
pub use crate::log::{debug, error, info, trace, warn};
pub use crate::model::{BaseModel, Model, SummaryStats};
pub use crate::parameters::{ParamValue, ParameterAccess, ParameterStore, SimParameters};
pub use crate::reference_model::{default_parameters, WellMixedSir};
pub use crate::replicate::{single_run, ReplicateOptions, SimSource};
pub use crate::runner::run_with_args;
pub use crate::simulation::{SimState, Simulation};
