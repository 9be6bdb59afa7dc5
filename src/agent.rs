use std::fmt::{Debug, Display, Formatter};

use serde_derive::{Deserialize, Serialize};

use crate::error::EpiError;
use crate::parameters::{ParamValue, ParameterAccess, ParameterStore};

/// Represents a unique agent within a simulation.
#[derive(Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub(crate) usize);

impl AgentId {
    pub fn new(id: usize) -> Self {
        AgentId(id)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl Display for AgentId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Debug for AgentId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Agent {}", self.0)
    }
}

/// One simulated individual. Everything a model knows about an agent lives in
/// its attribute store, so attributes are read and written by name through
/// [`ParameterAccess`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    uid: AgentId,
    attributes: ParameterStore,
}

impl Agent {
    pub fn new(uid: AgentId, attributes: ParameterStore) -> Self {
        Agent { uid, attributes }
    }

    pub fn uid(&self) -> AgentId {
        self.uid
    }

    pub(crate) fn set_uid(&mut self, uid: AgentId) {
        self.uid = uid;
    }

    pub fn attributes(&self) -> &ParameterStore {
        &self.attributes
    }
}

impl ParameterAccess for Agent {
    fn parameter_names(&self) -> Vec<String> {
        self.attributes.parameter_names()
    }

    fn lookup(&self, key: &str) -> Option<ParamValue> {
        self.attributes.lookup(key)
    }

    fn has_parameter(&self, key: &str) -> bool {
        self.attributes.has_parameter(key)
    }

    fn assign(&mut self, key: &str, value: ParamValue) -> Result<(), EpiError> {
        self.attributes.assign(key, value)
    }
}
