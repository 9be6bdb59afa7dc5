use std::fs;
use std::path::Path;

use serde_derive::{Deserialize, Serialize};

use crate::error::EpiError;
use crate::parameters::store::require_mapping;
use crate::parameters::{unknown_parameter, ParamValue, ParameterAccess, ParameterStore};

const CORE_KEYS: [&str; 5] = ["seed", "n_days", "pop_size", "verbose", "parallelized"];

/// Parameters shared by every simulation, plus a fixed set of model-specific extras.
///
/// In JSON the extras sit next to the core fields:
///
/// ```
/// use epiabm::parameters::{ParamValue, SimParameters};
///
/// let pars = SimParameters::from_json(serde_json::json!({
///     "seed": 3,
///     "n_days": 30,
///     "beta": 0.2
/// }))
/// .unwrap();
/// assert_eq!(pars.npts(), 31);
/// assert_eq!(pars.extra.get("beta"), Some(&ParamValue::Float(0.2)));
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimParameters {
    pub seed: u64,
    pub n_days: u32,
    pub pop_size: usize,
    pub verbose: u8,
    /// Number of replicates merged into this simulation.
    pub parallelized: usize,
    #[serde(flatten)]
    pub extra: ParameterStore,
}

impl Default for SimParameters {
    fn default() -> Self {
        SimParameters {
            seed: 1,
            n_days: 60,
            pop_size: 1000,
            verbose: 0,
            parallelized: 1,
            extra: ParameterStore::default(),
        }
    }
}

fn integer<T: TryFrom<i64>>(key: &str, value: &ParamValue) -> Result<T, EpiError> {
    value
        .as_i64()
        .and_then(|v| T::try_from(v).ok())
        .ok_or_else(|| EpiError::ParameterType {
            key: key.to_string(),
            expected: "a non-negative integer",
            found: value.kind(),
        })
}

fn to_value<T: TryInto<i64>>(value: T) -> ParamValue {
    ParamValue::Int(value.try_into().unwrap_or(i64::MAX))
}

impl SimParameters {
    #[must_use]
    pub fn with_extra(mut self, extra: ParameterStore) -> Self {
        self.extra = extra;
        self
    }

    /// Builds parameters from a JSON object. Missing core fields take their defaults; every other
    /// key becomes an extra.
    ///
    /// # Errors
    ///
    /// [`EpiError::NotAMapping`] if `value` is not an object and a JSON error if a field has the
    /// wrong type.
    pub fn from_json(value: serde_json::Value) -> Result<Self, EpiError> {
        require_mapping(&value)?;
        Ok(serde_json::from_value(value)?)
    }

    /// # Errors
    ///
    /// See [`SimParameters::from_json`]; also fails if the file cannot be read.
    pub fn from_json_file(path: &Path) -> Result<Self, EpiError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(serde_json::from_str(&contents)?)
    }

    /// Number of time points, including day 0.
    pub fn npts(&self) -> usize {
        self.n_days as usize + 1
    }
}

impl ParameterAccess for SimParameters {
    fn parameter_names(&self) -> Vec<String> {
        CORE_KEYS
            .iter()
            .map(ToString::to_string)
            .chain(self.extra.keys().map(ToString::to_string))
            .collect()
    }

    fn lookup(&self, key: &str) -> Option<ParamValue> {
        match key {
            // Seeds are bit patterns; the signed view round-trips through `assign`.
            #[allow(clippy::cast_possible_wrap)]
            "seed" => Some(ParamValue::Int(self.seed as i64)),
            "n_days" => Some(ParamValue::Int(i64::from(self.n_days))),
            "pop_size" => Some(to_value(self.pop_size)),
            "verbose" => Some(ParamValue::Int(i64::from(self.verbose))),
            "parallelized" => Some(to_value(self.parallelized)),
            _ => self.extra.lookup(key),
        }
    }

    fn assign(&mut self, key: &str, value: ParamValue) -> Result<(), EpiError> {
        match key {
            "seed" => {
                #[allow(clippy::cast_sign_loss)]
                let seed = value.as_i64().map(|v| v as u64).ok_or_else(|| {
                    EpiError::ParameterType {
                        key: key.to_string(),
                        expected: "an integer",
                        found: value.kind(),
                    }
                })?;
                self.seed = seed;
            }
            "n_days" => self.n_days = integer(key, &value)?,
            "pop_size" => self.pop_size = integer(key, &value)?,
            "verbose" => self.verbose = integer(key, &value)?,
            "parallelized" => self.parallelized = integer(key, &value)?,
            _ if self.extra.has_parameter(key) => self.extra.assign(key, value)?,
            _ => return Err(unknown_parameter(key, self.parameter_names())),
        }
        Ok(())
    }
}
