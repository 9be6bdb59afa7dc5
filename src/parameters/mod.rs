//! Parameters drive every simulation. There are two stores:
//!
//! * [`ParameterStore`]: an ordered, fixed-key mapping from names to [`ParamValue`]s. It holds
//!   model-specific parameters and per-agent attributes.
//! * [`SimParameters`]: the typed parameters every simulation has (`seed`, `n_days`, ...) plus a
//!   [`ParameterStore`] of model-specific extras.
//!
//! Both implement [`ParameterAccess`], which provides name-based reads and writes. The set of
//! names is fixed when a store is constructed: writes may only change existing parameters, and a
//! mistyped name produces [`EpiError::UnknownParameter`] with a suggestion for the closest name.
//!
//! ```
//! use epiabm::parameters::{ParameterAccess, ParameterStore};
//!
//! let mut pars = ParameterStore::from_pairs([("beta", 0.3), ("dur_inf", 7.0)]);
//! pars.set_parameter("beta", 0.25).unwrap();
//! assert!(pars.set_parameter("betta", 0.25).is_err());
//! ```
mod sim_parameters;
mod store;
mod value;

pub use sim_parameters::SimParameters;
pub use store::ParameterStore;
pub use value::ParamValue;

use crate::error::EpiError;
use crate::suggest::suggest;

/// Builds the error for a name that is not in `names`.
pub(crate) fn unknown_parameter(key: &str, names: Vec<String>) -> EpiError {
    EpiError::UnknownParameter {
        key: key.to_string(),
        suggestion: suggest(key, &names),
        valid_keys: names,
    }
}

/// Name-based access to a fixed set of parameters.
pub trait ParameterAccess {
    /// Every parameter name, in declaration order.
    fn parameter_names(&self) -> Vec<String>;

    /// Returns the current value of `key`, or `None` if there is no such parameter.
    fn lookup(&self, key: &str) -> Option<ParamValue>;

    /// Stores `value` under `key`, which is known to exist. Fails if the value has the wrong kind.
    fn assign(&mut self, key: &str, value: ParamValue) -> Result<(), EpiError>;

    fn has_parameter(&self, key: &str) -> bool {
        self.lookup(key).is_some()
    }

    /// Reads a parameter by name.
    ///
    /// # Errors
    ///
    /// [`EpiError::UnknownParameter`] if `key` is not a parameter.
    fn get_parameter(&self, key: &str) -> Result<ParamValue, EpiError> {
        self.lookup(key)
            .ok_or_else(|| unknown_parameter(key, self.parameter_names()))
    }

    /// Changes an existing parameter.
    ///
    /// # Errors
    ///
    /// [`EpiError::UnknownParameter`] if `key` is not a parameter and
    /// [`EpiError::ParameterType`] if `value` does not fit it.
    fn set_parameter(&mut self, key: &str, value: impl Into<ParamValue>) -> Result<(), EpiError>
    where
        Self: Sized,
    {
        if !self.has_parameter(key) {
            return Err(unknown_parameter(key, self.parameter_names()));
        }
        self.assign(key, value.into())
    }

    /// Overwrites the parameters named in `values`, leaving all others untouched. Either every
    /// value is written or, on error, none is: names are checked first and a rejected value
    /// restores the ones already written.
    ///
    /// # Errors
    ///
    /// [`EpiError::UnknownParameter`] for the first unknown name, or the first assignment error.
    fn update_parameters<I, K, V>(&mut self, values: I) -> Result<(), EpiError>
    where
        Self: Sized,
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<ParamValue>,
    {
        let values: Vec<(K, ParamValue)> = values.into_iter().map(|(k, v)| (k, v.into())).collect();
        if let Some((key, _)) = values.iter().find(|(key, _)| !self.has_parameter(key.as_ref())) {
            return Err(unknown_parameter(key.as_ref(), self.parameter_names()));
        }

        let mut previous: Vec<(&str, ParamValue)> = Vec::with_capacity(values.len());
        for (key, value) in &values {
            let key = key.as_ref();
            let old = self.get_parameter(key)?;
            if let Err(e) = self.assign(key, value.clone()) {
                for (key, old) in previous.into_iter().rev() {
                    // Old values always fit their own slot
                    let _ = self.assign(key, old);
                }
                return Err(e);
            }
            previous.push((key, old));
        }
        Ok(())
    }

    /// Multiplies a numeric parameter by `factor` and returns the new value. Integer parameters
    /// are rounded to the nearest integer.
    ///
    /// # Errors
    ///
    /// [`EpiError::UnknownParameter`] if `key` is not a parameter and
    /// [`EpiError::ParameterType`] if it is not numeric.
    fn scale_parameter(&mut self, key: &str, factor: f64) -> Result<ParamValue, EpiError> {
        let scaled = match self.get_parameter(key)? {
            #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
            ParamValue::Int(v) => ParamValue::Int((v as f64 * factor).round() as i64),
            ParamValue::Float(v) => ParamValue::Float(v * factor),
            other => {
                return Err(EpiError::ParameterType {
                    key: key.to_string(),
                    expected: "a number",
                    found: other.kind(),
                })
            }
        };
        self.assign(key, scaled.clone())?;
        Ok(scaled)
    }
}
