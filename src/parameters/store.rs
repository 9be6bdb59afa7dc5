use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde_derive::{Deserialize, Serialize};

use crate::error::EpiError;
use crate::parameters::{ParamValue, ParameterAccess};

/// An insertion-ordered mapping of parameter names to values whose key set is fixed once built.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterStore {
    values: IndexMap<String, ParamValue>,
}

/// Describes a JSON value for the "not a mapping" error.
fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

/// Fails unless `value` is a JSON object.
pub(crate) fn require_mapping(value: &serde_json::Value) -> Result<(), EpiError> {
    if value.is_object() {
        Ok(())
    } else {
        Err(EpiError::NotAMapping(json_kind(value).to_string()))
    }
}

impl ParameterStore {
    pub fn new(values: IndexMap<String, ParamValue>) -> Self {
        ParameterStore { values }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<ParamValue>,
    {
        ParameterStore {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Builds a store from a JSON object.
    ///
    /// # Errors
    ///
    /// [`EpiError::NotAMapping`] if `value` is not an object, or a JSON error if one of its
    /// values cannot be represented as a [`ParamValue`] (e.g. `null`).
    pub fn from_json(value: serde_json::Value) -> Result<Self, EpiError> {
        require_mapping(&value)?;
        Ok(serde_json::from_value(value)?)
    }

    /// Reads a store from a JSON file containing a single object.
    ///
    /// # Errors
    ///
    /// I/O and JSON errors, and [`EpiError::NotAMapping`] if the file does not hold an object.
    pub fn from_json_file(path: &Path) -> Result<Self, EpiError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(serde_json::from_str(&contents)?)
    }

    /// Applies `update` to `existing`. With no existing store, `update` is adopted as-is;
    /// otherwise only keys already present may be overwritten.
    ///
    /// # Errors
    ///
    /// [`EpiError::UnknownParameter`] if `update` names a key `existing` does not have.
    pub fn merge(existing: Option<Self>, update: Self) -> Result<Self, EpiError> {
        match existing {
            None => Ok(update),
            Some(mut store) => {
                store.update_parameters(update.values)?;
                Ok(store)
            }
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.values.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

impl ParameterAccess for ParameterStore {
    fn parameter_names(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }

    fn lookup(&self, key: &str) -> Option<ParamValue> {
        self.values.get(key).cloned()
    }

    fn has_parameter(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    fn assign(&mut self, key: &str, value: ParamValue) -> Result<(), EpiError> {
        let Some(slot) = self.values.get_mut(key) else {
            return Err(super::unknown_parameter(key, self.parameter_names()));
        };
        match slot.conform(value) {
            Ok(value) => {
                *slot = value;
                Ok(())
            }
            Err(value) => Err(EpiError::ParameterType {
                key: key.to_string(),
                expected: slot.kind(),
                found: value.kind(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> ParameterStore {
        ParameterStore::from_pairs([
            ("beta", ParamValue::Float(0.3)),
            ("contacts", ParamValue::Int(10)),
            ("label", ParamValue::from("baseline")),
            ("ages", ParamValue::from(vec![0, 18, 65])),
        ])
    }

    #[test]
    fn read_back_every_key() {
        let json = json!({"beta": 0.3, "contacts": 10, "flag": true, "ages": [1, 2]});
        let pars = ParameterStore::from_json(json.clone()).unwrap();
        for (key, value) in json.as_object().unwrap() {
            let expected: ParamValue = serde_json::from_value(value.clone()).unwrap();
            assert_eq!(pars.get_parameter(key).unwrap(), expected);
        }
        assert_eq!(pars.len(), 4);
    }

    #[test]
    fn keys_keep_insertion_order() {
        let pars = store();
        let keys: Vec<&str> = pars.keys().collect();
        assert_eq!(keys, vec!["beta", "contacts", "label", "ages"]);
    }

    #[test]
    fn not_a_mapping() {
        let err = ParameterStore::from_json(json!([1, 2, 3])).unwrap_err();
        assert!(matches!(err, EpiError::NotAMapping(ref kind) if kind == "an array"));
        let err = ParameterStore::from_json(json!(3)).unwrap_err();
        assert!(matches!(err, EpiError::NotAMapping(_)));
    }

    #[test]
    fn set_changes_only_that_key() {
        let mut pars = store();
        let before = pars.clone();
        pars.set_parameter("contacts", 12).unwrap();
        assert_eq!(pars.get("contacts"), Some(&ParamValue::Int(12)));
        for key in ["beta", "label", "ages"] {
            assert_eq!(pars.get(key), before.get(key));
        }
    }

    #[test]
    fn set_unknown_key_suggests() {
        let mut pars = store();
        let err = pars.set_parameter("betta", 0.1).unwrap_err();
        match err {
            EpiError::UnknownParameter {
                key, suggestion, ..
            } => {
                assert_eq!(key, "betta");
                assert_eq!(suggestion.as_deref(), Some("beta"));
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(pars, store());
    }

    #[test]
    fn get_unknown_key_lists_keys() {
        let pars = store();
        let err = pars.get_parameter("zzzzzzzzzz").unwrap_err();
        match err {
            EpiError::UnknownParameter {
                suggestion,
                valid_keys,
                ..
            } => {
                assert_eq!(suggestion, None);
                assert_eq!(valid_keys, vec!["beta", "contacts", "label", "ages"]);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn set_checks_kind() {
        let mut pars = store();
        pars.set_parameter("beta", 1).unwrap();
        assert_eq!(pars.get("beta"), Some(&ParamValue::Float(1.0)));
        let err = pars.set_parameter("contacts", "many").unwrap_err();
        assert!(matches!(
            err,
            EpiError::ParameterType {
                expected: "an integer",
                found: "text",
                ..
            }
        ));
    }

    #[test]
    fn merge_adopts_or_updates() {
        let update = ParameterStore::from_pairs([("beta", 0.5)]);
        let adopted = ParameterStore::merge(None, update.clone()).unwrap();
        assert_eq!(adopted, update);

        let merged = ParameterStore::merge(Some(store()), update).unwrap();
        assert_eq!(merged.get("beta"), Some(&ParamValue::Float(0.5)));
        assert_eq!(merged.get("contacts"), Some(&ParamValue::Int(10)));
        assert_eq!(merged.len(), 4);
    }

    #[test]
    fn merge_rejects_new_keys() {
        let update = ParameterStore::from_pairs([("beta", 0.5), ("gamma", 0.1)]);
        let err = ParameterStore::merge(Some(store()), update).unwrap_err();
        assert!(matches!(err, EpiError::UnknownParameter { ref key, .. } if key == "gamma"));
    }

    #[test]
    fn update_with_bad_kind_writes_nothing() {
        let mut pars = store();
        let err = pars
            .update_parameters([
                ("beta", ParamValue::Float(0.5)),
                ("label", ParamValue::Int(3)),
            ])
            .unwrap_err();
        assert!(matches!(err, EpiError::ParameterType { ref key, .. } if key == "label"));
        assert_eq!(pars, store());
    }

    #[test]
    fn scale_numeric() {
        let mut pars = store();
        assert_eq!(
            pars.scale_parameter("beta", 2.0).unwrap(),
            ParamValue::Float(0.6)
        );
        assert_eq!(
            pars.scale_parameter("contacts", 1.26).unwrap(),
            ParamValue::Int(13)
        );
        assert!(pars.scale_parameter("label", 2.0).is_err());
    }
}
