use indexmap::IndexMap;
use serde_derive::Serialize;

use crate::error::EpiError;

/// Named time series produced by a run, one value per time point.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Results {
    series: IndexMap<String, Vec<f64>>,
}

impl Results {
    /// Adds (or resets) a zero-filled series of length `npts`.
    pub fn add_series(&mut self, key: &str, npts: usize) {
        self.series.insert(key.to_string(), vec![0.0; npts]);
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.series.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn get(&self, key: &str) -> Option<&[f64]> {
        self.series.get(key).map(Vec::as_slice)
    }

    /// # Errors
    ///
    /// Fails if there is no series named `key`.
    pub fn series_mut(&mut self, key: &str) -> Result<&mut [f64], EpiError> {
        self.series
            .get_mut(key)
            .map(Vec::as_mut_slice)
            .ok_or_else(|| EpiError::Other(format!("No result series named {key}")))
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Adds every series of `other` into the matching series of `self`, elementwise.
    ///
    /// # Errors
    ///
    /// [`EpiError::SeriesMismatch`] if `other` is missing a series or has one of a different
    /// length. `self` is left unchanged in that case.
    pub fn accumulate(&mut self, other: &Results) -> Result<(), EpiError> {
        for (key, values) in &self.series {
            let found = other.series.get(key).map_or(0, Vec::len);
            if found != values.len() {
                return Err(EpiError::SeriesMismatch {
                    key: key.clone(),
                    expected: values.len(),
                    found,
                });
            }
        }
        for (key, values) in &mut self.series {
            if let Some(addend) = other.series.get(key) {
                for (value, extra) in values.iter_mut().zip(addend) {
                    *value += extra;
                }
            }
        }
        Ok(())
    }
}
