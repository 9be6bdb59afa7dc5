use std::fmt::{self, Display};
use std::io;

/// Provides `EpiError` and maps to other errors to
/// convert to an `EpiError`
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub enum EpiError {
    IoError(io::Error),
    JsonError(serde_json::Error),
    CSVError(csv::Error),
    /// A parameter initializer was not a mapping; holds the kind that was supplied.
    NotAMapping(String),
    UnknownParameter {
        key: String,
        suggestion: Option<String>,
        valid_keys: Vec<String>,
    },
    ParameterType {
        key: String,
        expected: &'static str,
        found: &'static str,
    },
    ConflictingSeed,
    NoiseParameter {
        candidates: Vec<String>,
        found: Vec<String>,
    },
    UnknownOverride(String),
    LengthMismatch {
        key: String,
        expected: usize,
        found: usize,
    },
    NotImplemented(&'static str),
    PersonIndex {
        index: usize,
        population: usize,
    },
    EmptyBatch,
    SeriesMismatch {
        key: String,
        expected: usize,
        found: usize,
    },
    ReportError(String),
    Other(String),
}

impl From<io::Error> for EpiError {
    fn from(error: io::Error) -> Self {
        EpiError::IoError(error)
    }
}

impl From<serde_json::Error> for EpiError {
    fn from(error: serde_json::Error) -> Self {
        EpiError::JsonError(error)
    }
}

impl From<csv::Error> for EpiError {
    fn from(error: csv::Error) -> Self {
        EpiError::CSVError(error)
    }
}

impl From<String> for EpiError {
    fn from(error: String) -> Self {
        EpiError::Other(error)
    }
}

impl From<&str> for EpiError {
    fn from(error: &str) -> Self {
        EpiError::Other(error.to_string())
    }
}

impl std::error::Error for EpiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EpiError::IoError(e) => Some(e),
            EpiError::JsonError(e) => Some(e),
            EpiError::CSVError(e) => Some(e),
            _ => None,
        }
    }
}

impl Display for EpiError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EpiError::IoError(e) => write!(f, "I/O error: {e}"),
            EpiError::JsonError(e) => write!(f, "JSON error: {e}"),
            EpiError::CSVError(e) => write!(f, "CSV error: {e}"),
            EpiError::NotAMapping(kind) => {
                write!(f, "The pars object must be a mapping; you supplied {kind}")
            }
            EpiError::UnknownParameter {
                key,
                suggestion: Some(suggestion),
                ..
            } => write!(f, "Key {key} not found; did you mean \"{suggestion}\"?"),
            EpiError::UnknownParameter {
                key, valid_keys, ..
            } => write!(
                f,
                "Key {key} not found; available keys:\n{}",
                valid_keys.join("\n")
            ),
            EpiError::ParameterType {
                key,
                expected,
                found,
            } => write!(f, "Parameter {key} holds {expected}; cannot assign {found}"),
            EpiError::ConflictingSeed => write!(
                f,
                "You can supply a seed or set randomize=true, but not both"
            ),
            EpiError::NoiseParameter { candidates, found } => write!(
                f,
                "Could not guess noise parameter since out of {candidates:?}, {found:?} were found"
            ),
            EpiError::UnknownOverride(key) => {
                write!(f, "Could not set key {key}: not a valid parameter name")
            }
            EpiError::LengthMismatch {
                key,
                expected,
                found,
            } => write!(
                f,
                "Each entry in iter_parameters must have the same length, not {expected} and {found} (at {key})"
            ),
            EpiError::NotImplemented(hook) => {
                write!(f, "{hook} is not implemented for this model")
            }
            EpiError::PersonIndex { index, population } => write!(
                f,
                "Person index {index} is out of range for a population of {population}"
            ),
            EpiError::EmptyBatch => write!(f, "Cannot combine an empty batch"),
            EpiError::SeriesMismatch {
                key,
                expected,
                found,
            } => write!(
                f,
                "Result series {key} has length {found}; expected {expected}"
            ),
            EpiError::ReportError(msg) | EpiError::Other(msg) => write!(f, "{msg}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_parameter_with_suggestion() {
        let err = EpiError::UnknownParameter {
            key: "betta".to_string(),
            suggestion: Some("beta".to_string()),
            valid_keys: vec!["beta".to_string(), "seed".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Key betta not found; did you mean \"beta\"?"
        );
    }

    #[test]
    fn unknown_parameter_lists_keys() {
        let err = EpiError::UnknownParameter {
            key: "zzz".to_string(),
            suggestion: None,
            valid_keys: vec!["beta".to_string(), "seed".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Key zzz not found; available keys:\nbeta\nseed"
        );
    }

    #[test]
    fn from_str_is_other() {
        let err: EpiError = "boom".into();
        assert!(matches!(err, EpiError::Other(ref m) if m == "boom"));
    }
}
