use std::fmt::{self, Display};

use serde_derive::{Deserialize, Serialize};

/// A single parameter value. Parameters are loosely typed at the edges (JSON
/// files, command-line overrides) but a stored value keeps its kind for life.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<ParamValue>),
}

impl ParamValue {
    /// A short name for the kind of value held, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            ParamValue::Bool(_) => "a boolean",
            ParamValue::Int(_) => "an integer",
            ParamValue::Float(_) => "a float",
            ParamValue::Text(_) => "text",
            ParamValue::List(_) => "a list",
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            #[allow(clippy::cast_precision_loss)]
            ParamValue::Int(v) => Some(*v as f64),
            ParamValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParamValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        self.as_i64().and_then(|v| u64::try_from(v).ok())
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ParamValue]> {
        match self {
            ParamValue::List(v) => Some(v),
            _ => None,
        }
    }

    /// Converts `value` so that it can replace `self`. Integers are promoted
    /// when the slot holds a float; every other kind must match exactly.
    pub(crate) fn conform(&self, value: ParamValue) -> Result<ParamValue, ParamValue> {
        match (self, value) {
            #[allow(clippy::cast_precision_loss)]
            (ParamValue::Float(_), ParamValue::Int(v)) => Ok(ParamValue::Float(v as f64)),
            (ParamValue::Bool(_), v @ ParamValue::Bool(_))
            | (ParamValue::Int(_), v @ ParamValue::Int(_))
            | (ParamValue::Float(_), v @ ParamValue::Float(_))
            | (ParamValue::Text(_), v @ ParamValue::Text(_))
            | (ParamValue::List(_), v @ ParamValue::List(_)) => Ok(v),
            (_, v) => Err(v),
        }
    }

    /// Parses a command-line style value: anything that reads as JSON keeps
    /// its JSON kind, everything else becomes text.
    pub fn parse(raw: &str) -> ParamValue {
        serde_json::from_str(raw).unwrap_or_else(|_| ParamValue::Text(raw.to_string()))
    }
}

impl Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ParamValue::Bool(v) => write!(f, "{v}"),
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Float(v) => write!(f, "{v}"),
            ParamValue::Text(v) => write!(f, "{v}"),
            ParamValue::List(values) => {
                write!(f, "[")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{value}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        ParamValue::Int(i64::from(value))
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        ParamValue::Int(i64::from(value))
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Float(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

impl<T: Into<ParamValue>> From<Vec<T>> for ParamValue {
    fn from(values: Vec<T>) -> Self {
        ParamValue::List(values.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_kinds() {
        let values: Vec<ParamValue> =
            serde_json::from_str(r#"[true, 3, 2.5, "x", [1, 2]]"#).unwrap();
        assert_eq!(
            values,
            vec![
                ParamValue::Bool(true),
                ParamValue::Int(3),
                ParamValue::Float(2.5),
                ParamValue::Text("x".to_string()),
                ParamValue::List(vec![ParamValue::Int(1), ParamValue::Int(2)]),
            ]
        );
    }

    #[test]
    fn conform_promotes_int_into_float() {
        let slot = ParamValue::Float(0.5);
        assert_eq!(slot.conform(ParamValue::Int(2)), Ok(ParamValue::Float(2.0)));
        assert_eq!(
            slot.conform(ParamValue::Bool(true)),
            Err(ParamValue::Bool(true))
        );
        // Floats never narrow into integers
        let slot = ParamValue::Int(1);
        assert!(slot.conform(ParamValue::Float(1.5)).is_err());
    }

    #[test]
    fn parse_command_line_values() {
        assert_eq!(ParamValue::parse("12"), ParamValue::Int(12));
        assert_eq!(ParamValue::parse("0.25"), ParamValue::Float(0.25));
        assert_eq!(ParamValue::parse("false"), ParamValue::Bool(false));
        assert_eq!(
            ParamValue::parse("household"),
            ParamValue::Text("household".to_string())
        );
    }

    #[test]
    fn display_list() {
        let value = ParamValue::from(vec![1, 2, 3]);
        assert_eq!(value.to_string(), "[1, 2, 3]");
    }
}
