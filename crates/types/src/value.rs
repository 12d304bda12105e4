//! Typed parameter values.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use indexmap::IndexMap;
use serde_json::{Number, Value};
use thiserror::Error;

use crate::ParamType;

/// Error returned when raw text cannot be converted to a parameter value.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseValueError {
    #[error("'{raw}' is not a valid {expected} value")]
    Invalid { expected: ParamType, raw: String },
    #[error("map entries must be written as key=value; got '{0}'")]
    MapEntry(String),
    #[error("{0} values cannot be parsed from text")]
    Unsupported(ParamType),
}

/// A value bound to an operation parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    String(String),
    Int32(i32),
    Float(f32),
    Boolean(bool),
    Bytes(Vec<u8>),
    StringList(Vec<String>),
    StringMap(IndexMap<String, String>),
    Json(Value),
}

impl ParamValue {
    pub fn param_type(&self) -> ParamType {
        match self {
            Self::String(_) => ParamType::String,
            Self::Int32(_) => ParamType::Int32,
            Self::Float(_) => ParamType::Float,
            Self::Boolean(_) => ParamType::Boolean,
            Self::Bytes(_) => ParamType::Bytes,
            Self::StringList(_) => ParamType::StringList,
            Self::StringMap(_) => ParamType::StringMap,
            Self::Json(_) => ParamType::Json,
        }
    }

    /// Parse a single textual value for a parameter of type `ty`.
    ///
    /// Lists parse to a one-element list and maps to a one-entry map; callers
    /// that collect repeated values merge them with [`ParamValue::from_entries`].
    pub fn parse(ty: ParamType, raw: &str) -> Result<Self, ParseValueError> {
        let invalid = || ParseValueError::Invalid {
            expected: ty,
            raw: raw.to_string(),
        };
        match ty {
            ParamType::String => Ok(Self::String(raw.to_string())),
            ParamType::Int32 => raw.trim().parse::<i32>().map(Self::Int32).map_err(|_| invalid()),
            ParamType::Float => raw.trim().parse::<f32>().map(Self::Float).map_err(|_| invalid()),
            ParamType::Boolean => match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Ok(Self::Boolean(true)),
                "false" | "0" | "no" => Ok(Self::Boolean(false)),
                _ => Err(invalid()),
            },
            ParamType::StringList => Ok(Self::StringList(vec![raw.to_string()])),
            ParamType::StringMap => {
                let (key, value) = split_map_entry(raw)?;
                Ok(Self::StringMap(IndexMap::from([(key, value)])))
            }
            ParamType::Json => serde_json::from_str::<Value>(raw).map(Self::Json).map_err(|_| invalid()),
            ParamType::Bytes => Err(ParseValueError::Unsupported(ty)),
        }
    }

    /// Build a list or map value from repeated raw entries.
    pub fn from_entries<'a>(ty: ParamType, entries: impl IntoIterator<Item = &'a str>) -> Result<Self, ParseValueError> {
        match ty {
            ParamType::StringList => Ok(Self::StringList(entries.into_iter().map(str::to_string).collect())),
            ParamType::StringMap => {
                let mut map = IndexMap::new();
                for entry in entries {
                    let (key, value) = split_map_entry(entry)?;
                    map.insert(key, value);
                }
                Ok(Self::StringMap(map))
            }
            other => {
                let mut last = None;
                for entry in entries {
                    last = Some(Self::parse(other, entry)?);
                }
                last.ok_or(ParseValueError::Invalid {
                    expected: other,
                    raw: String::new(),
                })
            }
        }
    }

    /// JSON rendering used on the wire and when echoing inputs.
    ///
    /// Byte buffers render as base64 text.
    pub fn to_json(&self) -> Value {
        match self {
            Self::String(text) => Value::String(text.clone()),
            Self::Int32(number) => Value::Number((*number).into()),
            Self::Float(number) => number
                .to_string()
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Self::Boolean(flag) => Value::Bool(*flag),
            Self::Bytes(bytes) => Value::String(STANDARD.encode(bytes)),
            Self::StringList(items) => Value::Array(items.iter().cloned().map(Value::String).collect()),
            Self::StringMap(map) => Value::Object(map.iter().map(|(k, v)| (k.clone(), Value::String(v.clone()))).collect()),
            Self::Json(value) => value.clone(),
        }
    }
}

fn split_map_entry(raw: &str) -> Result<(String, String), ParseValueError> {
    let (key, value) = raw.split_once('=').ok_or_else(|| ParseValueError::MapEntry(raw.to_string()))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(ParseValueError::MapEntry(raw.to_string()));
    }
    Ok((key.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_scalars() {
        assert_eq!(ParamValue::parse(ParamType::Int32, " 5 "), Ok(ParamValue::Int32(5)));
        assert_eq!(ParamValue::parse(ParamType::Float, "80.5"), Ok(ParamValue::Float(80.5)));
        assert_eq!(ParamValue::parse(ParamType::Boolean, "Yes"), Ok(ParamValue::Boolean(true)));
        assert!(ParamValue::parse(ParamType::Int32, "five").is_err());
        assert!(matches!(
            ParamValue::parse(ParamType::Bytes, "x"),
            Err(ParseValueError::Unsupported(ParamType::Bytes))
        ));
    }

    #[test]
    fn map_entries_preserve_insertion_order() {
        let value = ParamValue::from_entries(ParamType::StringMap, ["team=vision", "env=prod", "cost=12=34"]).expect("map value");
        let ParamValue::StringMap(map) = value else {
            panic!("expected a map");
        };
        let keys: Vec<_> = map.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["team", "env", "cost"]);
        assert_eq!(map["cost"], "12=34");
    }

    #[test]
    fn map_entry_without_separator_is_rejected() {
        let err = ParamValue::from_entries(ParamType::StringMap, ["novalue"]).unwrap_err();
        assert_eq!(err, ParseValueError::MapEntry("novalue".into()));
    }

    #[test]
    fn bytes_render_as_base64() {
        let value = ParamValue::Bytes(vec![0x89, 0x50, 0x4e, 0x47]);
        assert_eq!(value.to_json(), json!("iVBORw=="));
    }
}
