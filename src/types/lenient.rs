//! Forgiving decoding for model-produced payloads.
//!
//! Model output is kept wherever it can be read. A wrong scalar type turns
//! into a default or a stringified value, and a list element that cannot be
//! read is dropped on its own instead of failing its parent.

use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use serde_json::Value;
use tracing::warn;

/// Read a number from a JSON value, accepting numeric strings such as `"80"` or `" 12.5 "`.
pub(crate) fn coerce_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|number| number.is_finite())
}

fn text_of(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text),
        other => Some(other.to_string()),
    }
}

fn elements<T: DeserializeOwned>(value: Value) -> Option<Vec<T>> {
    match value {
        Value::Array(values) => Some(
            values
                .into_iter()
                .enumerate()
                .filter_map(|(index, value)| match serde_json::from_value(value) {
                    Ok(element) => Some(element),
                    Err(err) => {
                        warn!(
                            target: "trip_planner::normalizer",
                            index,
                            error = %err,
                            "dropping unreadable list element"
                        );
                        None
                    }
                })
                .collect(),
        ),
        Value::Null => None,
        other => {
            warn!(
                target: "trip_planner::normalizer",
                found = %other,
                "expected a list, ignoring value"
            );
            None
        }
    }
}

/// `deserialize_with` helper: numbers or numeric strings, anything else becomes `0.0`.
pub(crate) fn number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(coerce_f64(&value).unwrap_or(0.0))
}

/// Non-negative whole number such as a day counter; `"2"` and `2.0` both read as 2.
pub(crate) fn count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(coerce_f64(&value)
        .filter(|number| *number >= 0.0 && *number <= f64::from(u32::MAX))
        .map(|number| number.round() as u32)
        .unwrap_or(0))
}

/// Text field: `null` becomes empty, other scalars are stringified.
pub(crate) fn string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(text_of(Value::deserialize(deserializer)?).unwrap_or_default())
}

pub(crate) fn optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(text_of(Value::deserialize(deserializer)?))
}

/// List of text entries; nulls are skipped and other scalars stringified.
pub(crate) fn optional_strings<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(elements::<Value>(Value::deserialize(deserializer)?)
        .map(|values| values.into_iter().filter_map(text_of).collect()))
}

/// List whose unreadable elements are dropped. Anything but an array reads as empty.
pub(crate) fn list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(elements(Value::deserialize(deserializer)?).unwrap_or_default())
}

pub(crate) fn optional_list<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(elements(Value::deserialize(deserializer)?))
}

/// Nested object that reads as `None` when it has the wrong shape.
pub(crate) fn optional<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        value => match serde_json::from_value(value) {
            Ok(decoded) => Ok(Some(decoded)),
            Err(err) => {
                warn!(
                    target: "trip_planner::normalizer",
                    error = %err,
                    "ignoring unreadable nested object"
                );
                Ok(None)
            }
        },
    }
}
