//! Response contracts
//!
//! Every agent result type implements [`ResponseContract`]: a closed, typed
//! shape plus the JSON schema sent to the backend with the request. Result
//! types use `#[serde(default)]` so a missing field becomes empty, while a
//! field of the wrong type is a validation failure.

use serde::de::{DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::{json, Map, Value};

pub trait ResponseContract: DeserializeOwned + Send {
    /// Contract name used in logs and errors
    const NAME: &'static str;

    fn schema() -> Value;
}

pub fn string() -> Value {
    json!({ "type": "string" })
}

pub fn number() -> Value {
    json!({ "type": "number" })
}

pub fn string_enum(values: &[&str]) -> Value {
    json!({ "type": "string", "enum": values })
}

pub fn array_of(items: Value) -> Value {
    json!({ "type": "array", "items": items })
}

pub fn string_array() -> Value {
    array_of(string())
}

pub fn object(properties: &[(&str, Value)]) -> Value {
    let props: Map<String, Value> = properties
        .iter()
        .map(|(name, schema)| (name.to_string(), schema.clone()))
        .collect();
    json!({ "type": "object", "properties": props })
}

/// Accept an integer, a float (truncated), a numeric string, or null (0).
pub fn lenient_u64<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match &value {
        Value::Null => Ok(0),
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .ok_or_else(|| serde::de::Error::custom(format!("expected a non-negative number, got {}", n))),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite() && *f >= 0.0)
            .map(|f| f as u64)
            .ok_or_else(|| serde::de::Error::custom(format!("expected a number, got \"{}\"", s))),
        other => Err(serde::de::Error::custom(format!("expected a number, got {}", other))),
    }
}

/// Accept a float, an integer, a numeric string, or null (0.0).
/// Non-finite values (`"NaN"`, `"inf"`) become 0.0.
pub fn lenient_f64<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match &value {
        Value::Null => Ok(0.0),
        Value::Number(n) => n
            .as_f64()
            .map(finite_or_zero)
            .ok_or_else(|| serde::de::Error::custom(format!("expected a number, got {}", n))),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map(finite_or_zero)
            .map_err(|_| serde::de::Error::custom(format!("expected a number, got \"{}\"", s))),
        other => Err(serde::de::Error::custom(format!("expected a number, got {}", other))),
    }
}

/// NaN and infinities have no JSON form; they read as 0.0 like null.
fn finite_or_zero(f: f64) -> f64 {
    if f.is_finite() {
        f
    } else {
        0.0
    }
}

/// Accept a list of strings, a single string (one element, empty if blank),
/// or null.
pub fn string_or_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(s)) if s.trim().is_empty() => Vec::new(),
        Some(OneOrMany::One(s)) => vec![s],
        Some(OneOrMany::Many(items)) => items,
    })
}
