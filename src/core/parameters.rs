use crate::domain::model::StackParameter;
use crate::domain::ports::SsmApi;
use crate::utils::error::{FrameworkError, Result};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Accepts either `"CAPABILITY_IAM"` or `["CAPABILITY_IAM", ...]`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl Default for OneOrMany {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

impl OneOrMany {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(value) => vec![value],
            OneOrMany::Many(values) => values,
        }
    }
}

/// Strings pass through, objects are JSON-encoded, anything else is dropped.
pub fn parameter_value(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Object(_) => Some(value.to_string()),
        _ => None,
    }
}

/// Explicit values win over values stored in SSM.
pub fn merge_parameters(
    explicit: &Map<String, Value>,
    from_ssm: &Map<String, Value>,
) -> Vec<StackParameter> {
    let mut merged: BTreeMap<&str, &Value> = BTreeMap::new();
    for (key, value) in explicit {
        merged.insert(key, value);
    }
    for (key, value) in from_ssm {
        merged.entry(key).or_insert(value);
    }

    merged
        .into_iter()
        .filter_map(|(key, value)| match parameter_value(value) {
            Some(value) => Some(StackParameter::new(key, value)),
            None => {
                tracing::warn!(parameter = %key, "Skipping parameter with unsupported value type");
                None
            }
        })
        .collect()
}

/// Read a JSON object of parameter values stored in one SSM parameter.
pub async fn load_ssm_parameter_map(ssm: &dyn SsmApi, path: &str) -> Result<Map<String, Value>> {
    let raw = ssm.get_parameter(path, false).await?;
    match serde_json::from_str::<Value>(&raw)? {
        Value::Object(map) => Ok(map),
        _ => Err(FrameworkError::invalid_event(format!(
            "SSM parameter {} does not hold a JSON object",
            path
        ))),
    }
}

pub async fn resolve_parameters(
    ssm: &dyn SsmApi,
    explicit: &Map<String, Value>,
    ssm_parameter_path: Option<&str>,
) -> Result<Vec<StackParameter>> {
    let from_ssm = match ssm_parameter_path {
        Some(path) => load_ssm_parameter_map(ssm, path).await?,
        None => Map::new(),
    };
    Ok(merge_parameters(explicit, &from_ssm))
}
