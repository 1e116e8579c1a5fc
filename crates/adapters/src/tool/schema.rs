// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tool schema introspection and input validation.

use super::ToolError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One declared environment variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

/// A tool's declared interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// JSON-schema object describing the stdin payload.
    pub parameters: Value,
    #[serde(default)]
    pub env: BTreeMap<String, EnvVar>,
}

/// The exact JSON a tool prints for `--usage`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageOutput {
    pub schema: UsageSchema,
    #[serde(default)]
    pub env: BTreeMap<String, EnvVar>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageSchema {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub parameters: Value,
}

impl UsageOutput {
    pub fn into_schema(self) -> ToolSchema {
        ToolSchema {
            name: self.schema.name,
            description: self.schema.description,
            parameters: self.schema.parameters,
            env: self.env,
        }
    }
}

/// The exact JSON a tool prints for `--health`.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthOutput {
    pub status: bool,
    #[serde(default)]
    pub details: Option<String>,
}

/// Check an execution payload against the tool's declared parameters:
/// it must parse as a JSON object and carry every `required` property.
pub fn validate_input(schema: &ToolSchema, input_json: &str) -> Result<(), ToolError> {
    let value: Value = serde_json::from_str(input_json)
        .map_err(|e| ToolError::InvalidInput(format!("input is not valid JSON: {}", e)))?;
    let Value::Object(object) = &value else {
        return Err(ToolError::InvalidInput("input must be a JSON object".into()));
    };
    let required = schema
        .parameters
        .get("required")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    for name in required.iter().filter_map(Value::as_str) {
        if !object.contains_key(name) {
            return Err(ToolError::InvalidInput(format!(
                "missing required property: {}",
                name
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
