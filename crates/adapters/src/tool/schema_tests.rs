// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

fn schema_with(parameters: Value) -> ToolSchema {
    ToolSchema {
        name: "t".into(),
        description: String::new(),
        parameters,
        env: BTreeMap::new(),
    }
}

#[test]
fn usage_output_round_trips_through_json() {
    let raw = r#"{
        "schema": {
            "name": "currentdatetime",
            "description": "Returns the current date and time",
            "parameters": {"type": "object", "properties": {}}
        },
        "env": {
            "TZ": {"type": "string", "description": "IANA time zone", "default": "UTC"}
        }
    }"#;
    let usage: UsageOutput = serde_json::from_str(raw).unwrap();
    let reserialized = serde_json::to_value(&usage).unwrap();
    let reparsed: UsageOutput = serde_json::from_value(reserialized).unwrap();
    let schema = reparsed.into_schema();
    assert_eq!(schema.name, "currentdatetime");
    assert_eq!(schema.env["TZ"].default.as_deref(), Some("UTC"));
}

#[test]
fn validate_accepts_object_with_required_fields() {
    let schema = schema_with(serde_json::json!({
        "type": "object",
        "properties": {"city": {"type": "string"}},
        "required": ["city"]
    }));
    validate_input(&schema, r#"{"city": "Oslo"}"#).unwrap();
}

#[test]
fn validate_rejects_missing_required() {
    let schema = schema_with(serde_json::json!({
        "type": "object",
        "required": ["city"]
    }));
    let err = validate_input(&schema, "{}").unwrap_err();
    assert!(err.to_string().contains("city"));
}

#[parameterized(
    not_json = { "not json" },
    array = { "[1, 2]" },
    string = { "\"text\"" },
    number = { "7" },
)]
fn validate_rejects_non_object_payloads(input: &str) {
    let schema = schema_with(serde_json::json!({"type": "object"}));
    assert!(validate_input(&schema, input).is_err());
}

#[test]
fn empty_input_object_is_fine_without_required() {
    let schema = schema_with(serde_json::json!({"type": "object", "properties": {}}));
    validate_input(&schema, "{}").unwrap();
}

#[test]
fn health_output_parses() {
    let ok: HealthOutput = serde_json::from_str(r#"{"status": true}"#).unwrap();
    assert!(ok.status);
    let bad: HealthOutput =
        serde_json::from_str(r#"{"status": false, "details": "no API key"}"#).unwrap();
    assert!(!bad.status);
    assert_eq!(bad.details.as_deref(), Some("no API key"));
}
