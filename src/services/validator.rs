//! Boundary validation for records entering the analytics core
//!
//! Raw JSON from the API or a snapshot file is checked here, once, so the
//! aggregator can work on well-typed slices.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::types::{BrokerstatError, Client, Policy, Result};

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Unwrap a list response: bare array or paginated `{ "results": [...] }`.
fn list_items<'a>(value: &'a Value, what: &str) -> Result<&'a [Value]> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Object(map) => match map.get("results") {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(BrokerstatError::contract(format!(
                "expected an array of {}, got object",
                what
            ))),
        },
        other => Err(BrokerstatError::contract(format!(
            "expected an array of {}, got {}",
            what,
            kind_of(other)
        ))),
    }
}

fn parse_records<T: DeserializeOwned>(value: &Value, what: &str, one: &str) -> Result<Vec<T>> {
    let items = list_items(value, what)?;
    let mut records = Vec::with_capacity(items.len());

    for (idx, item) in items.iter().enumerate() {
        let Value::Object(map) = item else {
            return Err(BrokerstatError::contract(format!(
                "{} at index {} is a {}, not an object",
                one,
                idx,
                kind_of(item)
            )));
        };
        if map.get("id").is_none_or(Value::is_null) {
            return Err(BrokerstatError::contract(format!(
                "{} at index {} is missing its id",
                one, idx
            )));
        }
        let record = T::deserialize(item).map_err(|e| {
            BrokerstatError::contract(format!("{} at index {}: {}", one, idx, e))
        })?;
        records.push(record);
    }

    Ok(records)
}

/// Validate and type a clients list.
pub fn parse_clients(value: &Value) -> Result<Vec<Client>> {
    parse_records(value, "clients", "client")
}

/// Validate and type a policies list.
pub fn parse_policies(value: &Value) -> Result<Vec<Policy>> {
    parse_records(value, "policies", "policy")
}
