//! Source-agnostic parameter records.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single key/value parameter, with its source already stripped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParameterRecord {
    /// Parameter key.
    pub key: String,
    /// Parameter value.
    pub value: String,
}

impl ParameterRecord {
    /// Creates a new parameter record.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Converts a raw source payload into a record.
    ///
    /// Accepts declared pairs (`ParameterKey`/`ParameterValue`) and stack
    /// outputs (`OutputKey`/`OutputValue`). Returns `None` for any other
    /// shape.
    #[must_use]
    pub fn from_payload(payload: &serde_json::Value) -> Option<Self> {
        let object = payload.as_object()?;

        let (key, value) = if let Some(key) = object.get("ParameterKey") {
            (key, object.get("ParameterValue")?)
        } else if let Some(key) = object.get("OutputKey") {
            (key, object.get("OutputValue")?)
        } else {
            return None;
        };

        Some(Self::new(key.as_str()?, scalar_to_string(value)?))
    }
}

impl fmt::Display for ParameterRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// A named output exposed by a stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackOutput {
    /// Output key.
    pub key: String,
    /// Output value.
    pub value: String,
}

impl StackOutput {
    /// Creates a new stack output.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl From<StackOutput> for ParameterRecord {
    fn from(output: StackOutput) -> Self {
        Self::new(output.key, output.value)
    }
}

fn scalar_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_declared_payload() {
        let record =
            ParameterRecord::from_payload(&json!({"ParameterKey": "Env", "ParameterValue": "prod"}));
        assert_eq!(record, Some(ParameterRecord::new("Env", "prod")));
    }

    #[test]
    fn test_from_output_payload() {
        let record = ParameterRecord::from_payload(
            &json!({"OutputKey": "VpcId", "OutputValue": "vpc-123", "Description": "ignored"}),
        );
        assert_eq!(record, Some(ParameterRecord::new("VpcId", "vpc-123")));
    }

    #[test]
    fn test_numeric_value_is_stringified() {
        let record =
            ParameterRecord::from_payload(&json!({"ParameterKey": "Port", "ParameterValue": 8080}));
        assert_eq!(record.unwrap().value, "8080");
    }

    #[test]
    fn test_unexpected_shape_is_rejected() {
        assert!(ParameterRecord::from_payload(&json!({"Key": "a", "Value": "b"})).is_none());
        assert!(ParameterRecord::from_payload(&json!({"ParameterKey": "a"})).is_none());
        assert!(ParameterRecord::from_payload(&json!(["a", "b"])).is_none());
    }

    #[test]
    fn test_output_converts_to_record() {
        let record = ParameterRecord::from(StackOutput::new("Arn", "arn:aws:s3:::b"));
        assert_eq!(record.to_string(), "Arn=arn:aws:s3:::b");
    }
}
