//! Template documents.
//!
//! A template is consumed as an opaque body plus the parameters it declares.
//! Only `Parameters.<name>.Default` is interpreted; everything else is passed
//! to the provider untouched.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::TemplateError;

/// A parameter declared by a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateParameter {
    /// Declared name.
    pub name: String,
    /// Declared default, stringified.
    pub default: Option<String>,
}

impl TemplateParameter {
    /// Creates a parameter with no default.
    #[must_use]
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
        }
    }

    /// Creates a parameter with a default value.
    #[must_use]
    pub fn with_default(name: impl Into<String>, default: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: Some(default.into()),
        }
    }
}

/// A loaded template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateDocument {
    body: String,
    parameters: Vec<TemplateParameter>,
}

impl TemplateDocument {
    /// Creates a template from its parts.
    #[must_use]
    pub const fn new(body: String, parameters: Vec<TemplateParameter>) -> Self {
        Self { body, parameters }
    }

    /// Reads and parses a template file. `.yml`/`.yaml` files are parsed as
    /// YAML (short-form intrinsic tags allowed), anything else as JSON.
    pub fn load(path: &Path) -> Result<Self, TemplateError> {
        let body = std::fs::read_to_string(path).map_err(|source| TemplateError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(body, path)
    }

    /// Parses a template body. `origin` selects the format and is used in
    /// error messages.
    pub fn parse(body: String, origin: &Path) -> Result<Self, TemplateError> {
        let parse_error = |message: String| TemplateError::Parse {
            path: PathBuf::from(origin),
            message,
        };

        let parameters = if is_yaml(origin) {
            let doc: serde_yaml::Value =
                serde_yaml::from_str(&body).map_err(|e| parse_error(e.to_string()))?;
            yaml_parameters(&doc)
        } else {
            let doc: serde_json::Value =
                serde_json::from_str(&body).map_err(|e| parse_error(e.to_string()))?;
            json_parameters(&doc)
        };

        Ok(Self { body, parameters })
    }

    /// The raw template body.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Declared parameters, in declaration order.
    #[must_use]
    pub fn parameters(&self) -> &[TemplateParameter] {
        &self.parameters
    }
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yml" | "yaml")
    )
}

fn json_parameters(doc: &serde_json::Value) -> Vec<TemplateParameter> {
    let Some(declared) = doc.get("Parameters").and_then(serde_json::Value::as_object) else {
        return Vec::new();
    };

    declared
        .iter()
        .map(|(name, spec)| TemplateParameter {
            name: name.clone(),
            default: spec.get("Default").and_then(json_default),
        })
        .collect()
}

fn json_default(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        serde_json::Value::Array(items) => items
            .iter()
            .map(json_default)
            .collect::<Option<Vec<_>>>()
            .map(|items| items.join(",")),
        serde_json::Value::Null | serde_json::Value::Object(_) => None,
    }
}

fn yaml_parameters(doc: &serde_yaml::Value) -> Vec<TemplateParameter> {
    let Some(declared) = doc.get("Parameters").and_then(serde_yaml::Value::as_mapping) else {
        return Vec::new();
    };

    declared
        .iter()
        .filter_map(|(name, spec)| {
            Some(TemplateParameter {
                name: name.as_str()?.to_string(),
                default: spec.get("Default").and_then(yaml_default),
            })
        })
        .collect()
}

fn yaml_default(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        serde_yaml::Value::Sequence(items) => items
            .iter()
            .map(yaml_default)
            .collect::<Option<Vec<_>>>()
            .map(|items| items.join(",")),
        serde_yaml::Value::Null | serde_yaml::Value::Mapping(_) | serde_yaml::Value::Tagged(_) => {
            None
        }
    }
}
