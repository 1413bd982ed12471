//! The definition document: parameter sources plus the ordered create/update
//! and delete lists.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::DefinitionError;

type NamedEntries = serde_json::Map<String, serde_json::Value>;

/// A stack to create or update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackDefinition {
    /// Stack name.
    pub name: String,
    /// Template location as written in the document.
    pub template_location: String,
    /// Acknowledged capabilities.
    pub capabilities: BTreeSet<String>,
    /// Disable rollback on create failure.
    pub disable_rollback: bool,
    /// Feed the stack's outputs into the parameter pool on success.
    pub propagate_outputs: bool,
}

impl StackDefinition {
    /// Creates a definition with default flags.
    #[must_use]
    pub fn new(name: impl Into<String>, template_location: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            template_location: template_location.into(),
            capabilities: BTreeSet::new(),
            disable_rollback: false,
            propagate_outputs: true,
        }
    }

    /// Adds a capability.
    #[must_use]
    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.capabilities.insert(capability.into());
        self
    }

    /// Sets the disable-rollback flag.
    #[must_use]
    pub const fn with_disable_rollback(mut self, disable_rollback: bool) -> Self {
        self.disable_rollback = disable_rollback;
        self
    }

    /// Sets the output propagation flag.
    #[must_use]
    pub const fn with_propagate_outputs(mut self, propagate_outputs: bool) -> Self {
        self.propagate_outputs = propagate_outputs;
        self
    }
}

/// A parameter file declared under `Parameters.Files`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterFileSource {
    /// The element's label.
    pub label: String,
    /// File location as written in the document.
    pub location: String,
}

/// Parameter sources, in the order they are ingested.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterSources {
    /// Parameter files.
    pub files: Vec<ParameterFileSource>,
    /// Stacks whose outputs become parameters.
    pub existing_stacks: Vec<String>,
    /// Inline payloads, converted to records at ingestion.
    pub key_value_pairs: Vec<serde_json::Value>,
}

/// A parsed definition document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DefinitionDocument {
    /// Parameter sources.
    pub parameters: ParameterSources,
    /// Stacks to create or update, in processing order.
    pub stacks_to_create_or_update: Vec<StackDefinition>,
    /// Stacks to delete, in processing order.
    pub stacks_to_delete: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawDefinition {
    #[serde(default)]
    parameters: Option<RawParameters>,
    #[serde(default)]
    stacks_to_create_or_update: Vec<NamedEntries>,
    #[serde(default)]
    stacks_to_delete: Vec<NamedEntries>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawParameters {
    #[serde(default)]
    files: Vec<NamedEntries>,
    #[serde(default)]
    existing_stacks: Vec<NamedEntries>,
    #[serde(default)]
    key_value_pairs: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawFileEntry {
    properties: RawFileProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawFileProperties {
    path: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawStackEntry {
    properties: RawStackProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawStackProperties {
    template: String,
    #[serde(default)]
    capabilities: Vec<String>,
    #[serde(default)]
    disable_rollback: bool,
    #[serde(default = "default_add_outputs")]
    add_outputs_to_parameters: bool,
}

const fn default_add_outputs() -> bool {
    true
}

impl DefinitionDocument {
    /// Reads and parses a definition file (`.yml`/`.yaml` as YAML, anything
    /// else as JSON).
    pub fn load(path: &Path) -> Result<Self, DefinitionError> {
        let text = std::fs::read_to_string(path).map_err(|source| DefinitionError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, path)
    }

    /// Parses definition text. `origin` selects the format and is used in
    /// error messages.
    pub fn parse(text: &str, origin: &Path) -> Result<Self, DefinitionError> {
        let parse_error = |message: String| DefinitionError::Parse {
            path: PathBuf::from(origin),
            message,
        };

        let raw: RawDefinition = match origin.extension().and_then(|e| e.to_str()) {
            Some("yml" | "yaml") => {
                serde_yaml::from_str(text).map_err(|e| parse_error(e.to_string()))?
            }
            _ => serde_json::from_str(text).map_err(|e| parse_error(e.to_string()))?,
        };

        Self::from_raw(raw)
    }

    fn from_raw(raw: RawDefinition) -> Result<Self, DefinitionError> {
        let raw_parameters = raw.parameters.unwrap_or_default();

        let files = raw_parameters
            .files
            .into_iter()
            .map(|element| {
                let (label, value) = single_entry(element, "parameter file")?;
                let entry: RawFileEntry = serde_json::from_value(value).map_err(|e| {
                    DefinitionError::format(format!("parameter file '{label}': {e}"))
                })?;
                Ok(ParameterFileSource {
                    label,
                    location: entry.properties.path,
                })
            })
            .collect::<Result<Vec<_>, DefinitionError>>()?;

        let existing_stacks = raw_parameters
            .existing_stacks
            .into_iter()
            .map(|element| single_entry(element, "existing stack").map(|(name, _)| name))
            .collect::<Result<Vec<_>, DefinitionError>>()?;

        let mut stacks_to_create_or_update = Vec::new();
        for element in raw.stacks_to_create_or_update {
            for (name, value) in element {
                let entry: RawStackEntry = serde_json::from_value(value)
                    .map_err(|e| DefinitionError::format(format!("stack '{name}': {e}")))?;
                let properties = entry.properties;
                stacks_to_create_or_update.push(StackDefinition {
                    name,
                    template_location: properties.template,
                    capabilities: properties.capabilities.into_iter().collect(),
                    disable_rollback: properties.disable_rollback,
                    propagate_outputs: properties.add_outputs_to_parameters,
                });
            }
        }

        let stacks_to_delete = raw
            .stacks_to_delete
            .into_iter()
            .flat_map(|element| element.into_iter().map(|(name, _)| name))
            .collect();

        Ok(Self {
            parameters: ParameterSources {
                files,
                existing_stacks,
                key_value_pairs: raw_parameters.key_value_pairs,
            },
            stacks_to_create_or_update,
            stacks_to_delete,
        })
    }
}

fn single_entry(
    element: NamedEntries,
    kind: &str,
) -> Result<(String, serde_json::Value), DefinitionError> {
    if element.len() != 1 {
        return Err(DefinitionError::format(format!(
            "only one object ({kind}) allowed per array element, found {}",
            element.len()
        )));
    }
    element
        .into_iter()
        .next()
        .ok_or_else(|| DefinitionError::format(format!("empty {kind} element")))
}
