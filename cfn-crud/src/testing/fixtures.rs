//! Builders for definition documents and templates in their on-disk JSON
//! shape.

use serde_json::{json, Map, Value};

/// Builds a definition document as JSON.
#[derive(Debug, Default, Clone)]
pub struct DefinitionFixture {
    files: Vec<Value>,
    existing_stacks: Vec<Value>,
    key_value_pairs: Vec<Value>,
    stacks: Vec<Value>,
    deletions: Vec<Value>,
}

impl DefinitionFixture {
    /// Creates an empty document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a parameter file element.
    #[must_use]
    pub fn with_file(mut self, label: &str, location: &str) -> Self {
        self.files
            .push(json!({ label: { "Properties": { "Path": location } } }));
        self
    }

    /// Adds an existing-stack element.
    #[must_use]
    pub fn with_existing_stack(mut self, name: &str) -> Self {
        self.existing_stacks.push(json!({ name: {} }));
        self
    }

    /// Adds an inline pair.
    #[must_use]
    pub fn with_pair(mut self, key: &str, value: &str) -> Self {
        self.key_value_pairs
            .push(json!({ "ParameterKey": key, "ParameterValue": value }));
        self
    }

    /// Adds an arbitrary inline payload.
    #[must_use]
    pub fn with_raw_pair(mut self, payload: Value) -> Self {
        self.key_value_pairs.push(payload);
        self
    }

    /// Adds a stack to create or update.
    #[must_use]
    pub fn with_stack(self, name: &str, template: &str) -> Self {
        self.with_stack_properties(name, json!({ "Template": template }))
    }

    /// Adds a stack with explicit properties.
    #[must_use]
    pub fn with_stack_properties(mut self, name: &str, properties: Value) -> Self {
        self.stacks.push(json!({ name: { "Properties": properties } }));
        self
    }

    /// Adds a stack to delete.
    #[must_use]
    pub fn with_deletion(mut self, name: &str) -> Self {
        self.deletions.push(json!({ name: {} }));
        self
    }

    /// The document as JSON.
    #[must_use]
    pub fn to_value(&self) -> Value {
        json!({
            "Parameters": {
                "Files": self.files,
                "ExistingStacks": self.existing_stacks,
                "KeyValuePairs": self.key_value_pairs,
            },
            "StacksToCreateOrUpdate": self.stacks,
            "StacksToDelete": self.deletions,
        })
    }

    /// The document as pretty-printed JSON text.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self.to_value()).unwrap_or_default()
    }
}

/// Builds a JSON template declaring parameters.
#[derive(Debug, Default, Clone)]
pub struct TemplateFixture {
    parameters: Map<String, Value>,
}

impl TemplateFixture {
    /// Creates a template with no parameters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a parameter without a default.
    #[must_use]
    pub fn with_parameter(mut self, name: &str) -> Self {
        self.parameters
            .insert(name.to_string(), json!({ "Type": "String" }));
        self
    }

    /// Declares a parameter with a default.
    #[must_use]
    pub fn with_default(mut self, name: &str, default: &str) -> Self {
        self.parameters.insert(
            name.to_string(),
            json!({ "Type": "String", "Default": default }),
        );
        self
    }

    /// The template body.
    #[must_use]
    pub fn to_json(&self) -> String {
        let body = json!({
            "AWSTemplateFormatVersion": "2010-09-09",
            "Parameters": self.parameters,
            "Resources": {
                "Topic": { "Type": "AWS::SNS::Topic" }
            },
        });
        serde_json::to_string_pretty(&body).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::DefinitionDocument;
    use crate::template::TemplateDocument;
    use std::path::Path;

    #[test]
    fn test_definition_fixture_parses() {
        let text = DefinitionFixture::new()
            .with_file("common", "/tmp/common.json")
            .with_existing_stack("shared")
            .with_pair("Env", "dev")
            .with_stack("vpc", "/tmp/vpc.json")
            .with_deletion("old")
            .to_json();

        let document = DefinitionDocument::parse(&text, Path::new("run.json")).unwrap();
        assert_eq!(document.parameters.files[0].label, "common");
        assert_eq!(document.parameters.existing_stacks, vec!["shared".to_string()]);
        assert_eq!(document.stacks_to_create_or_update[0].name, "vpc");
        assert_eq!(document.stacks_to_delete, vec!["old".to_string()]);
    }

    #[test]
    fn test_template_fixture_parses() {
        let body = TemplateFixture::new()
            .with_parameter("VpcId")
            .with_default("Env", "dev")
            .to_json();
        let template = TemplateDocument::parse(body, Path::new("t.json")).unwrap();
        assert_eq!(template.parameters().len(), 2);
    }
}
