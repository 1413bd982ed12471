//! Template parameter resolution against the pool.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::ParameterContext;
use crate::errors::MissingParametersError;
use crate::provider::StackParameter;
use crate::template::TemplateDocument;

/// Where a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterOrigin {
    /// The parameter pool.
    Pool,
    /// The template's declared default.
    Default,
}

/// A template parameter with its resolved value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedParameter {
    /// Parameter name.
    pub key: String,
    /// Resolved value.
    pub value: String,
    /// Where the value came from.
    pub origin: ParameterOrigin,
}

impl From<ResolvedParameter> for StackParameter {
    fn from(resolved: ResolvedParameter) -> Self {
        Self::new(resolved.key, resolved.value)
    }
}

/// Resolves every parameter the template declares: the pooled value if any,
/// else the template default. Fails listing every parameter with neither.
pub fn resolve_parameters(
    stack_name: &str,
    template: &TemplateDocument,
    ctx: &ParameterContext,
) -> Result<Vec<ResolvedParameter>, MissingParametersError> {
    let mut resolved = Vec::with_capacity(template.parameters().len());
    let mut missing = Vec::new();

    for declared in template.parameters() {
        if let Some(value) = ctx.get(&declared.name) {
            resolved.push(ResolvedParameter {
                key: declared.name.clone(),
                value: value.to_string(),
                origin: ParameterOrigin::Pool,
            });
            continue;
        }

        if ctx.is_conflicted(&declared.name) {
            warn!(
                stack = %stack_name,
                parameter = %declared.name,
                "Parameter has conflicting values and was dropped from the pool"
            );
        }

        match &declared.default {
            Some(default) => resolved.push(ResolvedParameter {
                key: declared.name.clone(),
                value: default.clone(),
                origin: ParameterOrigin::Default,
            }),
            None => missing.push(declared.name.clone()),
        }
    }

    if !missing.is_empty() {
        return Err(MissingParametersError::new(stack_name, missing));
    }

    debug!(
        stack = %stack_name,
        parameters = ?resolved.iter().map(|p| format!("{}={}", p.key, p.value)).collect::<Vec<_>>(),
        "Resolved template parameters"
    );
    Ok(resolved)
}
