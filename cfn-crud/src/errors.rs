//! Error types for the cfn-crud engine.
//!
//! Every fatal condition of a run is a variant of [`CrudError`]. Recoverable
//! conditions (unresolvable existing-stack references, duplicate parameters,
//! "no updates" rejections) never surface here; they are absorbed by the
//! component that observes them and reported through logs and run events.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

use crate::core::StackStatus;
use crate::provider::ProviderError;

/// The main error type for cfn-crud operations.
#[derive(Debug, Error)]
pub enum CrudError {
    /// The definition document could not be loaded or is malformed.
    #[error("{0}")]
    Definition(#[from] DefinitionError),

    /// A template document could not be loaded or is malformed.
    #[error("{0}")]
    Template(#[from] TemplateError),

    /// A template declares parameters that could not be resolved.
    #[error("{0}")]
    MissingParameters(#[from] MissingParametersError),

    /// A stack exists but is not in a state this tool can update.
    #[error("{0}")]
    StackNotModifiable(#[from] StackNotModifiableError),

    /// The provider refused a create, update or delete request.
    #[error("{0}")]
    OperationRejected(#[from] OperationRejectedError),

    /// A stack operation reached a failure-terminal status.
    #[error("{0}")]
    OperationFailed(#[from] StackOperationFailedError),

    /// The provider reported a stack status outside the known enumeration.
    #[error("Stack '{stack}' reported unrecognized status '{status}'")]
    UnrecognizedStatus {
        /// The stack name.
        stack: String,
        /// The raw status value.
        status: String,
    },

    /// An unexpected provider error.
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl CrudError {
    /// Returns a stable error code for structured logging.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Definition(_) => "CRUD-001-DEFINITION",
            Self::Template(_) => "CRUD-002-TEMPLATE",
            Self::MissingParameters(_) => "CRUD-003-MISSING_PARAMETERS",
            Self::StackNotModifiable(_) => "CRUD-004-NOT_MODIFIABLE",
            Self::OperationRejected(_) => "CRUD-005-REJECTED",
            Self::OperationFailed(_) => "CRUD-006-FAILED",
            Self::UnrecognizedStatus { .. } => "CRUD-007-UNRECOGNIZED_STATUS",
            Self::Provider(_) => "CRUD-008-PROVIDER",
            Self::Io(_) => "CRUD-009-IO",
            Self::Config(_) => "CRUD-010-CONFIG",
        }
    }

    /// Process exit code for this error. Every fatal condition maps to 1.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        1
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("code".to_string(), serde_json::json!(self.code()));
        map.insert("message".to_string(), serde_json::json!(self.to_string()));

        match self {
            Self::MissingParameters(err) => {
                map.insert("stack".to_string(), serde_json::json!(err.stack));
                map.insert("missing".to_string(), serde_json::json!(err.missing));
            }
            Self::StackNotModifiable(err) => {
                map.insert("stack".to_string(), serde_json::json!(err.stack));
            }
            Self::OperationRejected(err) => {
                map.insert("stack".to_string(), serde_json::json!(err.stack));
                map.insert("operation".to_string(), serde_json::json!(err.operation));
                map.insert("provider_code".to_string(), serde_json::json!(err.source.code));
            }
            Self::OperationFailed(err) => {
                map.insert("stack".to_string(), serde_json::json!(err.stack));
                map.insert("operation".to_string(), serde_json::json!(err.operation));
                map.insert("status".to_string(), serde_json::json!(err.status.as_str()));
                if let Some(ref reason) = err.reason {
                    map.insert("reason".to_string(), serde_json::json!(reason));
                }
            }
            Self::UnrecognizedStatus { stack, status } => {
                map.insert("stack".to_string(), serde_json::json!(stack));
                map.insert("status".to_string(), serde_json::json!(status));
            }
            Self::Provider(err) => {
                map.insert("provider_code".to_string(), serde_json::json!(err.code));
            }
            Self::Definition(_) | Self::Template(_) | Self::Io(_) | Self::Config(_) => {}
        }

        map
    }
}

/// The stack operation kinds this tool issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Create a new stack.
    Create,
    /// Update an existing stack.
    Update,
    /// Delete a stack.
    Delete,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// Errors raised while loading the definition document or its parameter files.
#[derive(Debug, Error)]
pub enum DefinitionError {
    /// The file could not be read.
    #[error("Cannot read {path}: {source}")]
    Read {
        /// The offending path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The file could not be parsed.
    #[error("Cannot parse {path}: {message}")]
    Parse {
        /// The offending path.
        path: PathBuf,
        /// Parser message.
        message: String,
    },

    /// The document parsed but does not have the expected shape.
    #[error("Invalid format: {0}")]
    Format(String),
}

impl DefinitionError {
    /// Creates a format error.
    #[must_use]
    pub fn format(message: impl Into<String>) -> Self {
        Self::Format(message.into())
    }
}

/// Errors raised while loading a template document.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// The template could not be read.
    #[error("Cannot read template {path}: {source}")]
    Read {
        /// The template path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The template could not be parsed.
    #[error("Cannot parse template {path}: {message}")]
    Parse {
        /// The template path.
        path: PathBuf,
        /// Parser message.
        message: String,
    },
}

/// Raised when template parameters have neither a pool value nor a default.
#[derive(Debug, Clone, Error)]
#[error("Missing parameters for stack '{stack}': {}", missing.join(", "))]
pub struct MissingParametersError {
    /// The stack being resolved.
    pub stack: String,
    /// Every unresolved parameter name, in template declaration order.
    pub missing: Vec<String>,
}

impl MissingParametersError {
    /// Creates a new missing parameters error.
    #[must_use]
    pub fn new(stack: impl Into<String>, missing: Vec<String>) -> Self {
        Self {
            stack: stack.into(),
            missing,
        }
    }
}

/// Raised when a stack is known to the provider but not in a completed state.
#[derive(Debug, Clone, Error)]
#[error("Stack '{stack}' is active, but not in a completed state")]
pub struct StackNotModifiableError {
    /// The stack name.
    pub stack: String,
}

impl StackNotModifiableError {
    /// Creates a new error.
    #[must_use]
    pub fn new(stack: impl Into<String>) -> Self {
        Self {
            stack: stack.into(),
        }
    }
}

/// Raised when the provider refuses an operation request.
#[derive(Debug, Clone, Error)]
#[error("Provider rejected {operation} of stack '{stack}': {source}")]
pub struct OperationRejectedError {
    /// The stack name.
    pub stack: String,
    /// The rejected operation.
    pub operation: Operation,
    /// The provider error.
    #[source]
    pub source: ProviderError,
}

impl OperationRejectedError {
    /// Creates a new error.
    #[must_use]
    pub fn new(stack: impl Into<String>, operation: Operation, source: ProviderError) -> Self {
        Self {
            stack: stack.into(),
            operation,
            source,
        }
    }
}

/// Raised when polling observes a failure-terminal status.
#[derive(Debug, Clone, Error)]
#[error("Stack '{stack}' failed to {operation}: {status}{}", reason.as_ref().map(|r| format!(" ({r})")).unwrap_or_default())]
pub struct StackOperationFailedError {
    /// The stack name.
    pub stack: String,
    /// The operation that failed.
    pub operation: Operation,
    /// The terminal status observed.
    pub status: StackStatus,
    /// The provider's status reason, when present.
    pub reason: Option<String>,
}

impl StackOperationFailedError {
    /// Creates a new error.
    #[must_use]
    pub fn new(
        stack: impl Into<String>,
        operation: Operation,
        status: StackStatus,
        reason: Option<String>,
    ) -> Self {
        Self {
            stack: stack.into(),
            operation,
            status,
            reason,
        }
    }
}
