//! Provider stack client boundary.
//!
//! The engine talks to the infrastructure provider exclusively through
//! [`StackProvider`]. The production implementation lives in
//! [`cloudformation`]; tests use the scripted provider from
//! [`crate::testing`] or a `mockall` mock.

#[cfg(feature = "aws")]
pub mod cloudformation;

#[cfg(feature = "aws")]
pub use cloudformation::CloudFormationProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::{StackEvent, StackOutput, StackStatus};

/// Error code the provider uses for request validation failures.
pub const VALIDATION_ERROR_CODE: &str = "ValidationError";

/// Code assigned to errors that carry no provider error code (transport
/// failures, timeouts, malformed responses).
pub const UNHANDLED_ERROR_CODE: &str = "Unhandled";

const NO_UPDATES_MESSAGE: &str = "No updates are to be performed.";
const STACK_MISSING_FRAGMENT: &str = "does not exist";

/// An error reported by the provider, reduced to its code and message.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct ProviderError {
    /// Provider error code (e.g. `ValidationError`).
    pub code: String,
    /// Provider error message.
    pub message: String,
}

impl ProviderError {
    /// Creates a new provider error.
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Creates a validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(VALIDATION_ERROR_CODE, message)
    }

    /// Creates the validation error the provider returns for an unknown stack.
    #[must_use]
    pub fn stack_missing(stack_name: &str) -> Self {
        Self::validation(format!("Stack with id {stack_name} does not exist"))
    }

    /// Creates the rejection returned when an update computes no changes.
    #[must_use]
    pub fn no_updates() -> Self {
        Self::validation(NO_UPDATES_MESSAGE)
    }

    /// Returns true for request validation errors.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        self.code == VALIDATION_ERROR_CODE
    }

    /// Returns true if an update was rejected because nothing changed.
    #[must_use]
    pub fn is_no_updates(&self) -> bool {
        self.message == NO_UPDATES_MESSAGE
    }

    /// Returns true if the error says the stack does not exist.
    #[must_use]
    pub fn is_stack_missing(&self) -> bool {
        self.is_validation() && self.message.contains(STACK_MISSING_FRAGMENT)
    }
}

/// One page of a stack listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackSummaryPage {
    /// Stack names on this page.
    pub stack_names: Vec<String>,
    /// Continuation token, when more pages exist.
    pub next_token: Option<String>,
}

/// One page of a stack's event history, most recent first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackEventPage {
    /// Events on this page, newest first.
    pub events: Vec<StackEvent>,
    /// Continuation token, when older events exist.
    pub next_token: Option<String>,
}

/// Current state of a stack as reported by describe-stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackDescription {
    /// Stack name.
    pub name: String,
    /// Current stack status.
    pub status: StackStatus,
    /// Stack outputs.
    pub outputs: Vec<StackOutput>,
}

/// A key/value pair passed to create or update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackParameter {
    /// Parameter key.
    pub key: String,
    /// Parameter value.
    pub value: String,
}

impl StackParameter {
    /// Creates a new stack parameter.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Everything needed to submit a create or update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackRequest {
    /// Stack name.
    pub stack_name: String,
    /// Raw template body.
    pub template_body: String,
    /// Resolved parameters.
    pub parameters: Vec<StackParameter>,
    /// Acknowledged capabilities (e.g. `CAPABILITY_IAM`).
    pub capabilities: Vec<String>,
    /// Keep resources on failure instead of rolling back. Only sent on create.
    pub disable_rollback: bool,
}

/// Provider operations the engine depends on.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StackProvider: Send + Sync {
    /// Lists stack names whose status is in `status_filter`, one page at a time.
    async fn list_stacks(
        &self,
        status_filter: &[StackStatus],
        next_token: Option<String>,
    ) -> Result<StackSummaryPage, ProviderError>;

    /// Describes a single stack.
    async fn describe_stack(&self, stack_name: &str) -> Result<StackDescription, ProviderError>;

    /// Returns one page of a stack's events, newest first.
    async fn describe_stack_events(
        &self,
        stack_name: &str,
        next_token: Option<String>,
    ) -> Result<StackEventPage, ProviderError>;

    /// Submits a stack creation.
    async fn create_stack(&self, request: &StackRequest) -> Result<(), ProviderError>;

    /// Submits a stack update.
    async fn update_stack(&self, request: &StackRequest) -> Result<(), ProviderError>;

    /// Submits a stack deletion.
    async fn delete_stack(&self, stack_name: &str) -> Result<(), ProviderError>;
}
