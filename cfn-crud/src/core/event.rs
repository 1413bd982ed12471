//! Provider stack event records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::StackStatus;

/// Resource type the provider uses for a stack's own events.
pub const STACK_RESOURCE_TYPE: &str = "AWS::CloudFormation::Stack";

/// One entry from a stack's event history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackEvent {
    /// Provider event identifier.
    pub event_id: String,
    /// Name of the stack the event belongs to.
    pub stack_name: String,
    /// Logical id of the resource the event describes.
    pub logical_resource_id: String,
    /// Physical id of the resource, when assigned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub physical_resource_id: Option<String>,
    /// Resource type (e.g. `AWS::S3::Bucket`).
    pub resource_type: String,
    /// Status of the resource at this event.
    pub resource_status: StackStatus,
    /// Provider explanation for the status, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_reason: Option<String>,
    /// When the event occurred.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl StackEvent {
    /// Creates an event for the stack's own resource.
    #[must_use]
    pub fn for_stack(
        event_id: impl Into<String>,
        stack_name: impl Into<String>,
        status: StackStatus,
    ) -> Self {
        let stack_name = stack_name.into();
        Self {
            event_id: event_id.into(),
            logical_resource_id: stack_name.clone(),
            stack_name,
            physical_resource_id: None,
            resource_type: STACK_RESOURCE_TYPE.to_string(),
            resource_status: status,
            status_reason: None,
            timestamp: None,
        }
    }

    /// Creates an event for a resource inside the stack.
    #[must_use]
    pub fn for_resource(
        event_id: impl Into<String>,
        stack_name: impl Into<String>,
        logical_resource_id: impl Into<String>,
        resource_type: impl Into<String>,
        status: StackStatus,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            stack_name: stack_name.into(),
            logical_resource_id: logical_resource_id.into(),
            physical_resource_id: None,
            resource_type: resource_type.into(),
            resource_status: status,
            status_reason: None,
            timestamp: None,
        }
    }

    /// Sets the status reason.
    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.status_reason = Some(reason.into());
        self
    }

    /// Sets the timestamp.
    #[must_use]
    pub const fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Returns true if this event describes the named stack itself rather than
    /// one of its resources or a nested stack.
    #[must_use]
    pub fn is_own_stack_event(&self, stack_name: &str) -> bool {
        self.resource_type == STACK_RESOURCE_TYPE && self.logical_resource_id == stack_name
    }
}
