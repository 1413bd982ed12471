//! Core domain model types for cfn-crud.
//!
//! This module contains the fundamental types used throughout the engine:
//! - Stack status enumeration and its classification
//! - Source-agnostic parameter records and stack outputs
//! - Stack events and operation outcomes

mod event;
mod outcome;
mod parameter;
mod status;

pub use event::{StackEvent, STACK_RESOURCE_TYPE};
pub use outcome::StackOperationOutcome;
pub use parameter::{ParameterRecord, StackOutput};
pub use status::{StackStatus, StatusClass};
