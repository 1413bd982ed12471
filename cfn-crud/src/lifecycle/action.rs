//! Create-or-update selection.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::{Operation, StackNotModifiableError};
use crate::inventory::StackInventorySnapshot;

/// The action taken for a declared stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StackAction {
    /// The stack does not exist yet.
    Create,
    /// The stack exists in a completed state.
    Update,
}

impl From<StackAction> for Operation {
    fn from(action: StackAction) -> Self {
        match action {
            StackAction::Create => Self::Create,
            StackAction::Update => Self::Update,
        }
    }
}

impl fmt::Display for StackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
        }
    }
}

/// Chooses between create and update.
///
/// Completed stacks are updated, unknown stacks are created, and a stack
/// that is known but not completed cannot be touched.
pub fn select_action(
    stack_name: &str,
    inventory: &StackInventorySnapshot,
) -> Result<StackAction, StackNotModifiableError> {
    if inventory.is_completed(stack_name) {
        Ok(StackAction::Update)
    } else if inventory.is_active(stack_name) {
        Err(StackNotModifiableError::new(stack_name))
    } else {
        Ok(StackAction::Create)
    }
}
