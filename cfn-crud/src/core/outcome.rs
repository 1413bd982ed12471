//! Stack operation outcomes.

use serde::{Deserialize, Serialize};

use super::ParameterRecord;

/// The result of driving one stack operation to completion.
///
/// There is no failure variant: a failure-terminal status becomes a fatal
/// [`crate::errors::CrudError`] and is reported through run events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StackOperationOutcome {
    /// The operation completed; carries the stack outputs that were read back
    /// (empty when output propagation is disabled).
    Succeeded {
        /// Stack outputs as parameter records.
        outputs: Vec<ParameterRecord>,
    },
    /// The provider reported nothing to change.
    NoOpSucceeded,
    /// The stack was absent, so no request was issued.
    Skipped,
}

impl StackOperationOutcome {
    /// Creates a success outcome.
    #[must_use]
    pub const fn succeeded(outputs: Vec<ParameterRecord>) -> Self {
        Self::Succeeded { outputs }
    }

    /// Returns the outputs carried by a success outcome.
    #[must_use]
    pub fn outputs(&self) -> &[ParameterRecord] {
        match self {
            Self::Succeeded { outputs } => outputs,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_without_outputs() {
        assert!(StackOperationOutcome::NoOpSucceeded.outputs().is_empty());
        assert!(StackOperationOutcome::Skipped.outputs().is_empty());
    }

    #[test]
    fn test_outcome_serialize() {
        let outcome = StackOperationOutcome::succeeded(vec![ParameterRecord::new("K", "V")]);
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"outcome": "succeeded", "outputs": [{"key": "K", "value": "V"}]})
        );
        assert_eq!(outcome.outputs().len(), 1);
    }
}
