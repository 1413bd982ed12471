//! Stack inventory.
//!
//! A snapshot of which stacks the provider knows about, taken once at the
//! start of a run. "Completed" stacks are safe to update; "active" stacks are
//! every known stack that has not been deleted. The two sets are computed
//! independently and overlap; callers check `completed` first.
//!
//! Stacks created during the run are added to `active` as
//! [`ActiveState::Pending`] and become [`ActiveState::Confirmed`] once their
//! creation succeeds.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::StackStatus;
use crate::provider::{ProviderError, StackProvider};

/// Statuses in which a stack can be updated.
pub const COMPLETED_STATUSES: [StackStatus; 4] = [
    StackStatus::CreateComplete,
    StackStatus::RollbackComplete,
    StackStatus::UpdateComplete,
    StackStatus::UpdateRollbackComplete,
];

/// Statuses of every stack that exists and has not been deleted.
pub const ACTIVE_STATUSES: [StackStatus; 15] = [
    StackStatus::CreateInProgress,
    StackStatus::CreateFailed,
    StackStatus::CreateComplete,
    StackStatus::RollbackInProgress,
    StackStatus::RollbackFailed,
    StackStatus::RollbackComplete,
    StackStatus::DeleteInProgress,
    StackStatus::DeleteFailed,
    StackStatus::UpdateInProgress,
    StackStatus::UpdateCompleteCleanupInProgress,
    StackStatus::UpdateComplete,
    StackStatus::UpdateRollbackInProgress,
    StackStatus::UpdateRollbackFailed,
    StackStatus::UpdateRollbackCompleteCleanupInProgress,
    StackStatus::UpdateRollbackComplete,
];

/// Whether an active entry was listed by the provider or added by this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActiveState {
    /// Creation was issued by this run and has not yet succeeded.
    Pending,
    /// Listed by the provider, or created successfully by this run.
    Confirmed,
}

/// Known stacks, split into completed and active.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackInventorySnapshot {
    completed: BTreeSet<String>,
    active: BTreeMap<String, ActiveState>,
}

impl StackInventorySnapshot {
    /// Builds a snapshot from listed names. Every active name is confirmed.
    #[must_use]
    pub fn new<C, A>(completed: C, active: A) -> Self
    where
        C: IntoIterator<Item = String>,
        A: IntoIterator<Item = String>,
    {
        Self {
            completed: completed.into_iter().collect(),
            active: active
                .into_iter()
                .map(|name| (name, ActiveState::Confirmed))
                .collect(),
        }
    }

    /// Queries the provider and builds a snapshot, draining every page of
    /// both listings.
    pub async fn capture(provider: &dyn StackProvider) -> Result<Self, ProviderError> {
        let completed = list_all(provider, &COMPLETED_STATUSES).await?;
        let active = list_all(provider, &ACTIVE_STATUSES).await?;

        debug!(
            completed = completed.len(),
            active = active.len(),
            "Captured stack inventory"
        );
        Ok(Self::new(completed, active))
    }

    /// Returns true if the stack is in a completed state.
    #[must_use]
    pub fn is_completed(&self, name: &str) -> bool {
        self.completed.contains(name)
    }

    /// Returns true if the stack is known in any non-deleted state.
    #[must_use]
    pub fn is_active(&self, name: &str) -> bool {
        self.active.contains_key(name)
    }

    /// Returns true if the stack is known in either set.
    #[must_use]
    pub fn is_known(&self, name: &str) -> bool {
        self.is_completed(name) || self.is_active(name)
    }

    /// Returns the active state of a stack, if it is active.
    #[must_use]
    pub fn state(&self, name: &str) -> Option<ActiveState> {
        self.active.get(name).copied()
    }

    /// Records a stack whose creation was just issued.
    pub fn mark_pending(&mut self, name: impl Into<String>) {
        self.active.insert(name.into(), ActiveState::Pending);
    }

    /// Marks a stack as confirmed after a successful operation.
    pub fn confirm(&mut self, name: impl Into<String>) {
        self.active.insert(name.into(), ActiveState::Confirmed);
    }

    /// Completed stack names.
    #[must_use]
    pub const fn completed(&self) -> &BTreeSet<String> {
        &self.completed
    }

    /// Active stack names with their state.
    #[must_use]
    pub const fn active(&self) -> &BTreeMap<String, ActiveState> {
        &self.active
    }
}

async fn list_all(
    provider: &dyn StackProvider,
    status_filter: &[StackStatus],
) -> Result<Vec<String>, ProviderError> {
    let mut names = Vec::new();
    let mut next_token = None;

    loop {
        let page = provider.list_stacks(status_filter, next_token).await?;
        names.extend(page.stack_names);
        match page.next_token {
            Some(token) => next_token = Some(token),
            None => break,
        }
    }

    Ok(names)
}
