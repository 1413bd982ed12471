//! Stack teardown.

use std::sync::Arc;

use serde_json::json;
use tracing::{info, warn};

use super::poll::{DeleteClassifier, PollOutcome, Poller};
use crate::core::StackOperationOutcome;
use crate::errors::{CrudError, Operation, OperationRejectedError, StackOperationFailedError};
use crate::events::{self, EventSink, NoOpEventSink};
use crate::inventory::StackInventorySnapshot;
use crate::provider::StackProvider;

/// Deletes stacks and polls them until they are gone.
pub struct DeletionDriver {
    provider: Arc<dyn StackProvider>,
    poller: Poller,
    sink: Arc<dyn EventSink>,
}

impl std::fmt::Debug for DeletionDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeletionDriver")
            .field("poller", &self.poller)
            .finish_non_exhaustive()
    }
}

impl DeletionDriver {
    /// Creates a driver with the default poller and no event sink.
    #[must_use]
    pub fn new(provider: Arc<dyn StackProvider>) -> Self {
        Self {
            provider,
            poller: Poller::default(),
            sink: Arc::new(NoOpEventSink),
        }
    }

    /// Sets the poller.
    #[must_use]
    pub fn with_poller(mut self, poller: Poller) -> Self {
        self.poller = poller;
        self
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Deletes one stack.
    ///
    /// A stack the inventory does not know is skipped without a provider
    /// call. Otherwise the deletion is issued and polled: `DELETE_COMPLETE`
    /// or the stack disappearing is success, `DELETE_FAILED` is fatal.
    pub async fn delete(
        &self,
        name: &str,
        inventory: &StackInventorySnapshot,
    ) -> Result<StackOperationOutcome, CrudError> {
        if !inventory.is_known(name) {
            info!(stack = %name, "Stack does not exist, nothing to delete");
            self.sink
                .emit(events::STACK_DELETE_SKIPPED, Some(json!({"stack": name})))
                .await;
            return Ok(StackOperationOutcome::Skipped);
        }

        let baseline = self.poller.baseline(self.provider.as_ref(), name).await?;

        info!(stack = %name, "Deleting stack");
        self.provider
            .delete_stack(name)
            .await
            .map_err(|source| OperationRejectedError::new(name, Operation::Delete, source))?;

        let outcome = self
            .poller
            .poll_until_terminal(
                self.provider.as_ref(),
                name,
                baseline.as_deref(),
                &DeleteClassifier,
                self.sink.as_ref(),
            )
            .await?;

        match outcome {
            PollOutcome::Succeeded { .. } => {
                info!(stack = %name, polls = outcome.polls(), "Stack deleted");
                self.sink
                    .emit(events::STACK_DELETED, Some(json!({"stack": name})))
                    .await;
                Ok(StackOperationOutcome::succeeded(Vec::new()))
            }
            PollOutcome::Failed { status, reason, .. } => {
                let err = StackOperationFailedError::new(name, Operation::Delete, status, reason);
                warn!(stack = %name, reason = %err, "Stack deletion failed");
                self.sink
                    .emit(
                        events::STACK_FAILED,
                        Some(json!({
                            "stack": name,
                            "action": Operation::Delete,
                            "reason": err.to_string(),
                        })),
                    )
                    .await;
                Err(err.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{StackEvent, StackStatus};
    use crate::events::CollectingEventSink;
    use crate::provider::{MockStackProvider, ProviderError};
    use crate::testing::{ProviderCall, RecordingSleeper, ScriptedStackProvider};
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn driver(
        provider: Arc<dyn StackProvider>,
        sleeper: &Arc<RecordingSleeper>,
        sink: &Arc<CollectingEventSink>,
    ) -> DeletionDriver {
        DeletionDriver::new(provider)
            .with_poller(Poller::new(sleeper.clone(), Duration::from_secs(5)))
            .with_event_sink(sink.clone())
    }

    #[tokio::test]
    async fn test_absent_stack_makes_no_provider_call() {
        // No expectations: any call panics.
        let provider = Arc::new(MockStackProvider::new());
        let sleeper = Arc::new(RecordingSleeper::new());
        let sink = Arc::new(CollectingEventSink::new());

        let outcome = driver(provider, &sleeper, &sink)
            .delete("ghost", &StackInventorySnapshot::default())
            .await
            .unwrap();

        assert_eq!(outcome, StackOperationOutcome::Skipped);
        assert_eq!(sink.events_of_type(events::STACK_DELETE_SKIPPED).len(), 1);
    }

    #[tokio::test]
    async fn test_delete_polls_until_gone() {
        let provider = Arc::new(ScriptedStackProvider::new().with_existing_stack(
            "legacy",
            StackStatus::CreateComplete,
            Vec::new(),
        ));
        let sleeper = Arc::new(RecordingSleeper::new());
        let sink = Arc::new(CollectingEventSink::new());
        let inventory =
            StackInventorySnapshot::new(vec!["legacy".into()], vec!["legacy".into()]);

        let outcome = driver(provider.clone(), &sleeper, &sink)
            .delete("legacy", &inventory)
            .await
            .unwrap();

        assert_eq!(outcome, StackOperationOutcome::succeeded(Vec::new()));
        assert_eq!(sleeper.count(), 1);
        assert!(provider
            .mutations()
            .contains(&ProviderCall::DeleteStack("legacy".into())));
        assert_eq!(sink.events_of_type(events::STACK_DELETED).len(), 1);
    }

    #[tokio::test]
    async fn test_delete_failed_is_fatal() {
        let provider = Arc::new(
            ScriptedStackProvider::new()
                .with_existing_stack("pinned", StackStatus::UpdateComplete, Vec::new())
                .with_operation_events(
                    "pinned",
                    vec![
                        StackEvent::for_stack("p-1", "pinned", StackStatus::DeleteInProgress),
                        StackEvent::for_stack("p-2", "pinned", StackStatus::DeleteFailed)
                            .with_reason("Bucket is not empty"),
                    ],
                ),
        );
        let sleeper = Arc::new(RecordingSleeper::new());
        let sink = Arc::new(CollectingEventSink::new());
        let inventory = StackInventorySnapshot::new(Vec::new(), vec!["pinned".into()]);

        let err = driver(provider, &sleeper, &sink)
            .delete("pinned", &inventory)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CrudError::OperationFailed(ref e) if e.status == StackStatus::DeleteFailed
        ));
    }

    #[tokio::test]
    async fn test_stack_vanishing_counts_as_deleted() {
        let mut provider = MockStackProvider::new();
        provider
            .expect_describe_stack_events()
            .times(2)
            .returning(|name, _| Err(ProviderError::stack_missing(name)));
        provider.expect_delete_stack().times(1).returning(|_| Ok(()));

        let sleeper = Arc::new(RecordingSleeper::new());
        let sink = Arc::new(CollectingEventSink::new());
        let inventory = StackInventorySnapshot::new(vec!["old".into()], Vec::new());

        let outcome = driver(Arc::new(provider), &sleeper, &sink)
            .delete("old", &inventory)
            .await
            .unwrap();
        assert_eq!(outcome, StackOperationOutcome::succeeded(Vec::new()));
    }

    #[tokio::test]
    async fn test_rejected_delete_is_fatal() {
        let mut provider = MockStackProvider::new();
        provider
            .expect_describe_stack_events()
            .returning(|_, _| Ok(crate::provider::StackEventPage::default()));
        provider
            .expect_delete_stack()
            .returning(|_| Err(ProviderError::new("AccessDenied", "not authorized")));

        let sleeper = Arc::new(RecordingSleeper::new());
        let sink = Arc::new(CollectingEventSink::new());
        let inventory = StackInventorySnapshot::new(vec!["db".into()], vec!["db".into()]);

        let err = driver(Arc::new(provider), &sleeper, &sink)
            .delete("db", &inventory)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CrudError::OperationRejected(ref e) if e.operation == Operation::Delete
        ));
    }
}
