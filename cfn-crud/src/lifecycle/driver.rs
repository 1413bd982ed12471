//! The create/update lifecycle of a single stack.

use std::sync::Arc;

use serde_json::json;
use tracing::{info, warn};

use super::action::{select_action, StackAction};
use super::poll::{CreateUpdateClassifier, PollOutcome, Poller};
use crate::core::{ParameterRecord, StackOperationOutcome};
use crate::definition::StackDefinition;
use crate::errors::{CrudError, OperationRejectedError, StackOperationFailedError};
use crate::events::{self, EventSink, NoOpEventSink};
use crate::inventory::StackInventorySnapshot;
use crate::parameters::{ingest_record, resolve_parameters, ParameterContext};
use crate::provider::{StackProvider, StackRequest};
use crate::template::TemplateDocument;

/// Creates or updates declared stacks and polls them to completion.
pub struct StackLifecycleDriver {
    provider: Arc<dyn StackProvider>,
    poller: Poller,
    sink: Arc<dyn EventSink>,
}

impl std::fmt::Debug for StackLifecycleDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StackLifecycleDriver")
            .field("poller", &self.poller)
            .finish_non_exhaustive()
    }
}

impl StackLifecycleDriver {
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

    /// Drives one declared stack to a terminal outcome.
    ///
    /// Resolves the template's parameters, picks create or update, issues the
    /// request and polls until the stack settles. On success the stack is
    /// confirmed in `inventory` and, when the definition asks for it, its
    /// outputs are merged into `ctx`. Every failure is fatal.
    pub async fn create_or_update(
        &self,
        definition: &StackDefinition,
        template: &TemplateDocument,
        ctx: &mut ParameterContext,
        inventory: &mut StackInventorySnapshot,
    ) -> Result<(StackAction, StackOperationOutcome), CrudError> {
        let name = definition.name.as_str();

        let parameters = resolve_parameters(name, template, ctx)?;
        let action = select_action(name, inventory)?;

        info!(stack = %name, action = %action, "Selected stack action");
        self.sink
            .emit(
                events::STACK_ACTION_SELECTED,
                Some(json!({"stack": name, "action": action})),
            )
            .await;

        let request = StackRequest {
            stack_name: name.to_string(),
            template_body: template.body().to_string(),
            parameters: parameters.into_iter().map(Into::into).collect(),
            capabilities: definition.capabilities.iter().cloned().collect(),
            disable_rollback: definition.disable_rollback,
        };

        let baseline = match action {
            StackAction::Create => {
                self.provider.create_stack(&request).await.map_err(|source| {
                    OperationRejectedError::new(name, action.into(), source)
                })?;
                inventory.mark_pending(name);
                None
            }
            StackAction::Update => {
                let baseline = self.poller.baseline(self.provider.as_ref(), name).await?;
                match self.provider.update_stack(&request).await {
                    Ok(()) => {}
                    Err(err) if err.is_no_updates() => {
                        info!(stack = %name, "No updates are to be performed");
                        self.sink
                            .emit(events::STACK_NOOP, Some(json!({"stack": name})))
                            .await;
                        return Ok((action, StackOperationOutcome::NoOpSucceeded));
                    }
                    Err(source) => {
                        return Err(
                            OperationRejectedError::new(name, action.into(), source).into()
                        )
                    }
                }
                baseline
            }
        };

        let outcome = self
            .poller
            .poll_until_terminal(
                self.provider.as_ref(),
                name,
                baseline.as_deref(),
                &CreateUpdateClassifier,
                self.sink.as_ref(),
            )
            .await?;

        match outcome {
            PollOutcome::Succeeded { status, polls } => {
                inventory.confirm(name);
                let outputs = if definition.propagate_outputs {
                    self.propagate_outputs(name, ctx).await?
                } else {
                    Vec::new()
                };

                info!(stack = %name, status = %status, polls, "Stack operation succeeded");
                self.sink
                    .emit(
                        events::STACK_SUCCEEDED,
                        Some(json!({
                            "stack": name,
                            "action": action,
                            "status": status.as_str(),
                            "outputs": outputs.len(),
                        })),
                    )
                    .await;
                Ok((action, StackOperationOutcome::succeeded(outputs)))
            }
            PollOutcome::Failed { status, reason, .. } => {
                let err = StackOperationFailedError::new(name, action.into(), status, reason);
                self.report_failure(name, action, &err.to_string()).await;
                Err(err.into())
            }
        }
    }

    async fn propagate_outputs(
        &self,
        name: &str,
        ctx: &mut ParameterContext,
    ) -> Result<Vec<ParameterRecord>, CrudError> {
        let description = self.provider.describe_stack(name).await?;
        let source = format!("outputs:{name}");
        let mut records = Vec::with_capacity(description.outputs.len());

        for output in description.outputs {
            let record = ParameterRecord::from(output);
            info!(stack = %name, parameter = %record, "Adding stack output to parameters");
            ingest_record(ctx, record.clone(), &source, self.sink.as_ref()).await;
            records.push(record);
        }

        Ok(records)
    }

    async fn report_failure(&self, name: &str, action: StackAction, reason: &str) {
        warn!(stack = %name, action = %action, reason = %reason, "Stack operation failed");
        self.sink
            .emit(
                events::STACK_FAILED,
                Some(json!({"stack": name, "action": action, "reason": reason})),
            )
            .await;
    }
}
