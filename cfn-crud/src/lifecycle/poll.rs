//! Status polling.
//!
//! After an operation is issued, the stack's event history is polled at a
//! fixed interval. Each poll looks at the newest event emitted by the stack
//! itself (resource type `AWS::CloudFormation::Stack`, logical id equal to
//! the stack name) and classifies its status. Events of nested stacks and
//! other resources are ignored. Polling has no upper bound.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, info};

use crate::core::{StackEvent, StackStatus, StatusClass};
use crate::errors::CrudError;
use crate::events::{self, EventSink};
use crate::provider::{ProviderError, StackProvider};

/// Default delay between polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Suspends the polling loop between queries.
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Sleeps for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Maps a polled status to a [`StatusClass`] for one kind of operation.
pub trait StatusClassifier: Send + Sync {
    /// Classifies a status.
    fn classify(&self, status: &StackStatus) -> StatusClass;

    /// Success status implied when the provider says the stack no longer
    /// exists. `None` means the error is returned to the caller.
    fn on_missing_stack(&self) -> Option<StackStatus> {
        None
    }
}

/// Classifier for create and update operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct CreateUpdateClassifier;

impl StatusClassifier for CreateUpdateClassifier {
    fn classify(&self, status: &StackStatus) -> StatusClass {
        match status {
            StackStatus::CreateComplete | StackStatus::UpdateComplete => StatusClass::Success,
            StackStatus::CreateFailed
            | StackStatus::RollbackFailed
            | StackStatus::RollbackComplete
            | StackStatus::UpdateRollbackFailed
            | StackStatus::UpdateRollbackComplete
            | StackStatus::DeleteFailed
            | StackStatus::DeleteComplete
            | StackStatus::ImportComplete
            | StackStatus::ImportRollbackFailed
            | StackStatus::ImportRollbackComplete => StatusClass::Failure,
            StackStatus::Unknown(_) => StatusClass::Unrecognized,
            _ => StatusClass::InProgress,
        }
    }
}

/// Classifier for delete operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeleteClassifier;

impl StatusClassifier for DeleteClassifier {
    fn classify(&self, status: &StackStatus) -> StatusClass {
        match status {
            StackStatus::DeleteComplete => StatusClass::Success,
            StackStatus::DeleteFailed => StatusClass::Failure,
            StackStatus::Unknown(_) => StatusClass::Unrecognized,
            _ => StatusClass::InProgress,
        }
    }

    fn on_missing_stack(&self) -> Option<StackStatus> {
        Some(StackStatus::DeleteComplete)
    }
}

/// How a polling loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// A success-terminal status was observed, or implied by the stack
    /// disappearing.
    Succeeded {
        /// The terminal status.
        status: StackStatus,
        /// Number of event queries made.
        polls: u32,
    },
    /// A failure-terminal status was observed.
    Failed {
        /// The terminal status.
        status: StackStatus,
        /// The provider's status reason.
        reason: Option<String>,
        /// Number of event queries made.
        polls: u32,
    },
}

impl PollOutcome {
    /// Number of event queries made.
    #[must_use]
    pub const fn polls(&self) -> u32 {
        match self {
            Self::Succeeded { polls, .. } | Self::Failed { polls, .. } => *polls,
        }
    }
}

/// Drives the polling loop.
#[derive(Clone)]
pub struct Poller {
    sleeper: Arc<dyn Sleeper>,
    interval: Duration,
}

impl std::fmt::Debug for Poller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Poller")
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

impl Default for Poller {
    fn default() -> Self {
        Self::new(Arc::new(TokioSleeper), DEFAULT_POLL_INTERVAL)
    }
}

impl Poller {
    /// Creates a poller.
    #[must_use]
    pub fn new(sleeper: Arc<dyn Sleeper>, interval: Duration) -> Self {
        Self { sleeper, interval }
    }

    /// Sets the interval.
    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// The delay between polls.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns the id of the newest event the stack itself emitted, or
    /// `None` if there is none or the stack does not exist.
    ///
    /// Taken before an operation is issued so that polling ignores the
    /// terminal event of the previous operation.
    pub async fn baseline(
        &self,
        provider: &dyn StackProvider,
        stack_name: &str,
    ) -> Result<Option<String>, ProviderError> {
        match provider.describe_stack_events(stack_name, None).await {
            Ok(page) => Ok(page
                .events
                .into_iter()
                .find(|event| event.is_own_stack_event(stack_name))
                .map(|event| event.event_id)),
            Err(err) if err.is_stack_missing() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Polls until the stack reaches a terminal status.
    ///
    /// Events at or older than `baseline` are ignored. An unrecognized
    /// status or an unexpected provider error is returned as an error.
    pub async fn poll_until_terminal(
        &self,
        provider: &dyn StackProvider,
        stack_name: &str,
        baseline: Option<&str>,
        classifier: &dyn StatusClassifier,
        sink: &dyn EventSink,
    ) -> Result<PollOutcome, CrudError> {
        let mut polls = 0;

        loop {
            polls += 1;

            let page = match provider.describe_stack_events(stack_name, None).await {
                Ok(page) => page,
                Err(err) if err.is_stack_missing() => match classifier.on_missing_stack() {
                    Some(status) => {
                        info!(stack = %stack_name, status = %status, "Stack no longer exists");
                        return Ok(PollOutcome::Succeeded { status, polls });
                    }
                    None => return Err(err.into()),
                },
                Err(err) => return Err(err.into()),
            };

            match newest_own_event(page.events, stack_name, baseline) {
                Some(event) => {
                    let class = classifier.classify(&event.resource_status);
                    info!(
                        stack = %stack_name,
                        status = %event.resource_status,
                        poll = polls,
                        "Stack status"
                    );
                    sink.emit(
                        events::STACK_POLL,
                        Some(json!({
                            "stack": stack_name,
                            "status": event.resource_status.as_str(),
                            "class": class,
                            "poll": polls,
                        })),
                    )
                    .await;

                    match class {
                        StatusClass::Success => {
                            return Ok(PollOutcome::Succeeded {
                                status: event.resource_status,
                                polls,
                            })
                        }
                        StatusClass::Failure => {
                            return Ok(PollOutcome::Failed {
                                status: event.resource_status,
                                reason: event.status_reason,
                                polls,
                            })
                        }
                        StatusClass::Unrecognized => {
                            return Err(CrudError::UnrecognizedStatus {
                                stack: stack_name.to_string(),
                                status: event.resource_status.to_string(),
                            })
                        }
                        StatusClass::InProgress => {}
                    }
                }
                None => debug!(stack = %stack_name, poll = polls, "No new stack event yet"),
            }

            self.sleeper.sleep(self.interval).await;
        }
    }
}

fn newest_own_event(
    events: Vec<StackEvent>,
    stack_name: &str,
    baseline: Option<&str>,
) -> Option<StackEvent> {
    events
        .into_iter()
        .take_while(|event| Some(event.event_id.as_str()) != baseline)
        .find(|event| event.is_own_stack_event(stack_name))
}
