//! Scripted provider and sleeper for tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::time::Duration;

use crate::core::{StackEvent, StackOutput, StackStatus};
use crate::errors::Operation;
use crate::lifecycle::Sleeper;
use crate::provider::{
    ProviderError, StackDescription, StackEventPage, StackProvider, StackRequest,
    StackSummaryPage,
};

/// A call received by [`ScriptedStackProvider`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCall {
    /// `list_stacks` with the filter size and continuation token.
    ListStacks {
        /// Number of statuses in the filter.
        filter_len: usize,
        /// Continuation token passed in.
        next_token: Option<String>,
    },
    /// `describe_stack`.
    DescribeStack(String),
    /// `describe_stack_events`.
    DescribeStackEvents(String),
    /// `create_stack`.
    CreateStack(StackRequest),
    /// `update_stack`.
    UpdateStack(StackRequest),
    /// `delete_stack`.
    DeleteStack(String),
}

impl ProviderCall {
    /// Returns true for create, update and delete requests.
    #[must_use]
    pub const fn is_mutation(&self) -> bool {
        matches!(
            self,
            Self::CreateStack(_) | Self::UpdateStack(_) | Self::DeleteStack(_)
        )
    }

    /// The stack the call targets, if any.
    #[must_use]
    pub fn stack_name(&self) -> Option<&str> {
        match self {
            Self::ListStacks { .. } => None,
            Self::DescribeStack(name) | Self::DescribeStackEvents(name) | Self::DeleteStack(name) => {
                Some(name)
            }
            Self::CreateStack(request) | Self::UpdateStack(request) => Some(&request.stack_name),
        }
    }
}

#[derive(Debug)]
struct ScriptedStack {
    status: StackStatus,
    outputs: Vec<StackOutput>,
}

#[derive(Debug, Default)]
struct ScriptState {
    stacks: BTreeMap<String, ScriptedStack>,
    history: HashMap<String, Vec<StackEvent>>,
    released: HashMap<String, VecDeque<StackEvent>>,
    on_operation: HashMap<String, VecDeque<StackEvent>>,
    outputs_after_operation: HashMap<String, Vec<StackOutput>>,
    rejections: HashMap<(String, Operation), ProviderError>,
    describe_errors: HashMap<String, ProviderError>,
    page_size: Option<usize>,
    calls: Vec<ProviderCall>,
    next_event: u64,
}

impl ScriptState {
    fn event_id(&mut self, stack_name: &str) -> String {
        self.next_event += 1;
        format!("{stack_name}-{:04}", self.next_event)
    }

    fn own_event(&mut self, stack_name: &str, status: StackStatus) -> StackEvent {
        let id = self.event_id(stack_name);
        StackEvent::for_stack(id, stack_name, status)
    }

    fn arm(&mut self, stack_name: &str, operation: Operation) {
        let events = match self.on_operation.remove(stack_name) {
            Some(events) => events,
            None => {
                let (running, done) = match operation {
                    Operation::Create => (StackStatus::CreateInProgress, StackStatus::CreateComplete),
                    Operation::Update => (StackStatus::UpdateInProgress, StackStatus::UpdateComplete),
                    Operation::Delete => (StackStatus::DeleteInProgress, StackStatus::DeleteComplete),
                };
                let first = self.own_event(stack_name, running);
                let second = self.own_event(stack_name, done);
                VecDeque::from(vec![first, second])
            }
        };
        self.released.entry(stack_name.to_string()).or_default().extend(events);
    }

    fn release_next(&mut self, stack_name: &str) {
        let Some(event) = self
            .released
            .get_mut(stack_name)
            .and_then(VecDeque::pop_front)
        else {
            return;
        };

        if event.is_own_stack_event(stack_name) {
            if let Some(stack) = self.stacks.get_mut(stack_name) {
                stack.status = event.resource_status.clone();
            }
        }
        self.history
            .entry(stack_name.to_string())
            .or_default()
            .insert(0, event);
    }

    fn rejection(&self, stack_name: &str, operation: Operation) -> Option<ProviderError> {
        self.rejections
            .get(&(stack_name.to_string(), operation))
            .cloned()
    }
}

/// An in-memory [`StackProvider`] driven by a script.
///
/// Stacks registered with [`with_existing_stack`](Self::with_existing_stack)
/// are listed and described like real ones. Each create, update or delete
/// arms a sequence of stack events (by default `*_IN_PROGRESS` then
/// `*_COMPLETE`), and every `describe_stack_events` call releases the next
/// armed event into the stack's history. Every call is recorded.
#[derive(Debug, Default)]
pub struct ScriptedStackProvider {
    state: Mutex<ScriptState>,
}

impl ScriptedStackProvider {
    /// Creates an empty provider: no stacks, no scripts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a stack that already exists, with one own event carrying its
    /// current status.
    #[must_use]
    pub fn with_existing_stack(
        self,
        name: &str,
        status: StackStatus,
        outputs: Vec<StackOutput>,
    ) -> Self {
        {
            let mut state = self.state.lock();
            let event = state.own_event(name, status.clone());
            state.history.insert(name.to_string(), vec![event]);
            state
                .stacks
                .insert(name.to_string(), ScriptedStack { status, outputs });
        }
        self
    }

    /// Queues own-stack events with these statuses, released one per event
    /// query starting with the next one.
    #[must_use]
    pub fn with_event_sequence(self, name: &str, statuses: Vec<StackStatus>) -> Self {
        {
            let mut state = self.state.lock();
            for status in statuses {
                let event = state.own_event(name, status);
                state.released.entry(name.to_string()).or_default().push_back(event);
            }
        }
        self
    }

    /// Queues an arbitrary event, released after anything already queued.
    #[must_use]
    pub fn with_scripted_event(self, name: &str, event: StackEvent) -> Self {
        self.state
            .lock()
            .released
            .entry(name.to_string())
            .or_default()
            .push_back(event);
        self
    }

    /// Replaces the default event sequence armed by the next operation on
    /// `name`.
    #[must_use]
    pub fn with_operation_statuses(self, name: &str, statuses: Vec<StackStatus>) -> Self {
        {
            let mut state = self.state.lock();
            let events: VecDeque<_> = statuses
                .into_iter()
                .map(|status| state.own_event(name, status))
                .collect();
            state.on_operation.insert(name.to_string(), events);
        }
        self
    }

    /// Replaces the default event sequence armed by the next operation on
    /// `name` with explicit events.
    #[must_use]
    pub fn with_operation_events(self, name: &str, events: Vec<StackEvent>) -> Self {
        self.state
            .lock()
            .on_operation
            .insert(name.to_string(), events.into());
        self
    }

    /// Outputs the stack reports once a create or update on it is issued.
    #[must_use]
    pub fn with_outputs(self, name: &str, outputs: Vec<StackOutput>) -> Self {
        self.state
            .lock()
            .outputs_after_operation
            .insert(name.to_string(), outputs);
        self
    }

    /// Makes the provider refuse an operation on a stack.
    #[must_use]
    pub fn with_rejection(self, name: &str, operation: Operation, error: ProviderError) -> Self {
        self.state
            .lock()
            .rejections
            .insert((name.to_string(), operation), error);
        self
    }

    /// Makes `describe_stack` on `name` fail with `error`.
    #[must_use]
    pub fn with_describe_error(self, name: &str, error: ProviderError) -> Self {
        self.state
            .lock()
            .describe_errors
            .insert(name.to_string(), error);
        self
    }

    /// Makes updates of `name` report that there is nothing to change.
    #[must_use]
    pub fn with_no_updates(self, name: &str) -> Self {
        self.with_rejection(name, Operation::Update, ProviderError::no_updates())
    }

    /// Limits stack listings to `page_size` names per page.
    #[must_use]
    pub fn with_page_size(self, page_size: usize) -> Self {
        self.state.lock().page_size = Some(page_size.max(1));
        self
    }

    /// Every call received, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<ProviderCall> {
        self.state.lock().calls.clone()
    }

    /// Create, update and delete requests received, in order.
    #[must_use]
    pub fn mutations(&self) -> Vec<ProviderCall> {
        self.calls()
            .into_iter()
            .filter(ProviderCall::is_mutation)
            .collect()
    }

    /// Calls that targeted `name`.
    #[must_use]
    pub fn calls_for(&self, name: &str) -> Vec<ProviderCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.stack_name() == Some(name))
            .collect()
    }

    /// Current status of a stack, if it exists.
    #[must_use]
    pub fn status_of(&self, name: &str) -> Option<StackStatus> {
        self.state.lock().stacks.get(name).map(|s| s.status.clone())
    }

    fn record(&self, call: ProviderCall) {
        self.state.lock().calls.push(call);
    }
}

#[async_trait]
impl StackProvider for ScriptedStackProvider {
    async fn list_stacks(
        &self,
        status_filter: &[StackStatus],
        next_token: Option<String>,
    ) -> Result<StackSummaryPage, ProviderError> {
        self.record(ProviderCall::ListStacks {
            filter_len: status_filter.len(),
            next_token: next_token.clone(),
        });

        let state = self.state.lock();
        let matching: Vec<String> = state
            .stacks
            .iter()
            .filter(|(_, stack)| status_filter.contains(&stack.status))
            .map(|(name, _)| name.clone())
            .collect();

        let offset = match next_token {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| ProviderError::validation(format!("Invalid NextToken {token}")))?,
            None => 0,
        };
        let page_size = state.page_size.unwrap_or(usize::MAX);
        let end = offset.saturating_add(page_size).min(matching.len());

        Ok(StackSummaryPage {
            stack_names: matching.get(offset..end).unwrap_or_default().to_vec(),
            next_token: (end < matching.len()).then(|| end.to_string()),
        })
    }

    async fn describe_stack(&self, stack_name: &str) -> Result<StackDescription, ProviderError> {
        self.record(ProviderCall::DescribeStack(stack_name.to_string()));

        let state = self.state.lock();
        if let Some(err) = state.describe_errors.get(stack_name) {
            return Err(err.clone());
        }
        let stack = state
            .stacks
            .get(stack_name)
            .filter(|stack| stack.status != StackStatus::DeleteComplete)
            .ok_or_else(|| ProviderError::stack_missing(stack_name))?;

        Ok(StackDescription {
            name: stack_name.to_string(),
            status: stack.status.clone(),
            outputs: stack.outputs.clone(),
        })
    }

    async fn describe_stack_events(
        &self,
        stack_name: &str,
        _next_token: Option<String>,
    ) -> Result<StackEventPage, ProviderError> {
        self.record(ProviderCall::DescribeStackEvents(stack_name.to_string()));

        let mut state = self.state.lock();
        let deleted = state
            .stacks
            .get(stack_name)
            .is_some_and(|stack| stack.status == StackStatus::DeleteComplete);
        if deleted {
            state.stacks.remove(stack_name);
            state.history.remove(stack_name);
        }

        state.release_next(stack_name);

        match state.history.get(stack_name) {
            Some(events) => Ok(StackEventPage {
                events: events.clone(),
                next_token: None,
            }),
            None => Err(ProviderError::stack_missing(stack_name)),
        }
    }

    async fn create_stack(&self, request: &StackRequest) -> Result<(), ProviderError> {
        self.record(ProviderCall::CreateStack(request.clone()));

        let mut state = self.state.lock();
        if let Some(err) = state.rejection(&request.stack_name, Operation::Create) {
            return Err(err);
        }
        if state.stacks.contains_key(&request.stack_name) {
            return Err(ProviderError::new(
                "AlreadyExistsException",
                format!("Stack [{}] already exists", request.stack_name),
            ));
        }

        let outputs = state
            .outputs_after_operation
            .remove(&request.stack_name)
            .unwrap_or_default();
        state.stacks.insert(
            request.stack_name.clone(),
            ScriptedStack {
                status: StackStatus::CreateInProgress,
                outputs,
            },
        );
        state.history.entry(request.stack_name.clone()).or_default();
        state.arm(&request.stack_name, Operation::Create);
        Ok(())
    }

    async fn update_stack(&self, request: &StackRequest) -> Result<(), ProviderError> {
        self.record(ProviderCall::UpdateStack(request.clone()));

        let mut state = self.state.lock();
        if let Some(err) = state.rejection(&request.stack_name, Operation::Update) {
            return Err(err);
        }
        if !state.stacks.contains_key(&request.stack_name) {
            return Err(ProviderError::stack_missing(&request.stack_name));
        }

        if let Some(outputs) = state.outputs_after_operation.remove(&request.stack_name) {
            if let Some(stack) = state.stacks.get_mut(&request.stack_name) {
                stack.outputs = outputs;
            }
        }
        state.arm(&request.stack_name, Operation::Update);
        Ok(())
    }

    async fn delete_stack(&self, stack_name: &str) -> Result<(), ProviderError> {
        self.record(ProviderCall::DeleteStack(stack_name.to_string()));

        let mut state = self.state.lock();
        if let Some(err) = state.rejection(stack_name, Operation::Delete) {
            return Err(err);
        }
        if state.stacks.contains_key(stack_name) {
            state.arm(stack_name, Operation::Delete);
        }
        Ok(())
    }
}

/// A [`Sleeper`] that returns immediately and records every requested delay.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    /// Creates a new recording sleeper.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every requested delay, in order.
    #[must_use]
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().clone()
    }

    /// Number of sleeps requested.
    #[must_use]
    pub fn count(&self) -> usize {
        self.sleeps.lock().len()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().push(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::COMPLETED_STATUSES;

    #[tokio::test]
    async fn test_listing_paginates() {
        let provider = ScriptedStackProvider::new()
            .with_existing_stack("a", StackStatus::CreateComplete, Vec::new())
            .with_existing_stack("b", StackStatus::UpdateComplete, Vec::new())
            .with_existing_stack("c", StackStatus::CreateFailed, Vec::new())
            .with_page_size(1);

        let first = provider.list_stacks(&COMPLETED_STATUSES, None).await.unwrap();
        assert_eq!(first.stack_names, vec!["a".to_string()]);
        let second = provider
            .list_stacks(&COMPLETED_STATUSES, first.next_token)
            .await
            .unwrap();
        assert_eq!(second.stack_names, vec!["b".to_string()]);
        assert_eq!(second.next_token, None);
    }

    #[tokio::test]
    async fn test_create_arms_default_sequence() {
        let provider = ScriptedStackProvider::new();
        let request = StackRequest {
            stack_name: "app".into(),
            template_body: "{}".into(),
            parameters: Vec::new(),
            capabilities: Vec::new(),
            disable_rollback: false,
        };
        provider.create_stack(&request).await.unwrap();

        let first = provider.describe_stack_events("app", None).await.unwrap();
        assert_eq!(first.events[0].resource_status, StackStatus::CreateInProgress);
        let second = provider.describe_stack_events("app", None).await.unwrap();
        assert_eq!(second.events[0].resource_status, StackStatus::CreateComplete);
        assert_eq!(second.events.len(), 2);
        assert_eq!(provider.status_of("app"), Some(StackStatus::CreateComplete));
        assert_eq!(provider.mutations().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_stack_events_are_missing() {
        let provider = ScriptedStackProvider::new();
        let err = provider.describe_stack_events("nope", None).await.unwrap_err();
        assert!(err.is_stack_missing());
    }

    #[tokio::test]
    async fn test_recording_sleeper() {
        let sleeper = RecordingSleeper::new();
        sleeper.sleep(Duration::from_secs(5)).await;
        assert_eq!(sleeper.sleeps(), vec![Duration::from_secs(5)]);
        assert_eq!(sleeper.count(), 1);
    }
}
