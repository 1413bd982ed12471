//! Run events.
//!
//! Every notable step of a run is reported to an [`EventSink`] as a dotted
//! event type plus a JSON payload. Sinks observe; a run never depends on what
//! a sink does with an event.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

/// A run began.
pub const RUN_STARTED: &str = "run.started";
/// A run finished without a fatal error.
pub const RUN_COMPLETED: &str = "run.completed";
/// A key arrived with a value different from the pooled one.
pub const PARAMETER_CONFLICT: &str = "parameter.conflict";
/// A parameter source was skipped (unresolvable stack or malformed payload).
pub const PARAMETER_SOURCE_SKIPPED: &str = "parameter.source_skipped";
/// Create or update was chosen for a stack.
pub const STACK_ACTION_SELECTED: &str = "stack.action_selected";
/// A status was observed while polling.
pub const STACK_POLL: &str = "stack.poll";
/// A stack operation reached its success state.
pub const STACK_SUCCEEDED: &str = "stack.succeeded";
/// An update had nothing to change.
pub const STACK_NOOP: &str = "stack.noop";
/// A stack operation failed.
pub const STACK_FAILED: &str = "stack.failed";
/// A delete was skipped because the stack does not exist.
pub const STACK_DELETE_SKIPPED: &str = "stack.delete_skipped";
/// A stack was deleted.
pub const STACK_DELETED: &str = "stack.deleted";
