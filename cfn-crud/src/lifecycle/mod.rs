//! Stack lifecycle: action selection, polling, create/update and delete.

mod action;
pub mod deletion;
mod driver;
mod poll;

pub use action::{select_action, StackAction};
pub use deletion::DeletionDriver;
pub use driver::StackLifecycleDriver;
pub use poll::{
    CreateUpdateClassifier, DeleteClassifier, PollOutcome, Poller, Sleeper, StatusClassifier,
    TokioSleeper, DEFAULT_POLL_INTERVAL,
};
