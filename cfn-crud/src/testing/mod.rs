//! Test doubles and fixtures.
//!
//! - [`ScriptedStackProvider`]: an in-memory provider driven by a script
//! - [`RecordingSleeper`]: a sleeper that never sleeps
//! - [`DefinitionFixture`] and [`TemplateFixture`]: documents in their
//!   on-disk shape

mod fixtures;
mod mocks;

pub use fixtures::{DefinitionFixture, TemplateFixture};
pub use mocks::{ProviderCall, RecordingSleeper, ScriptedStackProvider};
