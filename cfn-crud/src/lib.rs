//! # cfn-crud
//!
//! Parameter aggregation and stack lifecycle orchestration for
//! CloudFormation.
//!
//! A run is driven by a definition document that lists parameter sources,
//! stacks to create or update, and stacks to delete. The engine:
//!
//! - **Aggregates parameters** from files, existing stack outputs and inline
//!   pairs, quarantining keys observed with conflicting values
//! - **Snapshots the stack inventory** to decide between create and update
//! - **Drives each stack** to a terminal status by polling its own events,
//!   feeding successful stacks' outputs back into the parameter pool
//! - **Deletes stacks** that exist, skipping those that do not
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cfn_crud::prelude::*;
//!
//! let config = RunConfig::from_env()?;
//! let provider = CloudFormationProvider::from_env(config.region.clone(), config.profile.clone()).await;
//! let report = StackRun::new(Arc::new(provider))
//!     .with_config(&config)
//!     .execute_file(Path::new("deploy.json"))
//!     .await?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod core;
pub mod definition;
pub mod errors;
pub mod events;
pub mod inventory;
pub mod lifecycle;
pub mod observability;
pub mod parameters;
pub mod provider;
pub mod run;
pub mod template;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::RunConfig;
    pub use crate::core::{
        ParameterRecord, StackEvent, StackOperationOutcome, StackOutput, StackStatus,
    };
    pub use crate::definition::{DefinitionDocument, StackDefinition};
    pub use crate::errors::{CrudError, Operation};
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::inventory::StackInventorySnapshot;
    pub use crate::lifecycle::{DeletionDriver, Poller, StackAction, StackLifecycleDriver};
    pub use crate::observability::{init_logging, LogLevel};
    pub use crate::parameters::ParameterContext;
    #[cfg(feature = "aws")]
    pub use crate::provider::CloudFormationProvider;
    pub use crate::provider::{ProviderError, StackProvider};
    pub use crate::run::{RunReport, StackRun};
    pub use crate::template::TemplateDocument;
}
