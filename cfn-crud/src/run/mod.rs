//! End-to-end execution of a definition document.
//!
//! A run snapshots the stack inventory, ingests the parameter sources in
//! order (files, existing stacks, inline pairs), creates or updates every
//! declared stack in declaration order and finally deletes the stacks marked
//! for deletion. The first fatal error stops the run; operations already
//! issued are not rolled back.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info};
use uuid::Uuid;

use crate::config::RunConfig;
use crate::core::StackOperationOutcome;
use crate::definition::{resolve_location, DefinitionDocument};
use crate::errors::{CrudError, Operation};
use crate::events::{self, EventSink, NoOpEventSink};
use crate::inventory::StackInventorySnapshot;
use crate::lifecycle::{DeletionDriver, Poller, StackLifecycleDriver};
use crate::observability::OperationTimer;
use crate::parameters::{
    ingest_existing_stacks, ingest_key_value_pairs, ingest_parameter_files, ParameterContext,
};
use crate::provider::StackProvider;
use crate::template::TemplateDocument;

/// One processed stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReportEntry {
    /// Stack name.
    pub stack: String,
    /// The operation that was selected.
    pub operation: Operation,
    /// How it ended.
    pub outcome: StackOperationOutcome,
    /// Wall time spent on the stack.
    pub duration_ms: u64,
}

/// The result of a successful run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Unique id of the run, also carried by its events.
    pub run_id: Uuid,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// Processed stacks, in processing order.
    pub entries: Vec<RunReportEntry>,
    /// Final parameter pool and conflict set.
    pub parameters: ParameterContext,
}

impl RunReport {
    /// Looks up the entry for a stack and operation.
    #[must_use]
    pub fn entry(&self, stack: &str, operation: Operation) -> Option<&RunReportEntry> {
        self.entries
            .iter()
            .find(|e| e.stack == stack && e.operation == operation)
    }

    /// Names of the stacks processed, in order.
    #[must_use]
    pub fn stacks(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.stack.as_str()).collect()
    }
}

/// Executes definition documents against a provider.
pub struct StackRun {
    provider: Arc<dyn StackProvider>,
    poller: Poller,
    sink: Arc<dyn EventSink>,
}

impl std::fmt::Debug for StackRun {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StackRun")
            .field("poller", &self.poller)
            .finish_non_exhaustive()
    }
}

impl StackRun {
    /// Creates a run with the default poller and no event sink.
    #[must_use]
    pub fn new(provider: Arc<dyn StackProvider>) -> Self {
        Self {
            provider,
            poller: Poller::default(),
            sink: Arc::new(NoOpEventSink),
        }
    }

    /// Applies the poll interval from a configuration.
    #[must_use]
    pub fn with_config(mut self, config: &RunConfig) -> Self {
        self.poller = self.poller.with_interval(config.poll_interval());
        self
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

    /// Loads a definition file and executes it.
    pub async fn execute_file(&self, path: &Path) -> Result<RunReport, CrudError> {
        info!(path = %path.display(), "Loading definition document");
        let document = DefinitionDocument::load(path)?;
        self.execute(&document).await
    }

    /// Executes a definition document.
    pub async fn execute(&self, document: &DefinitionDocument) -> Result<RunReport, CrudError> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let timer = OperationTimer::start(format!("run:{run_id}"));

        info!(
            run_id = %run_id,
            stacks = document.stacks_to_create_or_update.len(),
            deletions = document.stacks_to_delete.len(),
            "Run started"
        );
        self.sink
            .emit(
                events::RUN_STARTED,
                Some(json!({
                    "run_id": run_id,
                    "stacks_to_create_or_update": document.stacks_to_create_or_update.len(),
                    "stacks_to_delete": document.stacks_to_delete.len(),
                })),
            )
            .await;

        let (entries, parameters) = match self.run_steps(document).await {
            Ok(done) => done,
            Err(err) => {
                error!(run_id = %run_id, code = err.code(), error = %err, "Run aborted");
                return Err(err);
            }
        };

        let duration_ms = timer.finish();
        info!(
            run_id = %run_id,
            processed = entries.len(),
            conflicts = parameters.conflicts().len(),
            duration_ms,
            "Run completed"
        );
        self.sink
            .emit(
                events::RUN_COMPLETED,
                Some(json!({
                    "run_id": run_id,
                    "processed": entries.len(),
                    "conflicts": parameters.conflicts().keys().collect::<Vec<_>>(),
                    "duration_ms": duration_ms,
                })),
            )
            .await;

        Ok(RunReport {
            run_id,
            started_at,
            entries,
            parameters,
        })
    }

    async fn run_steps(
        &self,
        document: &DefinitionDocument,
    ) -> Result<(Vec<RunReportEntry>, ParameterContext), CrudError> {
        let provider = self.provider.as_ref();
        let sink = self.sink.as_ref();

        let mut inventory = StackInventorySnapshot::capture(provider).await?;
        info!(
            completed = inventory.completed().len(),
            active = inventory.active().len(),
            "Captured stack inventory"
        );

        let mut ctx = ParameterContext::new();
        let sources = &document.parameters;
        ingest_parameter_files(&mut ctx, &sources.files, sink).await?;
        ingest_existing_stacks(&mut ctx, &sources.existing_stacks, provider, &inventory, sink)
            .await;
        ingest_key_value_pairs(&mut ctx, &sources.key_value_pairs, sink).await;

        let mut entries = Vec::new();

        let lifecycle = StackLifecycleDriver::new(self.provider.clone())
            .with_poller(self.poller.clone())
            .with_event_sink(self.sink.clone());
        for definition in &document.stacks_to_create_or_update {
            let timer = OperationTimer::start(definition.name.as_str());
            let template = TemplateDocument::load(&resolve_location(&definition.template_location))?;
            let (action, outcome) = lifecycle
                .create_or_update(definition, &template, &mut ctx, &mut inventory)
                .await?;
            entries.push(RunReportEntry {
                stack: definition.name.clone(),
                operation: action.into(),
                outcome,
                duration_ms: timer.finish(),
            });
        }

        let deletion = DeletionDriver::new(self.provider.clone())
            .with_poller(self.poller.clone())
            .with_event_sink(self.sink.clone());
        for name in &document.stacks_to_delete {
            let timer = OperationTimer::start(name.as_str());
            let outcome = deletion.delete(name, &inventory).await?;
            entries.push(RunReportEntry {
                stack: name.clone(),
                operation: Operation::Delete,
                outcome,
                duration_ms: timer.finish(),
            });
        }

        Ok((entries, ctx))
    }
}
