//! Parameter sources: parameter files, existing stack outputs and inline
//! key/value pairs.
//!
//! Every source is reduced to [`ParameterRecord`]s before it reaches the
//! pool. Payloads of an unexpected shape are logged and skipped.

use std::path::Path;

use serde_json::json;
use tracing::{debug, error, info, warn};

use super::{IngestResult, ParameterContext};
use crate::core::ParameterRecord;
use crate::definition::{resolve_location, ParameterFileSource};
use crate::errors::DefinitionError;
use crate::events::{self, EventSink};
use crate::inventory::{ActiveState, StackInventorySnapshot};
use crate::provider::{ProviderError, StackProvider};

/// Merges one record and reports conflicts.
pub async fn ingest_record(
    ctx: &mut ParameterContext,
    record: ParameterRecord,
    source: &str,
    sink: &dyn EventSink,
) -> IngestResult {
    let key = record.key.clone();
    let result = ctx.ingest(record);

    match &result {
        IngestResult::Inserted => debug!(source = %source, key = %key, "Added parameter"),
        IngestResult::Duplicate => debug!(source = %source, key = %key, "Duplicate parameter"),
        IngestResult::ConflictDetected { .. } | IngestResult::ConflictExtended => {
            let values = ctx.conflicting_values(&key).unwrap_or_default();
            warn!(
                source = %source,
                key = %key,
                values = ?values,
                "Conflicting values for parameter, removed from the pool"
            );
            sink.emit(
                events::PARAMETER_CONFLICT,
                Some(json!({"key": key, "values": values, "source": source})),
            )
            .await;
        }
    }

    result
}

/// Converts and merges raw payloads. Returns the number of records merged.
pub async fn ingest_payloads(
    ctx: &mut ParameterContext,
    payloads: &[serde_json::Value],
    source: &str,
    sink: &dyn EventSink,
) -> usize {
    let mut merged = 0;

    for payload in payloads {
        let Some(record) = ParameterRecord::from_payload(payload) else {
            error!(source = %source, payload = %payload, "Unexpected parameter format, skipping");
            sink.emit(
                events::PARAMETER_SOURCE_SKIPPED,
                Some(json!({"source": source, "reason": "malformed_payload", "payload": payload})),
            )
            .await;
            continue;
        };
        ingest_record(ctx, record, source, sink).await;
        merged += 1;
    }

    merged
}

/// Reads a parameter file: a JSON array of `ParameterKey`/`ParameterValue`
/// objects.
pub fn read_parameter_file(path: &Path) -> Result<Vec<serde_json::Value>, DefinitionError> {
    let text = std::fs::read_to_string(path).map_err(|source| DefinitionError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|e| DefinitionError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Ingests every declared parameter file, in order.
pub async fn ingest_parameter_files(
    ctx: &mut ParameterContext,
    files: &[ParameterFileSource],
    sink: &dyn EventSink,
) -> Result<(), DefinitionError> {
    for file in files {
        let path = resolve_location(&file.location);
        info!(label = %file.label, path = %path.display(), "Reading parameter file");

        let payloads = read_parameter_file(&path)?;
        let source = format!("file:{}", file.label);
        ingest_payloads(ctx, &payloads, &source, sink).await;
    }
    Ok(())
}

/// Ingests the outputs of each referenced stack, in order.
///
/// A reference the provider cannot describe is skipped with a warning and
/// never aborts the run; validation errors (typically a stack that does not
/// exist) are the common case. A stack whose creation this run issued but
/// has not yet confirmed is skipped without a provider call.
pub async fn ingest_existing_stacks(
    ctx: &mut ParameterContext,
    stack_names: &[String],
    provider: &dyn StackProvider,
    inventory: &StackInventorySnapshot,
    sink: &dyn EventSink,
) {
    for name in stack_names {
        let source = format!("stack:{name}");

        if inventory.state(name) == Some(ActiveState::Pending) {
            warn!(stack = %name, "Stack creation not yet confirmed, not reading its outputs");
            skipped(sink, &source, "pending_stack", None).await;
            continue;
        }

        info!(stack = %name, "Reading outputs from existing stack");
        let description = match provider.describe_stack(name).await {
            Ok(description) => description,
            Err(err) => {
                if err.is_validation() {
                    warn!(stack = %name, error = %err.message, "Cannot read existing stack, skipping");
                } else {
                    warn!(
                        stack = %name,
                        code = %err.code,
                        error = %err.message,
                        "Provider refused to describe existing stack, skipping"
                    );
                }
                skipped(sink, &source, "unresolvable_stack", Some(&err)).await;
                continue;
            }
        };

        for output in description.outputs {
            ingest_record(ctx, output.into(), &source, sink).await;
        }
    }
}

/// Ingests the inline key/value pairs.
pub async fn ingest_key_value_pairs(
    ctx: &mut ParameterContext,
    payloads: &[serde_json::Value],
    sink: &dyn EventSink,
) {
    ingest_payloads(ctx, payloads, "key_value_pairs", sink).await;
}

async fn skipped(sink: &dyn EventSink, source: &str, reason: &str, error: Option<&ProviderError>) {
    let mut payload = json!({"source": source, "reason": reason});
    if let Some(err) = error {
        payload["code"] = json!(err.code);
    }
    sink.emit(events::PARAMETER_SOURCE_SKIPPED, Some(payload)).await;
}
