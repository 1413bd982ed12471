//! Parameter aggregation.
//!
//! Records from every source are merged into a single [`ParameterContext`].
//! A key seen with two distinct values is quarantined: it leaves the pool
//! and stays out for the rest of the run, so a template that needs it fails
//! with a missing-parameter error instead of silently picking a value.

mod aggregator;
mod resolve;
mod sources;

pub use aggregator::{IngestResult, ParameterContext};
pub use resolve::{resolve_parameters, ParameterOrigin, ResolvedParameter};
pub use sources::{
    ingest_existing_stacks, ingest_key_value_pairs, ingest_parameter_files, ingest_payloads,
    ingest_record, read_parameter_file,
};
