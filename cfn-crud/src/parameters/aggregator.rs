//! The parameter pool and conflict quarantine.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::ParameterRecord;

/// What happened to a record passed to [`ParameterContext::ingest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum IngestResult {
    /// The key was new and is now pooled.
    Inserted,
    /// The key was already pooled with the same value.
    Duplicate,
    /// The key was pooled with another value; it is now quarantined.
    ConflictDetected {
        /// The value previously pooled.
        previous: String,
    },
    /// The key was already quarantined; the value was appended.
    ConflictExtended,
}

impl IngestResult {
    /// Returns true if the record caused or extended a conflict.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::ConflictDetected { .. } | Self::ConflictExtended)
    }
}

/// The resolved parameter pool plus the set of conflicting keys.
///
/// A key is in at most one of the two maps. Once a key is quarantined it
/// never returns to the pool for the rest of the run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterContext {
    pool: BTreeMap<String, String>,
    conflicts: BTreeMap<String, Vec<String>>,
}

impl ParameterContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges one record.
    pub fn ingest(&mut self, record: ParameterRecord) -> IngestResult {
        let ParameterRecord { key, value } = record;

        if let Some(values) = self.conflicts.get_mut(&key) {
            values.push(value);
            return IngestResult::ConflictExtended;
        }

        match self.pool.get(&key) {
            Some(existing) if *existing == value => IngestResult::Duplicate,
            Some(_) => {
                let previous = self.pool.remove(&key).unwrap_or_default();
                self.conflicts.insert(key, vec![previous.clone(), value]);
                IngestResult::ConflictDetected { previous }
            }
            None => {
                self.pool.insert(key, value);
                IngestResult::Inserted
            }
        }
    }

    /// Returns the pooled value for a key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pool.get(key).map(String::as_str)
    }

    /// Returns true if the key has been quarantined.
    #[must_use]
    pub fn is_conflicted(&self, key: &str) -> bool {
        self.conflicts.contains_key(key)
    }

    /// Values observed for a quarantined key, in arrival order.
    #[must_use]
    pub fn conflicting_values(&self, key: &str) -> Option<&[String]> {
        self.conflicts.get(key).map(Vec::as_slice)
    }

    /// The resolved pool.
    #[must_use]
    pub const fn pool(&self) -> &BTreeMap<String, String> {
        &self.pool
    }

    /// The quarantined keys with every value observed for them.
    #[must_use]
    pub const fn conflicts(&self) -> &BTreeMap<String, Vec<String>> {
        &self.conflicts
    }
}
