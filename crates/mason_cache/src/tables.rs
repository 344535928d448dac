//! The three logical tables persisted by the build cache.

use std::collections::BTreeMap;

use mason_common::{ContentHash, Fingerprint};
use serde::{Deserialize, Serialize};

/// All persisted cache state, committed and rolled back as one unit.
///
/// Path-keyed tables use the canonical absolute path rendered as a string.
/// `BTreeMap` keeps the serialized snapshot byte-stable for identical state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheTables {
    /// Free-form generation options (persisted enumeration choices etc.).
    pub options: BTreeMap<String, String>,

    /// Last observed state of each checked input file.
    pub input_files: BTreeMap<String, InputBaseline>,

    /// Content hash of the last rendering considered for each output file.
    pub output_files: BTreeMap<String, ContentHash>,
}

/// Baseline recorded for an input file at its last staleness check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputBaseline {
    /// Modification time in milliseconds since the Unix epoch.
    pub mtime_millis: i64,

    /// Fingerprint of the caller-supplied extra metadata.
    pub metadata: Fingerprint,
}

impl CacheTables {
    /// Returns `true` if all three tables are empty.
    pub fn is_empty(&self) -> bool {
        self.options.is_empty() && self.input_files.is_empty() && self.output_files.is_empty()
    }
}
