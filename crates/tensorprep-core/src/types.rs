//! Common type definitions.

use serde::{Deserialize, Serialize};

/// Compute device batches are destined for.
///
/// The pipelines produce host-memory arrays; the tag tells the consuming
/// trainer where to place each batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    /// CPU computation.
    #[default]
    Cpu,
    /// GPU computation.
    Gpu,
}

/// The three chronological partitions of a tabular dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Split {
    /// First 70% of rows.
    Train,
    /// Rows between the 70th and 85th percentiles.
    Validation,
    /// Final 15% of rows.
    Test,
}

impl Split {
    /// All splits in chronological order.
    pub const ALL: [Split; 3] = [Split::Train, Split::Validation, Split::Test];

    /// Lowercase split name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Validation => "validation",
            Split::Test => "test",
        }
    }
}

impl std::fmt::Display for Split {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
