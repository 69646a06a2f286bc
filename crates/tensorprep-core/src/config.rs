//! Configuration types for tensorprep.

use crate::Device;
use serde::{Deserialize, Serialize};

/// Configuration for a tabular (CSV) dataset pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TabularConfig {
    /// Registered dataset name (selects the cleaning/column policy).
    pub name: String,

    /// Compute device tag attached to produced batches.
    #[serde(default)]
    pub device: Device,

    /// Directory holding local dataset files. Defaults to the sibling
    /// `data/` directory (overridable via `TENSORPREP_DATA_DIR`).
    #[serde(default)]
    pub data_dir: Option<String>,

    /// Hub token for private dataset repositories.
    #[serde(default)]
    pub hub_token: Option<String>,
}

impl TabularConfig {
    /// Configuration for a named dataset with all defaults.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            device: Device::default(),
            data_dir: None,
            hub_token: None,
        }
    }
}

/// Configuration for a text corpus pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextConfig {
    /// Registered corpus name (selects the extraction/trim policy).
    pub name: String,

    /// Subword vocabulary size the tokenizer is trained to. Sentinel ids
    /// occupy `vocab_size..vocab_size + 3`.
    #[serde(default = "default_vocab_size")]
    pub vocab_size: usize,

    /// Compute device tag attached to produced batches.
    #[serde(default)]
    pub device: Device,

    /// Directory holding working files (tokens file, trained tokenizer
    /// model). Defaults to the sibling `data/` directory.
    #[serde(default)]
    pub data_dir: Option<String>,

    /// Read split files from this local directory instead of the hub.
    /// Expects one `<split>.jsonl` per declared split.
    #[serde(default)]
    pub local_dir: Option<String>,

    /// Hub token for private corpus repositories.
    #[serde(default)]
    pub hub_token: Option<String>,
}

impl TextConfig {
    /// Configuration for a named corpus with all defaults.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vocab_size: default_vocab_size(),
            device: Device::default(),
            data_dir: None,
            local_dir: None,
            hub_token: None,
        }
    }
}

// Default value functions
fn default_vocab_size() -> usize {
    2000
}
