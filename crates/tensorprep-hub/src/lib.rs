//! Hub integration for tensorprep.
//!
//! This crate provides:
//! - Dataset file downloading from HuggingFace Hub (blocking)
//! - Per-split retrieval for named text corpora
//! - Local data directory management

#![warn(missing_docs)]

mod cache;
mod download;

pub use cache::*;
pub use download::*;
