//! Data pipelines for tensorprep.
//!
//! This crate provides:
//! - Tabular CSV pipelines (fetch, clean, scale, split, window, batch)
//! - Text corpus pipelines (fetch, tokenize, trim, pad, batch)
//! - Dataset policies describing how each named dataset is prepared
//! - DataLoaders yielding shuffled tensor batches per split

#![warn(missing_docs)]

pub mod dataloader;
pub mod frame;
pub mod policy;
pub mod scaler;
pub mod tabular;
pub mod text;
pub mod text_loader;
pub mod tokenizer;

pub use dataloader::{LoaderConfig, TabularBatch, TabularLoader};
pub use frame::RawFrame;
pub use policy::{
    tabular_policy, text_policy, CnnDailyMailPolicy, OpusBooksPolicy, RemoteFile, TabularPolicy,
    TextPolicy, WeatherPolicy,
};
pub use scaler::StandardScaler;
pub use tabular::{SplitSamples, TabularDataset};
pub use text::{EncodedSplit, TextDataset};
pub use text_loader::{TextBatch, TextLoader};
pub use tokenizer::SubwordTokenizer;
