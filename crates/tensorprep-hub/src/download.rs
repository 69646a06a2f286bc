//! Dataset downloading from HuggingFace Hub.
//!
//! The pipelines are synchronous end to end, so this module uses the hub
//! client's blocking API. Downloads land in the hub cache; callers get the
//! cached path back and copy or read from there.

use hf_hub::api::sync::{Api, ApiBuilder};
use hf_hub::{Repo, RepoType};
use std::path::PathBuf;
use tensorprep_core::{AccessToken, Result, TensorPrepError};

/// Build a blocking API client with optional token authentication.
fn build_api(token: Option<&AccessToken>) -> Result<Api> {
    let mut builder = ApiBuilder::new().with_progress(false);

    if let Some(token) = token {
        builder = builder.with_token(Some(token.expose().to_string()));
    }

    builder
        .build()
        .map_err(|e| TensorPrepError::Hub(e.to_string()))
}

fn dataset_repo(dataset_id: &str, revision: Option<&str>) -> Repo {
    match revision {
        Some(rev) => Repo::with_revision(
            dataset_id.to_string(),
            RepoType::Dataset,
            rev.to_string(),
        ),
        None => Repo::new(dataset_id.to_string(), RepoType::Dataset),
    }
}

/// Download a single file from a dataset repository.
///
/// # Arguments
/// * `dataset_id` - Dataset identifier (e.g., "vstepanenko/clean-weather")
/// * `filename` - File to download
/// * `revision` - Optional revision/branch
/// * `token` - Optional authentication token
pub fn fetch_dataset_file(
    dataset_id: &str,
    filename: &str,
    revision: Option<&str>,
    token: Option<&AccessToken>,
) -> Result<PathBuf> {
    let api = build_api(token)?;
    let repo = api.repo(dataset_repo(dataset_id, revision));

    tracing::info!("Fetching {} from {}...", filename, dataset_id);
    repo.get(filename)
        .map_err(|e| TensorPrepError::Hub(e.to_string()))
}

/// Download the JSONL file for one split of a named corpus.
///
/// Corpus repositories place split files in a handful of conventional
/// locations; each is tried in turn.
///
/// # Arguments
/// * `corpus_id` - Corpus identifier (e.g., "opus_books")
/// * `version` - Optional corpus version, used as the repo revision
/// * `split` - Split name (e.g., "train")
/// * `token` - Optional authentication token
pub fn fetch_corpus_split(
    corpus_id: &str,
    version: Option<&str>,
    split: &str,
    token: Option<&AccessToken>,
) -> Result<PathBuf> {
    let api = build_api(token)?;
    let repo = api.repo(dataset_repo(corpus_id, version));

    let patterns = [
        format!("{split}.jsonl"),
        format!("data/{split}.jsonl"),
        format!("{split}/{split}.jsonl"),
        format!("{split}.json"),
    ];

    for pattern in &patterns {
        if let Ok(path) = repo.get(pattern) {
            tracing::info!("Fetched split '{}' of {} ({})", split, corpus_id, pattern);
            return Ok(path);
        }
    }

    Err(TensorPrepError::Corpus(format!(
        "no split file found for '{}' in corpus '{}' (tried: {})",
        split,
        corpus_id,
        patterns.join(", ")
    )))
}
