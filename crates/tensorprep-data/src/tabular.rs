//! Tabular CSV pipeline.
//!
//! Construction runs the whole preparation eagerly: resolve or fetch the
//! CSV, clean it per policy, select predictor and target columns, split
//! chronologically, and optionally window each split. The materialized
//! splits are then immutable; batch loaders are created fresh on each
//! [`TabularDataset::loaders`] call.

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use tensorprep_core::{AccessToken, Result, Split, TabularConfig, TensorPrepError};

use crate::dataloader::{LoaderConfig, TabularLoader};
use crate::frame::RawFrame;
use crate::policy::{tabular_policy, TabularPolicy};
use crate::scaler::StandardScaler;

/// The fully prepared samples of one split.
#[derive(Debug, Clone)]
pub enum SplitSamples {
    /// One sample per row.
    Rows {
        /// Predictor rows.
        x: Vec<Vec<f64>>,
        /// Target values, index-aligned with `x`.
        target: Vec<f64>,
    },
    /// One sample per fixed-length contiguous window of rows.
    Windows {
        /// Windowed predictor slices.
        x: Vec<Vec<Vec<f64>>>,
        /// Windowed target slices, index-aligned with `x`.
        target: Vec<Vec<f64>>,
    },
}

impl SplitSamples {
    /// Number of samples in this split.
    pub fn len(&self) -> usize {
        match self {
            SplitSamples::Rows { x, .. } => x.len(),
            SplitSamples::Windows { x, .. } => x.len(),
        }
    }

    /// Check if the split holds no samples.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A fully materialized tabular dataset, split and ready for batching.
pub struct TabularDataset {
    policy: Box<dyn TabularPolicy>,
    config: TabularConfig,
    scaler: Option<StandardScaler>,
    splits: Vec<(Split, SplitSamples)>,
}

impl TabularDataset {
    /// Build the dataset named in the configuration.
    pub fn new(config: TabularConfig) -> Result<Self> {
        let policy = tabular_policy(&config.name)?;
        Self::with_policy(config, policy)
    }

    /// Build a dataset with an explicit policy.
    pub fn with_policy(config: TabularConfig, policy: Box<dyn TabularPolicy>) -> Result<Self> {
        let path = Self::resolve_file(&config, policy.as_ref())?;

        let mut frame = RawFrame::from_csv_path(&path)?;
        let scaler = policy.clean(&mut frame)?;

        let x = frame.select(policy.predictors())?;
        let target = frame.column(policy.target())?;

        let splits = Self::split_and_window(x, target, policy.window_length());

        tracing::info!(
            "Prepared '{}': {} samples across {} splits",
            policy.name(),
            splits.iter().map(|(_, s)| s.len()).sum::<usize>(),
            splits.len()
        );

        Ok(Self {
            policy,
            config,
            scaler,
            splits,
        })
    }

    /// Resolve the local CSV, fetching it from the hub when absent.
    fn resolve_file(config: &TabularConfig, policy: &dyn TabularPolicy) -> Result<PathBuf> {
        let path = tensorprep_hub::data_file(config.data_dir.as_deref(), policy.file_name());
        if path.exists() {
            return Ok(path);
        }

        let remote = policy.download().ok_or_else(|| {
            TensorPrepError::Fetch(format!(
                "{} not found and '{}' has no remote source",
                path.display(),
                policy.name()
            ))
        })?;

        let token = config.hub_token.clone().map(AccessToken::from);
        let fetched = tensorprep_hub::fetch_dataset_file(
            &remote.dataset_id,
            &remote.filename,
            remote.revision.as_deref(),
            token.as_ref(),
        )?;

        tensorprep_hub::ensure_data_dir(config.data_dir.as_deref())?;
        std::fs::copy(&fetched, &path)?;
        Ok(path)
    }

    /// Chronological split at the 70th and 85th percentile row indices,
    /// then optional windowing within each split.
    fn split_and_window(
        x: Vec<Vec<f64>>,
        target: Vec<f64>,
        window: Option<usize>,
    ) -> Vec<(Split, SplitSamples)> {
        let n = x.len();
        let first = (0.7 * n as f64) as usize;
        let second = (0.85 * n as f64) as usize;
        let bounds = [(0, first), (first, second), (second, n)];

        Split::ALL
            .iter()
            .zip(bounds)
            .map(|(&split, (lo, hi))| {
                let x_part = x[lo..hi].to_vec();
                let target_part = target[lo..hi].to_vec();
                let samples = match window {
                    Some(w) => Self::windowize(x_part, target_part, w),
                    None => SplitSamples::Rows {
                        x: x_part,
                        target: target_part,
                    },
                };
                (split, samples)
            })
            .collect()
    }

    /// Slice a split into fixed-length overlapping windows.
    ///
    /// Window starts run over `0..len - window`, which leaves out the
    /// final valid window. Kept as-is so windowed sample counts line up
    /// with existing experiments.
    fn windowize(x: Vec<Vec<f64>>, target: Vec<f64>, window: usize) -> SplitSamples {
        let mut wx = Vec::new();
        let mut wt = Vec::new();
        for j in 0..x.len().saturating_sub(window) {
            wx.push(x[j..j + window].to_vec());
            wt.push(target[j..j + window].to_vec());
        }
        SplitSamples::Windows { x: wx, target: wt }
    }

    /// The policy this dataset was prepared with.
    pub fn policy(&self) -> &dyn TabularPolicy {
        self.policy.as_ref()
    }

    /// The scaler fitted during cleaning, when the policy standardizes.
    pub fn scaler(&self) -> Option<&StandardScaler> {
        self.scaler.as_ref()
    }

    /// Prepared samples of one split.
    pub fn split(&self, split: Split) -> Option<&SplitSamples> {
        self.splits
            .iter()
            .find(|(s, _)| *s == split)
            .map(|(_, samples)| samples)
    }

    /// Create one batch loader per split, in chronological split order.
    ///
    /// A single shuffle stream seeded from `config.seed` drives every
    /// loader unless `config.reseed_per_split` is set, so by default only
    /// the train loader's ordering is a pure function of the seed.
    pub fn loaders(&self, config: &LoaderConfig) -> Vec<(Split, TabularLoader)> {
        let mut rng = StdRng::seed_from_u64(config.seed);
        self.splits
            .iter()
            .map(|(split, samples)| {
                if config.reseed_per_split {
                    rng = StdRng::seed_from_u64(config.seed);
                }
                let loader = TabularLoader::new(
                    samples.clone(),
                    config.clone(),
                    self.config.device,
                    &mut rng,
                );
                (*split, loader)
            })
            .collect()
    }
}
