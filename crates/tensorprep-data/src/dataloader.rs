//! Batch loaders for tabular splits.

use ndarray::{Array2, Array3, ArrayD};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tensorprep_core::Device;

use crate::tabular::SplitSamples;

/// Configuration shared by all batch loaders.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Batch size.
    pub batch_size: usize,
    /// Whether to shuffle sample order.
    pub shuffle: bool,
    /// Whether to drop the last incomplete batch.
    pub drop_last: bool,
    /// Random seed for shuffling.
    pub seed: u64,
    /// Reseed the shuffle stream for every split.
    ///
    /// When false (the default), one stream seeded once drives the
    /// shuffles of every split loader in a run, so only the first split's
    /// ordering is a pure function of the seed. Set true to give each
    /// split its own freshly seeded stream.
    pub reseed_per_split: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            batch_size: 32,
            shuffle: true,
            drop_last: false,
            seed: 0,
            reseed_per_split: false,
        }
    }
}

/// A batch of tabular training data.
///
/// Plain rows produce `x` of shape `[batch, predictors]` and `y` of shape
/// `[batch, 1]`; windowed samples produce `[batch, window, predictors]`
/// and `[batch, window, 1]`.
#[derive(Debug)]
pub struct TabularBatch {
    /// Input features.
    pub x: ArrayD<f32>,
    /// Targets.
    pub y: ArrayD<f32>,
    /// Number of samples in this batch.
    pub batch_size: usize,
    /// Compute target the batch is destined for.
    pub device: Device,
}

/// Loader that yields shuffled batches from one tabular split.
pub struct TabularLoader {
    samples: SplitSamples,
    config: LoaderConfig,
    device: Device,
    indices: Vec<usize>,
    position: usize,
}

impl TabularLoader {
    /// Create a loader over one split's samples.
    ///
    /// The caller supplies the RNG so several loaders can share one
    /// shuffle stream.
    pub fn new(
        samples: SplitSamples,
        config: LoaderConfig,
        device: Device,
        rng: &mut StdRng,
    ) -> Self {
        let mut indices: Vec<usize> = (0..samples.len()).collect();
        if config.shuffle {
            indices.shuffle(rng);
        }
        Self {
            samples,
            config,
            device,
            indices,
            position: 0,
        }
    }

    /// Get the total number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if the loader is empty.
    pub fn is_empty(&self) -> bool {
        self.samples.len() == 0
    }

    /// Get the number of batches.
    pub fn num_batches(&self) -> usize {
        let n = self.samples.len();
        if self.config.drop_last {
            n / self.config.batch_size
        } else {
            (n + self.config.batch_size - 1) / self.config.batch_size
        }
    }

    /// Get the next batch.
    pub fn next_batch(&mut self) -> Option<TabularBatch> {
        if self.position >= self.indices.len() {
            return None;
        }

        let batch_end = (self.position + self.config.batch_size).min(self.indices.len());
        let batch_indices = &self.indices[self.position..batch_end];

        if self.config.drop_last && batch_indices.len() < self.config.batch_size {
            return None;
        }

        let batch = self.create_batch(batch_indices);
        self.position = batch_end;

        Some(batch)
    }

    fn create_batch(&self, indices: &[usize]) -> TabularBatch {
        let batch_size = indices.len();
        let (x, y) = match &self.samples {
            SplitSamples::Rows { x, target } => {
                let num_features = x.first().map(Vec::len).unwrap_or(0);
                let mut x_arr = Array2::<f32>::zeros((batch_size, num_features));
                let mut y_arr = Array2::<f32>::zeros((batch_size, 1));
                for (row, &i) in indices.iter().enumerate() {
                    for (col, &v) in x[i].iter().enumerate() {
                        x_arr[[row, col]] = v as f32;
                    }
                    y_arr[[row, 0]] = target[i] as f32;
                }
                (x_arr.into_dyn(), y_arr.into_dyn())
            }
            SplitSamples::Windows { x, target } => {
                let window = x.first().map(Vec::len).unwrap_or(0);
                let num_features = x
                    .first()
                    .and_then(|w| w.first())
                    .map(Vec::len)
                    .unwrap_or(0);
                let mut x_arr = Array3::<f32>::zeros((batch_size, window, num_features));
                let mut y_arr = Array3::<f32>::zeros((batch_size, window, 1));
                for (row, &i) in indices.iter().enumerate() {
                    for (step, features) in x[i].iter().enumerate() {
                        for (col, &v) in features.iter().enumerate() {
                            x_arr[[row, step, col]] = v as f32;
                        }
                        y_arr[[row, step, 0]] = target[i][step] as f32;
                    }
                }
                (x_arr.into_dyn(), y_arr.into_dyn())
            }
        };

        TabularBatch {
            x,
            y,
            batch_size,
            device: self.device,
        }
    }
}

impl Iterator for TabularLoader {
    type Item = TabularBatch;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_batch()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn row_samples(n: usize) -> SplitSamples {
        SplitSamples::Rows {
            x: (0..n).map(|i| vec![i as f64, (i * 2) as f64]).collect(),
            target: (0..n).map(|i| i as f64 * 10.0).collect(),
        }
    }

    #[test]
    fn test_loader_batch_shapes() {
        let config = LoaderConfig {
            batch_size: 3,
            shuffle: false,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(0);
        let mut loader = TabularLoader::new(row_samples(10), config, Device::Cpu, &mut rng);

        assert_eq!(loader.num_batches(), 4);

        let batch = loader.next_batch().unwrap();
        assert_eq!(batch.batch_size, 3);
        assert_eq!(batch.x.shape(), &[3, 2]);
        assert_eq!(batch.y.shape(), &[3, 1]);

        // Unshuffled, so the first batch is the first three rows.
        assert_eq!(batch.x[[0, 0]], 0.0);
        assert_eq!(batch.x[[1, 0]], 1.0);
        assert_eq!(batch.y[[2, 0]], 20.0);

        // Last batch is the 10th row alone.
        let batches: Vec<_> = loader.collect();
        assert_eq!(batches.len(), 3);
        assert_eq!(batches.last().unwrap().batch_size, 1);
    }

    #[test]
    fn test_loader_drop_last() {
        let config = LoaderConfig {
            batch_size: 3,
            shuffle: false,
            drop_last: true,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(0);
        let loader = TabularLoader::new(row_samples(10), config, Device::Cpu, &mut rng);

        assert_eq!(loader.num_batches(), 3);
        assert_eq!(loader.count(), 3);
    }

    #[test]
    fn test_windowed_batch_shapes() {
        let samples = SplitSamples::Windows {
            x: (0..5)
                .map(|i| vec![vec![i as f64; 3]; 7])
                .collect(),
            target: (0..5).map(|i| vec![i as f64; 7]).collect(),
        };
        let config = LoaderConfig {
            batch_size: 2,
            shuffle: false,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(0);
        let mut loader = TabularLoader::new(samples, config, Device::Cpu, &mut rng);

        let batch = loader.next_batch().unwrap();
        assert_eq!(batch.x.shape(), &[2, 7, 3]);
        assert_eq!(batch.y.shape(), &[2, 7, 1]);
        assert_eq!(batch.y[[1, 6, 0]], 1.0);
    }

    #[test]
    fn test_shuffle_is_deterministic_for_one_seed() {
        let config = LoaderConfig {
            batch_size: 10,
            shuffle: true,
            ..Default::default()
        };

        let mut rng_a = StdRng::seed_from_u64(7);
        let mut rng_b = StdRng::seed_from_u64(7);
        let mut a = TabularLoader::new(row_samples(10), config.clone(), Device::Cpu, &mut rng_a);
        let mut b = TabularLoader::new(row_samples(10), config, Device::Cpu, &mut rng_b);

        let batch_a = a.next_batch().unwrap();
        let batch_b = b.next_batch().unwrap();
        assert_eq!(batch_a.x, batch_b.x);
        assert_eq!(batch_a.y, batch_b.y);
    }
}
