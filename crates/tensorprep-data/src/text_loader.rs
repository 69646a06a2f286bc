//! Batch loaders for encoded text splits.

use ndarray::{Array2, Array3};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tensorprep_core::Device;

use crate::dataloader::LoaderConfig;

/// A batch of teacher-forcing text data.
///
/// `x` holds raw input ids `[batch, x_len]`. For each example the target
/// id sequence is prefixed with the start sentinel and one-hot encoded
/// over the full vocabulary (subwords plus sentinels); `y` is that matrix
/// shifted one step ahead `[batch, target_len, vocab]` and `prev_y` is
/// the unshifted previous-token matrix of the same shape.
#[derive(Debug)]
pub struct TextBatch {
    /// Input token ids.
    pub x: Array2<i64>,
    /// One-hot next-token targets.
    pub y: Array3<f32>,
    /// One-hot previous-token inputs.
    pub prev_y: Array3<f32>,
    /// Number of samples in this batch.
    pub batch_size: usize,
    /// Compute target the batch is destined for.
    pub device: Device,
}

/// Loader that yields shuffled teacher-forcing batches from one split.
pub struct TextLoader {
    x: Vec<Vec<u32>>,
    target: Vec<Vec<u32>>,
    start_token: u32,
    vocab_size: usize,
    config: LoaderConfig,
    device: Device,
    indices: Vec<usize>,
    position: usize,
}

impl TextLoader {
    /// Create a loader over one split's padded id sequences.
    ///
    /// `vocab_size` is the one-hot width: subword vocabulary plus the
    /// three sentinels. The caller supplies the RNG so several loaders
    /// can share one shuffle stream.
    pub fn new(
        x: Vec<Vec<u32>>,
        target: Vec<Vec<u32>>,
        start_token: u32,
        vocab_size: usize,
        config: LoaderConfig,
        device: Device,
        rng: &mut StdRng,
    ) -> Self {
        let mut indices: Vec<usize> = (0..x.len()).collect();
        if config.shuffle {
            indices.shuffle(rng);
        }
        Self {
            x,
            target,
            start_token,
            vocab_size,
            config,
            device,
            indices,
            position: 0,
        }
    }

    /// Get the total number of samples.
    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// Check if the loader is empty.
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Get the number of batches.
    pub fn num_batches(&self) -> usize {
        let n = self.x.len();
        if self.config.drop_last {
            n / self.config.batch_size
        } else {
            (n + self.config.batch_size - 1) / self.config.batch_size
        }
    }

    /// Get the next batch.
    pub fn next_batch(&mut self) -> Option<TextBatch> {
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

    fn create_batch(&self, indices: &[usize]) -> TextBatch {
        let batch_size = indices.len();
        let x_len = self.x.first().map(Vec::len).unwrap_or(0);
        let target_len = self.target.first().map(Vec::len).unwrap_or(0);

        let mut x_arr = Array2::<i64>::zeros((batch_size, x_len));
        let mut y_arr = Array3::<f32>::zeros((batch_size, target_len, self.vocab_size));
        let mut prev_y_arr = Array3::<f32>::zeros((batch_size, target_len, self.vocab_size));

        for (row, &i) in indices.iter().enumerate() {
            for (col, &id) in self.x[i].iter().enumerate() {
                x_arr[[row, col]] = id as i64;
            }

            // Combined sequence [start, t0, t1, ...] of length T+1; the
            // shifted view is the target, the unshifted view the input.
            let combined: Vec<u32> = std::iter::once(self.start_token)
                .chain(self.target[i].iter().copied())
                .collect();
            for step in 0..target_len {
                y_arr[[row, step, combined[step + 1] as usize]] = 1.0;
                prev_y_arr[[row, step, combined[step] as usize]] = 1.0;
            }
        }

        TextBatch {
            x: x_arr,
            y: y_arr,
            prev_y: prev_y_arr,
            batch_size,
            device: self.device,
        }
    }
}

impl Iterator for TextLoader {
    type Item = TextBatch;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_batch()
    }
}
