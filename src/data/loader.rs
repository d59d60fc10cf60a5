/// Batching loader over any [`SrDataset`]
use candle_core::{Device, Tensor};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use rayon::ThreadPool;

use super::{BatchDataLoader, SrDataset};

/// Shuffling, batching loader
///
/// The permutation for an epoch depends only on `(seed, epoch)`, so a run
/// resumed at epoch k sees exactly the batches an uninterrupted run would.
pub struct SampleLoader<D> {
    dataset: D,
    batch_size: usize,
    shuffle: bool,
    seed: u64,
    pool: Option<ThreadPool>,
    current_idx: usize,
    indices: Vec<usize>,
}

impl<D: SrDataset> SampleLoader<D> {
    /// Create new data loader
    pub fn new(dataset: D, batch_size: usize, shuffle: bool) -> Self {
        let indices: Vec<usize> = (0..dataset.len()).collect();

        Self {
            dataset,
            batch_size: batch_size.max(1),
            shuffle,
            seed: 0,
            pool: None,
            current_idx: 0,
            indices,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Decode the samples of a batch on a pool of `threads` workers
    ///
    /// One thread (or a pool that fails to start) means samples are read
    /// on the calling thread.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.pool = if threads > 1 {
            match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
                Ok(pool) => Some(pool),
                Err(e) => {
                    log::warn!("Loader thread pool unavailable ({}), reading serially", e);
                    None
                }
            }
        } else {
            None
        };
        self
    }

    /// Get dataset reference
    pub fn dataset(&self) -> &D {
        &self.dataset
    }

    /// Number of samples in the dataset
    pub fn num_samples(&self) -> usize {
        self.indices.len()
    }

    /// Current visiting order
    pub fn order(&self) -> &[usize] {
        &self.indices
    }

    fn fetch(&self, batch: &[usize]) -> crate::Result<Vec<(Tensor, Tensor)>> {
        let dataset = &self.dataset;
        match &self.pool {
            Some(pool) if batch.len() > 1 => {
                pool.install(|| batch.par_iter().map(|&idx| dataset.get(idx)).collect())
            }
            _ => batch.iter().map(|&idx| dataset.get(idx)).collect(),
        }
    }
}

impl<D: SrDataset> BatchDataLoader for SampleLoader<D> {
    fn next_batch(&mut self, device: &Device) -> crate::Result<Option<(Tensor, Tensor)>> {
        if self.current_idx >= self.indices.len() {
            return Ok(None);
        }

        let end_idx = (self.current_idx + self.batch_size).min(self.indices.len());
        let samples = self.fetch(&self.indices[self.current_idx..end_idx])?;
        self.current_idx = end_idx;

        let (inputs, labels): (Vec<Tensor>, Vec<Tensor>) = samples.into_iter().unzip();
        let input = Tensor::stack(&inputs, 0)?.to_device(device)?;
        let label = Tensor::stack(&labels, 0)?.to_device(device)?;

        Ok(Some((input, label)))
    }

    fn reset(&mut self, epoch: usize) {
        self.current_idx = 0;
        self.indices = (0..self.dataset.len()).collect();

        if self.shuffle {
            let epoch_seed = self
                .seed
                .wrapping_add((epoch as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15));
            let mut rng = StdRng::seed_from_u64(epoch_seed);
            self.indices.shuffle(&mut rng);
        }
    }

    fn num_batches(&self) -> usize {
        self.indices.len().div_ceil(self.batch_size)
    }
}
