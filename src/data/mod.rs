/// Data loading for super-resolution training
pub mod loader;
pub mod memory;
pub mod npy_folder;

pub use loader::SampleLoader;
pub use memory::InMemoryDataset;
pub use npy_folder::{DatasetMetadata, NpyFolderDataset};

use candle_core::{Device, Tensor};

/// Index-addressable source of `(input, label)` pairs
///
/// `input` is `[bands, h, w]`, `label` is `[bands, h * s, w * s]`. Samples are
/// produced on the CPU; loaders move whole batches to the training device.
pub trait SrDataset: Send + Sync {
    /// Total number of samples
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sample at `idx`
    fn get(&self, idx: usize) -> crate::Result<(Tensor, Tensor)>;
}

/// Generic data loader trait
pub trait BatchDataLoader {
    /// Get next batch of `(input, label)` tensors
    fn next_batch(&mut self, device: &Device) -> crate::Result<Option<(Tensor, Tensor)>>;

    /// Rewind for `epoch`, reshuffling if the loader shuffles
    fn reset(&mut self, epoch: usize);

    /// Get total number of batches
    fn num_batches(&self) -> usize;
}
