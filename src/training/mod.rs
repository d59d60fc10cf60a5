/// Training infrastructure for SpectralSrNet
pub mod checkpoint;
pub mod loss;
pub mod optimizer;
pub mod scheduler;
pub mod summary;
pub mod trainer;

pub use checkpoint::{checkpoint_path, Checkpoint, CheckpointMetadata, RunSnapshot};
pub use loss::l1_loss;
pub use optimizer::{Adam, AdamConfig, OptimizerState};
pub use scheduler::{MultiStepScheduler, MultiStepSchedulerConfig};
pub use summary::ScalarWriter;
pub use trainer::{evaluate, EpochSummary, Trainer, TrainingConfig, ValidationReport};
