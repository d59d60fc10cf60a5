//! Hyperspectral super-resolution training on candle
//!
//! Trains a residual convolutional network that maps a low-resolution
//! hyperspectral cube `[bands, h, w]` to its `[bands, h*s, w*s]`
//! reconstruction, scoring every epoch with PSNR on a held-out set.
//!
//! # Pipeline
//!
//! - **Data**: paired `lr/` + `hr/` `.npy` cubes behind the [`data::SrDataset`] trait
//! - **Model**: [`SpectralSrNet`], residual blocks plus a sub-pixel upsampler
//! - **Training**: L1 loss, Adam, step-decay schedule, per-epoch checkpoints
//!
//! # Example
//!
//! ```ignore
//! use hsi_sr_train::{SrNetConfig, training::{Trainer, TrainingConfig}};
//!
//! let mut trainer = Trainer::new(SrNetConfig::default(), TrainingConfig::default(), Device::Cpu)?;
//! trainer.resume(Some("checkpoint/model_4_epoch_10.safetensors"))?;
//! trainer.fit(&mut train_loader, &mut val_loader)?;
//! ```

pub mod cli;
pub mod config;
pub mod data;
pub mod layers;
pub mod metrics;
pub mod models;
pub mod training;
pub mod utils;

// Re-export commonly used items
pub use config::SrNetConfig;
pub use models::SpectralSrNet;

/// Library error types
#[derive(Debug, thiserror::Error)]
pub enum SrError {
    #[error("Candle error: {0}")]
    Candle(#[from] candle_core::Error),

    #[error("Safetensors error: {0}")]
    SafeTensors(#[from] safetensors::SafeTensorError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    #[error("Training error: {0}")]
    Training(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SrError>;
