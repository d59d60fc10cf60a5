/// Convolutional building blocks for the super-resolution network
///
/// - Residual blocks (conv-ReLU-conv with scaled skip)
/// - Sub-pixel upsampling (conv + pixel shuffle)

pub mod residual;
pub mod upsample;

pub use residual::ResidualBlock;
pub use upsample::{pixel_shuffle, Upsampler};

use candle_nn::Conv2dConfig;

/// "Same" padding for an odd square kernel
pub(crate) fn same_padding(kernel_size: usize) -> Conv2dConfig {
    Conv2dConfig {
        padding: kernel_size / 2,
        ..Default::default()
    }
}
