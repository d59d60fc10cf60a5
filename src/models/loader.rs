/// Rebuild a network from a training checkpoint
use std::path::Path;
use candle_core::{Device, DType};
use candle_nn::{VarBuilder, VarMap};

use crate::config::SrNetConfig;
use crate::training::checkpoint::load_weights;
use crate::utils::assign_parameters;
use super::SpectralSrNet;

/// Load model from a checkpoint file
///
/// # Arguments
/// * `config` - Network configuration the checkpoint was trained with
/// * `checkpoint_path` - Path to a `.safetensors` training checkpoint
/// * `device` - Device to load model on
///
/// # Returns
/// The network and the `VarMap` holding its parameters
pub fn load_model<P: AsRef<Path>>(
    config: SrNetConfig,
    checkpoint_path: P,
    device: &Device,
) -> crate::Result<(SpectralSrNet, VarMap)> {
    let varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);
    let model = SpectralSrNet::new(config, vb)?;

    let weights = load_weights(checkpoint_path.as_ref(), device)?;
    assign_parameters(&varmap, &weights)?;

    log::info!(
        "Loaded {} tensors from {}",
        weights.len(),
        checkpoint_path.as_ref().display()
    );

    Ok((model, varmap))
}
