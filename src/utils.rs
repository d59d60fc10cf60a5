/// Parameter bookkeeping and device selection
use std::collections::HashMap;

use candle_core::{Device, Tensor, Var};
use candle_nn::VarMap;
use rand::distributions::Uniform;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// All parameters of a `VarMap`, sorted by name
///
/// `VarMap` iterates in hash order; anything that must be reproducible
/// (initialisation, optimizer state layout) goes through this instead.
pub fn named_parameters(varmap: &VarMap) -> crate::Result<Vec<(String, Var)>> {
    let data = varmap
        .data()
        .lock()
        .map_err(|e| crate::SrError::Training(format!("VarMap lock poisoned: {}", e)))?;

    let mut params: Vec<(String, Var)> = data
        .iter()
        .map(|(name, var)| (name.clone(), var.clone()))
        .collect();
    params.sort_by(|a, b| a.0.cmp(&b.0));

    Ok(params)
}

/// Calculate the number of scalar parameters in a `VarMap`
pub fn count_parameters(varmap: &VarMap) -> usize {
    varmap
        .all_vars()
        .iter()
        .map(|var| var.dims().iter().product::<usize>())
        .sum()
}

/// Re-initialise every parameter from `seed`
///
/// Weights (rank >= 2) get Kaiming-uniform values with bound
/// `sqrt(6 / fan_in)`, biases start at zero. Parameters are visited in name
/// order so the same seed always yields the same network.
pub fn seed_parameters(varmap: &VarMap, seed: u64) -> crate::Result<()> {
    let mut rng = StdRng::seed_from_u64(seed);

    for (_name, var) in named_parameters(varmap)? {
        let dims = var.dims().to_vec();
        let numel: usize = dims.iter().product();

        let values: Vec<f32> = if dims.len() > 1 {
            let fan_in: usize = dims[1..].iter().product();
            let bound = (6.0 / fan_in as f64).sqrt() as f32;
            let dist = Uniform::new_inclusive(-bound, bound);
            (0..numel).map(|_| rng.sample(dist)).collect()
        } else {
            vec![0.0; numel]
        };

        let init = Tensor::from_vec(values, dims, var.device())?.to_dtype(var.dtype())?;
        var.set(&init)?;
    }

    Ok(())
}

/// Copy named tensors into the matching `Var`s
///
/// Every parameter must be present with the same shape; extra tensors are
/// an error too, since they point at a different architecture.
pub fn assign_parameters(varmap: &VarMap, tensors: &HashMap<String, Tensor>) -> crate::Result<()> {
    let params = named_parameters(varmap)?;

    if tensors.len() != params.len() {
        return Err(crate::SrError::Checkpoint(format!(
            "checkpoint has {} model tensors, network has {} parameters",
            tensors.len(),
            params.len()
        )));
    }

    for (name, var) in params {
        let tensor = tensors.get(&name).ok_or_else(|| {
            crate::SrError::Checkpoint(format!("missing parameter '{}' in checkpoint", name))
        })?;
        if tensor.dims() != var.dims() {
            return Err(crate::SrError::Checkpoint(format!(
                "shape mismatch for '{}': checkpoint {:?}, network {:?}",
                name,
                tensor.dims(),
                var.dims()
            )));
        }
        var.set(&tensor.to_dtype(var.dtype())?)?;
    }

    Ok(())
}

/// Parse a comma separated GPU id list such as `"0,1"`
pub fn parse_gpu_ids(gpus: &str) -> crate::Result<Vec<usize>> {
    gpus.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| {
            id.parse::<usize>()
                .map_err(|_| crate::SrError::Config(format!("Invalid gpu id: '{}'", id)))
        })
        .collect()
}

/// Pick the compute device
///
/// Requesting CUDA without a usable GPU is a configuration error, raised
/// before any data is touched.
pub fn select_device(cuda: bool, gpus: &str) -> crate::Result<Device> {
    if !cuda {
        return Ok(Device::Cpu);
    }

    log::info!("=> Use GPU ID: '{}'", gpus);
    let ids = parse_gpu_ids(gpus)?;
    let ordinal = ids.first().copied().unwrap_or(0);
    if ids.len() > 1 {
        log::warn!(
            "Multiple GPU ids given ({:?}); training runs on GPU {} only",
            ids,
            ordinal
        );
    }

    if !candle_core::utils::cuda_is_available() {
        return Err(crate::SrError::Config(
            "No GPU found or wrong gpu id, please run without --cuda".to_string(),
        ));
    }

    Device::new_cuda(ordinal).map_err(|e| {
        crate::SrError::Config(format!(
            "No GPU found or wrong gpu id ({}), please run without --cuda: {}",
            ordinal, e
        ))
    })
}
