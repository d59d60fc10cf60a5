/// Epoch checkpoints in safetensors format
///
/// One file per epoch, `model_<scale>_epoch_<epoch>.safetensors`, holding
/// - `model.<param>`: network parameters
/// - `optimizer.<param>.exp_avg` / `optimizer.<param>.exp_avg_sq`: Adam moments
/// - `__metadata__["checkpoint"]`: JSON [`CheckpointMetadata`]
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use candle_core::{Device, Tensor};
use safetensors::SafeTensors;

use super::optimizer::OptimizerState;
use super::trainer::TrainingConfig;
use crate::config::SrNetConfig;

const METADATA_KEY: &str = "checkpoint";
const MODEL_PREFIX: &str = "model.";
const OPTIMIZER_PREFIX: &str = "optimizer.";
const EXP_AVG_SUFFIX: &str = ".exp_avg";
const EXP_AVG_SQ_SUFFIX: &str = ".exp_avg_sq";

/// File extension of checkpoint files
pub const CHECKPOINT_EXTENSION: &str = "safetensors";

/// Checkpoint metadata
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CheckpointMetadata {
    /// Last completed epoch
    pub epoch: usize,
    /// Optimizer learning rate at checkpoint
    pub lr: f64,
    /// Adam update count
    pub optimizer_step: usize,
    /// Upscale factor the network was trained for
    pub upscale_factor: usize,
    /// Mean training loss of the epoch
    pub loss: Option<f64>,
    /// Validation PSNR of the epoch
    pub psnr: Option<f64>,
    /// Run configuration (as JSON string)
    pub config: Option<String>,
}

/// Configuration a checkpoint was produced with
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RunSnapshot {
    pub net: SrNetConfig,
    pub training: TrainingConfig,
}

impl RunSnapshot {
    /// Decode the snapshot embedded in checkpoint metadata, if any
    pub fn from_metadata(metadata: &CheckpointMetadata) -> crate::Result<Option<Self>> {
        metadata
            .config
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(Into::into)
    }
}

/// Model checkpoint
pub struct Checkpoint {
    /// Model parameters
    pub model: HashMap<String, Tensor>,
    /// Optimizer state
    pub optimizer: OptimizerState,
    /// Metadata
    pub metadata: CheckpointMetadata,
}

/// Path of the checkpoint for `epoch`
pub fn checkpoint_path<P: AsRef<Path>>(dir: P, upscale_factor: usize, epoch: usize) -> PathBuf {
    dir.as_ref().join(format!(
        "model_{}_epoch_{}.{}",
        upscale_factor, epoch, CHECKPOINT_EXTENSION
    ))
}

impl Checkpoint {
    /// Create new checkpoint
    pub fn new(
        model: HashMap<String, Tensor>,
        optimizer: OptimizerState,
        metadata: CheckpointMetadata,
    ) -> Self {
        Self {
            model,
            optimizer,
            metadata,
        }
    }

    /// Save checkpoint to file, creating the parent directory if needed
    ///
    /// Data goes to `<path>.tmp` first and is renamed into place, so an
    /// interrupted save never leaves a truncated file under an epoch name.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> crate::Result<()> {
        let path = path.as_ref();
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }

        let mut tensors: BTreeMap<String, Tensor> = BTreeMap::new();
        for (name, tensor) in &self.model {
            tensors.insert(format!("{MODEL_PREFIX}{name}"), tensor.clone());
        }
        for (name, (exp_avg, exp_avg_sq)) in &self.optimizer.moments {
            tensors.insert(
                format!("{OPTIMIZER_PREFIX}{name}{EXP_AVG_SUFFIX}"),
                exp_avg.clone(),
            );
            tensors.insert(
                format!("{OPTIMIZER_PREFIX}{name}{EXP_AVG_SQ_SUFFIX}"),
                exp_avg_sq.clone(),
            );
        }

        let mut info = HashMap::new();
        info.insert(
            METADATA_KEY.to_string(),
            serde_json::to_string(&self.metadata)?,
        );

        let tmp = temp_path(path);
        safetensors::serialize_to_file(&tensors, &Some(info), &tmp)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Load checkpoint from file
    ///
    /// # Arguments
    /// * `path` - Path to checkpoint file
    /// * `device` - Device to load tensors on
    pub fn load<P: AsRef<Path>>(path: P, device: &Device) -> crate::Result<Self> {
        let data = std::fs::read(path.as_ref())?;
        let metadata = parse_metadata(&data, path.as_ref())?;
        let tensors = candle_core::safetensors::load_buffer(&data, device)?;

        let mut model = HashMap::new();
        let mut exp_avg = HashMap::new();
        let mut exp_avg_sq = HashMap::new();
        for (key, tensor) in tensors {
            if let Some(name) = key.strip_prefix(MODEL_PREFIX) {
                model.insert(name.to_string(), tensor);
            } else if let Some(rest) = key.strip_prefix(OPTIMIZER_PREFIX) {
                if let Some(name) = rest.strip_suffix(EXP_AVG_SQ_SUFFIX) {
                    exp_avg_sq.insert(name.to_string(), tensor);
                } else if let Some(name) = rest.strip_suffix(EXP_AVG_SUFFIX) {
                    exp_avg.insert(name.to_string(), tensor);
                } else {
                    return Err(crate::SrError::Checkpoint(format!("unexpected tensor '{}'", key)));
                }
            } else {
                return Err(crate::SrError::Checkpoint(format!("unexpected tensor '{}'", key)));
            }
        }

        let mut moments = HashMap::with_capacity(exp_avg.len());
        for (name, avg) in exp_avg {
            let avg_sq = exp_avg_sq.remove(&name).ok_or_else(|| {
                crate::SrError::Checkpoint(format!("missing exp_avg_sq for '{}'", name))
            })?;
            moments.insert(name, (avg, avg_sq));
        }
        if let Some(name) = exp_avg_sq.keys().next() {
            return Err(crate::SrError::Checkpoint(format!("missing exp_avg for '{}'", name)));
        }

        let optimizer = OptimizerState {
            step: metadata.optimizer_step,
            lr: metadata.lr,
            moments,
        };

        Ok(Self {
            model,
            optimizer,
            metadata,
        })
    }

    /// Read only the metadata header of a checkpoint
    pub fn read_metadata<P: AsRef<Path>>(path: P) -> crate::Result<CheckpointMetadata> {
        let data = std::fs::read(path.as_ref())?;
        parse_metadata(&data, path.as_ref())
    }

}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}

fn parse_metadata(data: &[u8], path: &Path) -> crate::Result<CheckpointMetadata> {
    let (_, header) = SafeTensors::read_metadata(data)?;
    let json = header
        .metadata()
        .as_ref()
        .and_then(|info| info.get(METADATA_KEY))
        .ok_or_else(|| {
            crate::SrError::Checkpoint(format!("{:?} has no checkpoint metadata", path))
        })?;
    Ok(serde_json::from_str(json)?)
}

/// Load only model weights from checkpoint
///
/// # Returns
/// HashMap of parameter name to tensor
pub fn load_weights<P: AsRef<Path>>(
    path: P,
    device: &Device,
) -> crate::Result<HashMap<String, Tensor>> {
    Ok(Checkpoint::load(path, device)?.model)
}

/// Checkpoints in `dir` for `upscale_factor`, sorted by epoch
pub fn list_checkpoints<P: AsRef<Path>>(
    dir: P,
    upscale_factor: usize,
) -> crate::Result<Vec<(usize, PathBuf)>> {
    let dir = dir.as_ref();
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let prefix = format!("model_{}_epoch_", upscale_factor);
    let suffix = format!(".{}", CHECKPOINT_EXTENSION);

    let mut found = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let epoch = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_prefix(&prefix))
            .and_then(|n| n.strip_suffix(&suffix))
            .and_then(|n| n.parse::<usize>().ok());
        if let Some(epoch) = epoch {
            found.push((epoch, path));
        }
    }
    found.sort_by_key(|(epoch, _)| *epoch);

    Ok(found)
}

/// Keep the checkpoint of `current_epoch` plus the newest `keep_last - 1`
/// others, delete the rest
///
/// `current_epoch` is never removed, even when files from later epochs of an
/// earlier run are still in `dir`.
///
/// # Returns
/// Paths that were removed
pub fn prune_checkpoints<P: AsRef<Path>>(
    dir: P,
    upscale_factor: usize,
    keep_last: usize,
    current_epoch: usize,
) -> crate::Result<Vec<PathBuf>> {
    let others: Vec<(usize, PathBuf)> = list_checkpoints(dir, upscale_factor)?
        .into_iter()
        .filter(|(epoch, _)| *epoch != current_epoch)
        .collect();
    let excess = others.len().saturating_sub(keep_last.saturating_sub(1));

    let mut removed = Vec::with_capacity(excess);
    for (epoch, path) in others.into_iter().take(excess) {
        log::debug!("Removing checkpoint for epoch {}: {:?}", epoch, path);
        std::fs::remove_file(&path)?;
        removed.push(path);
    }

    Ok(removed)
}
