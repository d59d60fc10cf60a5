/// Epoch loop for SpectralSrNet
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use candle_core::{DType, Device, ModuleT, Tensor};
use candle_nn::{VarBuilder, VarMap};

use super::checkpoint::{checkpoint_path, prune_checkpoints, Checkpoint, CheckpointMetadata, RunSnapshot};
use super::loss::l1_loss;
use super::optimizer::{Adam, AdamConfig};
use super::scheduler::{MultiStepScheduler, MultiStepSchedulerConfig};
use super::summary::ScalarWriter;
use crate::data::BatchDataLoader;
use crate::metrics;
use crate::utils::{assign_parameters, count_parameters, named_parameters, seed_parameters};
use crate::{SpectralSrNet, SrNetConfig};

/// Training configuration
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TrainingConfig {
    /// First epoch to run when not resuming (1-based)
    pub start_epoch: usize,
    /// Last epoch to run (inclusive)
    pub n_epochs: usize,
    /// Batch size of the training loader
    pub batch_size: usize,
    /// Learning rate (initial)
    pub learning_rate: f64,
    /// Epochs after which the learning rate decays
    pub milestones: Vec<usize>,
    /// Decay factor at each milestone
    pub gamma: f64,
    /// Adam betas
    pub beta1: f64,
    pub beta2: f64,
    /// Adam epsilon
    pub eps: f64,
    /// L2 penalty
    pub weight_decay: f64,
    /// Seed for parameter init and data order
    pub seed: u64,
    /// Log the batch loss every N iterations
    pub log_every: usize,
    /// Emit `Train/Loss` when the cumulative iteration is a multiple of N
    pub scalar_every: usize,
    /// Checkpoint directory
    pub checkpoint_dir: String,
    /// Keep only the newest N checkpoints; `None` keeps all
    pub keep_last: Option<usize>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            start_epoch: 1,
            n_epochs: 200,
            batch_size: 32,
            learning_rate: 1e-4,
            milestones: vec![35, 70, 105, 140, 175],
            gamma: 0.5,
            beta1: 0.9,
            beta2: 0.999,
            eps: 1e-8,
            weight_decay: 0.0,
            seed: 1,
            log_every: 100,
            scalar_every: 500,
            checkpoint_dir: "checkpoint".to_string(),
            keep_last: None,
        }
    }
}

impl TrainingConfig {
    /// Validate configuration
    pub fn validate(&self) -> crate::Result<()> {
        if self.start_epoch == 0 {
            return Err(crate::SrError::Config("start_epoch is 1-based".to_string()));
        }
        if self.start_epoch > self.n_epochs {
            return Err(crate::SrError::Config(format!(
                "start_epoch {} is past n_epochs {}",
                self.start_epoch, self.n_epochs
            )));
        }
        if self.batch_size == 0 {
            return Err(crate::SrError::Config("batch_size must be > 0".to_string()));
        }
        if !(self.learning_rate > 0.0) {
            return Err(crate::SrError::Config(format!(
                "learning_rate must be > 0, got {}",
                self.learning_rate
            )));
        }
        if self.log_every == 0 || self.scalar_every == 0 {
            return Err(crate::SrError::Config(
                "log_every and scalar_every must be > 0".to_string(),
            ));
        }
        if self.keep_last == Some(0) {
            return Err(crate::SrError::Config("keep_last must be > 0".to_string()));
        }
        Ok(())
    }
}

/// Result of one validation pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidationReport {
    /// Mean PSNR over samples, dB
    pub psnr: f64,
    /// Mean spectral angle over samples, degrees
    pub sam: f64,
    /// Number of samples scored
    pub samples: usize,
}

/// Outcome of one completed epoch
#[derive(Debug, Clone)]
pub struct EpochSummary {
    pub epoch: usize,
    pub lr: f64,
    pub train_loss: f64,
    pub validation: ValidationReport,
    pub checkpoint: PathBuf,
}

/// Trainer for SpectralSrNet
pub struct Trainer {
    model: SpectralSrNet,
    net_config: SrNetConfig,
    varmap: VarMap,
    optimizer: Adam,
    scheduler: MultiStepScheduler,
    summary: Option<ScalarWriter>,
    config: TrainingConfig,
    device: Device,
    next_epoch: usize,
}

impl Trainer {
    /// Create new trainer
    ///
    /// Parameters are initialised from `training_config.seed`, so two
    /// trainers built from the same configs start from identical weights.
    pub fn new(
        net_config: SrNetConfig,
        training_config: TrainingConfig,
        device: Device,
    ) -> crate::Result<Self> {
        training_config.validate()?;

        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let model = SpectralSrNet::new(net_config.clone(), vb)?;
        seed_parameters(&varmap, training_config.seed)?;

        log::info!("# parameters: {}", count_parameters(&varmap));

        let optimizer = Adam::new(
            named_parameters(&varmap)?,
            AdamConfig {
                lr: training_config.learning_rate,
                beta1: training_config.beta1,
                beta2: training_config.beta2,
                eps: training_config.eps,
                weight_decay: training_config.weight_decay,
            },
        )?;

        let mut scheduler = MultiStepScheduler::new(MultiStepSchedulerConfig {
            lr_init: training_config.learning_rate,
            milestones: training_config.milestones.clone(),
            gamma: training_config.gamma,
        });
        scheduler.set_last_epoch(training_config.start_epoch - 1);

        Ok(Self {
            model,
            net_config,
            varmap,
            optimizer,
            scheduler,
            summary: None,
            next_epoch: training_config.start_epoch,
            config: training_config,
            device,
        })
    }

    /// Attach a scalar sink for `Train/Loss` and `Val/PSNR`
    pub fn with_summary(mut self, summary: ScalarWriter) -> Self {
        self.summary = Some(summary);
        self
    }

    /// Optionally restore from a checkpoint
    ///
    /// A path that does not exist is not an error: training starts at the
    /// configured epoch. Returns the next epoch to run.
    pub fn resume<P: AsRef<Path>>(&mut self, path: Option<P>) -> crate::Result<usize> {
        let Some(path) = path else {
            return Ok(self.next_epoch);
        };
        let path = path.as_ref();

        if !path.is_file() {
            log::warn!("=> no checkpoint found at '{}'", path.display());
            return Ok(self.next_epoch);
        }

        log::info!("=> loading checkpoint '{}'", path.display());
        let checkpoint = Checkpoint::load(path, &self.device)?;
        let epoch = checkpoint.metadata.epoch;

        assign_parameters(&self.varmap, &checkpoint.model)?;
        self.optimizer.load_state(checkpoint.optimizer)?;
        self.scheduler.set_last_epoch(epoch);
        self.next_epoch = epoch + 1;

        log::info!("=> resuming at epoch {}", self.next_epoch);
        Ok(self.next_epoch)
    }

    /// Forward, L1 loss, backward and one Adam update
    pub fn train_step(&mut self, input: &Tensor, label: &Tensor) -> crate::Result<f64> {
        let sr = self.model.forward_t(input, true)?;
        let loss = l1_loss(&sr, label)?;

        self.optimizer.backward_step(&loss)?;

        Ok(loss.to_dtype(DType::F64)?.to_scalar::<f64>()?)
    }

    /// Train for one epoch
    ///
    /// # Returns
    /// Mean batch loss
    pub fn train_epoch(
        &mut self,
        dataloader: &mut impl BatchDataLoader,
        epoch: usize,
    ) -> crate::Result<f64> {
        dataloader.reset(epoch);
        let num_batches = dataloader.num_batches();

        let mut total_loss = 0.0;
        let mut iteration = 0usize;
        while let Some((input, label)) = dataloader.next_batch(&self.device)? {
            iteration += 1;
            let loss = self.train_step(&input, &label)?;
            if !loss.is_finite() {
                return Err(crate::SrError::Training(format!(
                    "non-finite loss {} at epoch {} iteration {}",
                    loss, epoch, iteration
                )));
            }
            total_loss += loss;

            if iteration % self.config.log_every == 0 {
                log::info!(
                    "===> Epoch[{}]({}/{}): Loss: {:.10}",
                    epoch,
                    iteration,
                    num_batches,
                    loss
                );
            }

            if let Some(summary) = &self.summary {
                let niter = epoch * num_batches + iteration;
                if niter % self.config.scalar_every == 0 {
                    summary.add_scalar("Train/Loss", loss, niter)?;
                }
            }
        }

        if iteration == 0 {
            return Err(crate::SrError::Training("training set is empty".to_string()));
        }
        Ok(total_loss / iteration as f64)
    }

    /// Score the model on every validation sample
    ///
    /// Runs in evaluation mode on detached outputs; parameters and optimizer
    /// state are untouched. Scores are averaged per sample, so any batch
    /// size gives the same result.
    pub fn validate(
        &self,
        dataloader: &mut impl BatchDataLoader,
        epoch: usize,
    ) -> crate::Result<ValidationReport> {
        let report = evaluate(&self.model, dataloader, &self.device, epoch)?;
        log::info!("PSNR = {:.3}", report.psnr);
        log::debug!("SAM = {:.3}", report.sam);

        if let Some(summary) = &self.summary {
            summary.add_scalar("Val/PSNR", report.psnr, epoch)?;
            summary.add_scalar("Val/SAM", report.sam, epoch)?;
        }

        Ok(report)
    }

    /// Save checkpoint for `epoch` and apply the retention policy
    pub fn save_checkpoint(
        &self,
        epoch: usize,
        loss: Option<f64>,
        psnr: Option<f64>,
    ) -> crate::Result<PathBuf> {
        let mut model = HashMap::new();
        for (name, var) in named_parameters(&self.varmap)? {
            model.insert(name, var.as_tensor().copy()?);
        }

        let optimizer = self.optimizer.state()?;
        let snapshot = RunSnapshot {
            net: self.net_config.clone(),
            training: self.config.clone(),
        };
        let metadata = CheckpointMetadata {
            epoch,
            lr: optimizer.lr,
            optimizer_step: optimizer.step,
            upscale_factor: self.net_config.upscale_factor,
            loss,
            psnr,
            config: Some(serde_json::to_string(&snapshot)?),
        };

        let path = checkpoint_path(
            &self.config.checkpoint_dir,
            self.net_config.upscale_factor,
            epoch,
        );
        Checkpoint::new(model, optimizer, metadata).save(&path)?;
        log::info!("Checkpoint saved to {}", path.display());

        if let Some(keep_last) = self.config.keep_last {
            prune_checkpoints(
                &self.config.checkpoint_dir,
                self.net_config.upscale_factor,
                keep_last,
                epoch,
            )?;
        }

        Ok(path)
    }

    /// Full training loop
    ///
    /// Each epoch trains, advances the schedule, validates, then writes its
    /// checkpoint. An error aborts the loop before that epoch's checkpoint.
    pub fn fit(
        &mut self,
        train_loader: &mut impl BatchDataLoader,
        val_loader: &mut impl BatchDataLoader,
    ) -> crate::Result<Vec<EpochSummary>> {
        log::info!(
            "Training epochs {}..={} ({} batches per epoch)",
            self.next_epoch,
            self.config.n_epochs,
            train_loader.num_batches()
        );

        let mut history = Vec::new();
        for epoch in self.next_epoch..=self.config.n_epochs {
            let lr = self.scheduler.get_lr();
            self.optimizer.set_learning_rate(lr);
            log::info!("Epoch = {}, lr = {}", epoch, lr);

            let train_loss = self.train_epoch(train_loader, epoch)?;
            self.scheduler.step();

            let validation = self.validate(val_loader, epoch)?;
            let checkpoint = self.save_checkpoint(epoch, Some(train_loss), Some(validation.psnr))?;
            self.next_epoch = epoch + 1;
            if let Some(summary) = &self.summary {
                summary.flush()?;
            }

            history.push(EpochSummary {
                epoch,
                lr,
                train_loss,
                validation,
                checkpoint,
            });
        }

        log::info!("Training complete!");
        Ok(history)
    }

    /// Scalar sink attached with [`Trainer::with_summary`]
    pub fn summary(&self) -> Option<&ScalarWriter> {
        self.summary.as_ref()
    }

    /// Next epoch `fit` will run
    pub fn next_epoch(&self) -> usize {
        self.next_epoch
    }

    /// Learning rate the next training epoch will use
    pub fn learning_rate(&self) -> f64 {
        self.scheduler.get_lr()
    }

    pub fn model(&self) -> &SpectralSrNet {
        &self.model
    }

    pub fn varmap(&self) -> &VarMap {
        &self.varmap
    }

    pub fn device(&self) -> &Device {
        &self.device
    }
}

/// Validation pass shared by training and the `eval` command
pub fn evaluate<M: ModuleT>(
    model: &M,
    dataloader: &mut impl BatchDataLoader,
    device: &Device,
    epoch: usize,
) -> crate::Result<ValidationReport> {
    dataloader.reset(epoch);

    let mut psnr_sum = 0.0;
    let mut sam_sum = 0.0;
    let mut samples = 0usize;
    while let Some((input, label)) = dataloader.next_batch(device)? {
        let sr = model.forward_t(&input, false)?.detach();

        for i in 0..sr.dim(0)? {
            let (pred, reference) = (sr.get(i)?, label.get(i)?);
            psnr_sum += metrics::psnr(&pred, &reference)?;
            sam_sum += metrics::sam(&pred, &reference)?;
            samples += 1;
        }
    }

    if samples == 0 {
        return Err(crate::SrError::Training("validation set is empty".to_string()));
    }

    Ok(ValidationReport {
        psnr: psnr_sum / samples as f64,
        sam: sam_sum / samples as f64,
        samples,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{InMemoryDataset, SampleLoader};

    const BANDS: usize = 3;
    const SCALE: usize = 2;

    fn net_config() -> SrNetConfig {
        SrNetConfig {
            bands: BANDS,
            n_feats: 4,
            n_blocks: 1,
            upscale_factor: SCALE,
            ..Default::default()
        }
    }

    fn training_config(dir: &Path, n_epochs: usize) -> TrainingConfig {
        TrainingConfig {
            n_epochs,
            batch_size: 2,
            learning_rate: 1e-3,
            milestones: vec![2],
            seed: 3,
            log_every: 1,
            scalar_every: 1,
            checkpoint_dir: dir.join("checkpoint").to_string_lossy().into_owned(),
            ..Default::default()
        }
    }

    fn loaders() -> (SampleLoader<InMemoryDataset>, SampleLoader<InMemoryDataset>) {
        let train = InMemoryDataset::synthetic(6, BANDS, 4, SCALE, 10).unwrap();
        let val = InMemoryDataset::synthetic(3, BANDS, 4, SCALE, 11).unwrap();
        (
            SampleLoader::new(train, 2, true).with_seed(5),
            SampleLoader::new(val, 1, false),
        )
    }

    fn parameters(trainer: &Trainer) -> crate::Result<Vec<(String, Vec<f32>)>> {
        named_parameters(trainer.varmap())?
            .into_iter()
            .map(|(name, var)| Ok((name, var.as_tensor().flatten_all()?.to_vec1::<f32>()?)))
            .collect()
    }

    fn max_abs_diff(a: &[(String, Vec<f32>)], b: &[(String, Vec<f32>)]) -> f32 {
        assert_eq!(a.len(), b.len());
        a.iter()
            .zip(b)
            .flat_map(|((na, va), (nb, vb))| {
                assert_eq!(na, nb);
                va.iter().zip(vb).map(|(x, y)| (x - y).abs())
            })
            .fold(0.0, f32::max)
    }

    #[test]
    fn test_config_validation() {
        assert!(TrainingConfig::default().validate().is_ok());

        let config = TrainingConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = TrainingConfig {
            start_epoch: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(crate::SrError::Config(_))));
    }

    #[test]
    fn test_fit_writes_one_checkpoint_per_epoch() -> crate::Result<()> {
        let dir = tempfile::tempdir()?;
        let config = training_config(dir.path(), 3);
        let (mut train, mut val) = loaders();

        let mut trainer = Trainer::new(net_config(), config.clone(), Device::Cpu)?;
        let history = trainer.fit(&mut train, &mut val)?;

        assert_eq!(history.len(), 3);
        for summary in &history {
            assert!(summary.checkpoint.is_file());
            assert!(summary.train_loss.is_finite());
            assert_eq!(summary.validation.samples, 3);
            assert_eq!(
                Checkpoint::read_metadata(&summary.checkpoint)?.epoch,
                summary.epoch
            );
        }
        assert_eq!(trainer.next_epoch(), 4);

        // milestone 2: epochs 1 and 2 at the initial rate, epoch 3 halved
        let rates: Vec<f64> = history.iter().map(|s| s.lr).collect();
        assert_eq!(rates, vec![1e-3, 1e-3, 5e-4]);

        Ok(())
    }

    #[test]
    fn test_cold_starts_are_deterministic() -> crate::Result<()> {
        let dir_a = tempfile::tempdir()?;
        let dir_b = tempfile::tempdir()?;

        let mut runs = Vec::new();
        for dir in [&dir_a, &dir_b] {
            let (mut train, mut val) = loaders();
            let mut trainer = Trainer::new(net_config(), training_config(dir.path(), 2), Device::Cpu)?;
            trainer.fit(&mut train, &mut val)?;
            runs.push(parameters(&trainer)?);
        }

        assert!(max_abs_diff(&runs[0], &runs[1]) < 1e-7);

        Ok(())
    }

    #[test]
    fn test_resume_matches_uninterrupted_run() -> crate::Result<()> {
        let dir_full = tempfile::tempdir()?;
        let dir_split = tempfile::tempdir()?;

        // uninterrupted 1..=3
        let (mut train, mut val) = loaders();
        let mut full = Trainer::new(net_config(), training_config(dir_full.path(), 3), Device::Cpu)?;
        full.fit(&mut train, &mut val)?;

        // 1..=2, then a fresh process resumes and runs epoch 3
        let (mut train, mut val) = loaders();
        let mut first = Trainer::new(net_config(), training_config(dir_split.path(), 2), Device::Cpu)?;
        let history = first.fit(&mut train, &mut val)?;
        let resume_from = history[1].checkpoint.clone();

        let (mut train, mut val) = loaders();
        let mut config = training_config(dir_split.path(), 3);
        config.seed = 99; // restored weights must override the fresh init
        let mut second = Trainer::new(net_config(), config, Device::Cpu)?;
        assert_eq!(second.resume(Some(&resume_from))?, 3);
        assert_eq!(second.learning_rate(), 5e-4);
        let rest = second.fit(&mut train, &mut val)?;
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].epoch, 3);

        let diff = max_abs_diff(&parameters(&full)?, &parameters(&second)?);
        assert!(diff < 1e-6, "resumed run diverged by {}", diff);

        Ok(())
    }

    #[test]
    fn test_missing_resume_path_keeps_start_epoch() -> crate::Result<()> {
        let dir = tempfile::tempdir()?;
        let mut config = training_config(dir.path(), 10);
        config.start_epoch = 4;

        let mut trainer = Trainer::new(net_config(), config, Device::Cpu)?;
        let next = trainer.resume(Some(dir.path().join("missing.safetensors")))?;

        assert_eq!(next, 4);
        assert_eq!(trainer.next_epoch(), 4);
        assert_eq!(trainer.resume(None::<&Path>)?, 4);

        Ok(())
    }

    #[test]
    fn test_validation_is_idempotent() -> crate::Result<()> {
        let dir = tempfile::tempdir()?;
        let (mut train, mut val) = loaders();
        let mut trainer = Trainer::new(net_config(), training_config(dir.path(), 1), Device::Cpu)?;
        trainer.train_epoch(&mut train, 1)?;

        let before = parameters(&trainer)?;
        let first = trainer.validate(&mut val, 1)?;
        let second = trainer.validate(&mut val, 1)?;

        assert_eq!(first, second);
        assert_eq!(max_abs_diff(&before, &parameters(&trainer)?), 0.0);

        Ok(())
    }

    #[test]
    fn test_validation_averages_per_sample() -> crate::Result<()> {
        let dir = tempfile::tempdir()?;
        let trainer = Trainer::new(net_config(), training_config(dir.path(), 1), Device::Cpu)?;

        let data = || InMemoryDataset::synthetic(5, BANDS, 4, SCALE, 11).unwrap();
        let single = trainer.validate(&mut SampleLoader::new(data(), 1, false), 1)?;
        let batched = trainer.validate(&mut SampleLoader::new(data(), 2, false), 1)?;

        assert_eq!(single.samples, 5);
        assert_eq!(batched.samples, 5);
        assert!((single.psnr - batched.psnr).abs() < 1e-4);

        Ok(())
    }

    #[test]
    fn test_failed_validation_writes_no_checkpoint() -> crate::Result<()> {
        let dir = tempfile::tempdir()?;
        let config = training_config(dir.path(), 2);
        let (mut train, _) = loaders();
        let mut empty_val = SampleLoader::new(InMemoryDataset::new(Vec::new())?, 1, false);

        let mut trainer = Trainer::new(net_config(), config.clone(), Device::Cpu)?;
        assert!(trainer.fit(&mut train, &mut empty_val).is_err());

        assert!(!checkpoint_path(&config.checkpoint_dir, SCALE, 1).exists());
        assert_eq!(trainer.next_epoch(), 1);

        Ok(())
    }

    #[test]
    fn test_summary_receives_scalars() -> crate::Result<()> {
        let dir = tempfile::tempdir()?;
        let (mut train, mut val) = loaders();
        let writer = ScalarWriter::new(dir.path().join("logs"))?;

        let mut trainer = Trainer::new(net_config(), training_config(dir.path(), 2), Device::Cpu)?
            .with_summary(writer);
        trainer.fit(&mut train, &mut val)?;

        let summary = trainer.summary().expect("summary attached");
        let has_events = std::fs::read_dir(summary.log_dir())?
            .filter_map(|entry| entry.ok())
            .any(|entry| entry.file_name().to_string_lossy().starts_with("events.out.tfevents"));
        assert!(has_events);

        let records = summary.records()?;
        let psnr_steps: Vec<usize> = records
            .iter()
            .filter(|r| r.tag == "Val/PSNR")
            .map(|r| r.step)
            .collect();
        assert_eq!(psnr_steps, vec![1, 2]);

        // 3 batches per epoch, niter = epoch * 3 + iteration
        let loss_steps: Vec<usize> = records
            .iter()
            .filter(|r| r.tag == "Train/Loss")
            .map(|r| r.step)
            .collect();
        assert_eq!(loss_steps, vec![4, 5, 6, 7, 8, 9]);

        Ok(())
    }

    #[test]
    fn test_summary_does_not_change_training() -> crate::Result<()> {
        let dir_a = tempfile::tempdir()?;
        let dir_b = tempfile::tempdir()?;

        let (mut train, mut val) = loaders();
        let mut plain = Trainer::new(net_config(), training_config(dir_a.path(), 1), Device::Cpu)?;
        plain.fit(&mut train, &mut val)?;

        let (mut train, mut val) = loaders();
        let mut logged = Trainer::new(net_config(), training_config(dir_b.path(), 1), Device::Cpu)?
            .with_summary(ScalarWriter::new(dir_b.path().join("logs"))?);
        logged.fit(&mut train, &mut val)?;

        assert!(max_abs_diff(&parameters(&plain)?, &parameters(&logged)?) < 1e-7);

        Ok(())
    }

    #[test]
    fn test_keep_last_prunes_old_checkpoints() -> crate::Result<()> {
        let dir = tempfile::tempdir()?;
        let mut config = training_config(dir.path(), 3);
        config.keep_last = Some(1);
        let (mut train, mut val) = loaders();

        let mut trainer = Trainer::new(net_config(), config.clone(), Device::Cpu)?;
        trainer.fit(&mut train, &mut val)?;

        let left = super::super::checkpoint::list_checkpoints(&config.checkpoint_dir, SCALE)?;
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].0, 3);

        Ok(())
    }

    #[test]
    fn test_keep_last_keeps_checkpoint_written_behind_newer_ones() -> crate::Result<()> {
        let dir = tempfile::tempdir()?;
        let mut config = training_config(dir.path(), 4);
        config.keep_last = Some(2);

        let (mut train, mut val) = loaders();
        let mut first = Trainer::new(net_config(), config.clone(), Device::Cpu)?;
        first.fit(&mut train, &mut val)?;

        // files from a longer earlier run sit ahead of the resume point
        let epoch_4 = checkpoint_path(&config.checkpoint_dir, SCALE, 4);
        for epoch in [10, 11] {
            std::fs::copy(&epoch_4, checkpoint_path(&config.checkpoint_dir, SCALE, epoch))?;
        }

        let (mut train, mut val) = loaders();
        let mut second = Trainer::new(net_config(), config.clone(), Device::Cpu)?;
        second.resume(Some(checkpoint_path(&config.checkpoint_dir, SCALE, 3)))?;
        let history = second.fit(&mut train, &mut val)?;

        assert_eq!(history.len(), 1);
        assert!(history[0].checkpoint.is_file());
        let left: Vec<usize> = super::super::checkpoint::list_checkpoints(&config.checkpoint_dir, SCALE)?
            .into_iter()
            .map(|(epoch, _)| epoch)
            .collect();
        assert_eq!(left, vec![4, 11]);

        Ok(())
    }

    #[test]
    fn test_resume_rejects_other_architecture() -> crate::Result<()> {
        let dir = tempfile::tempdir()?;
        let (mut train, mut val) = loaders();
        let mut trainer = Trainer::new(net_config(), training_config(dir.path(), 1), Device::Cpu)?;
        let history = trainer.fit(&mut train, &mut val)?;

        let wider = SrNetConfig {
            n_feats: 8,
            ..net_config()
        };
        let mut other = Trainer::new(wider, training_config(dir.path(), 2), Device::Cpu)?;
        assert!(other.resume(Some(&history[0].checkpoint)).is_err());

        Ok(())
    }
}
